use std::sync::Arc;

use coursemark_core::{CourseMap, SuspendPatch, BOOKMARK_KEY};
use coursemark_progress::{
    ConnectOutcome, LanguageRequest, NavigateOutcome, ProgressStore, RouteTracker,
};
use coursemark_storage::{Backend, HttpHost, LocalStore, MemoryHost};
use tokio::sync::mpsc;

fn course() -> CourseMap {
    CourseMap::new(["/", "/section1", "/section2", "/summary"]).expect("valid course")
}

#[tokio::test]
async fn standalone_learner_resumes_in_second_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("progress.json");

    // First session: no LMS, learner reaches section2 and picks French.
    {
        let local = LocalStore::open(&path).await.expect("open");
        let mut store = ProgressStore::new(MemoryHost::unavailable(), local);
        assert_eq!(store.connect().await, ConnectOutcome::Fallback);
        store.hydrate_from_persistence().await;
        assert!(!store.resume_available());

        let tracker = RouteTracker::new(course());
        for path in ["/", "/section1/", "/section2/"] {
            tracker.on_navigate(&mut store, path).await.expect("navigate");
        }
        store
            .set_suspend_data(SuspendPatch::new().language("fr"))
            .await
            .expect("suspend");
        assert_eq!(store.location(), Some(2));
    }

    // Second session on the same file.
    let local = LocalStore::open(&path).await.expect("reopen");
    let (tx, mut rx) = mpsc::unbounded_channel::<LanguageRequest>();
    let mut store =
        ProgressStore::new(MemoryHost::unavailable(), local).with_language_preference(Arc::new(tx));
    store.connect().await;
    store.hydrate_from_persistence().await;

    assert_eq!(store.location(), Some(2));
    assert!(store.resume_available());

    let request = rx.recv().await.expect("language request");
    assert_eq!(request.lang, "fr");
    assert!(!request.options.persist);

    let mut tracker = RouteTracker::new(course());
    assert!(RouteTracker::should_prompt(&store));
    store.resume_course();
    assert_eq!(tracker.resume_redirect(&store, "/").as_deref(), Some("/section2"));

    // Revisiting earlier pages never lowers the bookmark.
    assert_eq!(
        tracker.on_navigate(&mut store, "/section1").await.expect("navigate"),
        NavigateOutcome::Unchanged(1)
    );
    assert_eq!(store.get_location().await, 2);
}

#[tokio::test]
async fn restart_in_second_session_clears_everything() {
    let local = LocalStore::ephemeral();
    let host = MemoryHost::new("1.2");

    {
        let mut store = ProgressStore::new(host.clone(), local.clone());
        store.connect().await;
        store.update_location_if_advanced(3).await.expect("advance");
        store.terminate().await;
    }
    assert!(host.is_terminated());
    assert_eq!(host.value("cmi.core.lesson_location").as_deref(), Some("3"));

    // The LMS reopens the attempt for a new session.
    let mut store = ProgressStore::new(host.clone(), local.clone());
    store.connect().await;
    assert_eq!(store.location(), Some(3));
    assert!(store.resume_available());

    store.restart_course().await.expect("restart");

    assert_eq!(store.location(), Some(0));
    assert!(store.suspend_data().is_none());
    assert!(!store.resume_available());
    assert!(store.resume_decision_made());
    assert_eq!(host.value("cmi.core.lesson_location").as_deref(), Some("0"));
    assert_eq!(host.value("cmi.core.lesson_status").as_deref(), Some("incomplete"));
    assert_eq!(local.get(BOOKMARK_KEY).await.expect("get"), None);
}

#[tokio::test]
async fn unreachable_lms_bridge_falls_back_to_local() {
    let local = LocalStore::ephemeral();
    let mut store = ProgressStore::new(HttpHost::new("http://127.0.0.1:9"), local.clone());

    assert_eq!(store.connect().await, ConnectOutcome::Fallback);
    assert!(!store.connected());

    store.update_location_if_advanced(1).await.expect("advance");
    assert_eq!(local.get(BOOKMARK_KEY).await.expect("get").as_deref(), Some("1"));
}

#[tokio::test]
async fn shared_store_serializes_concurrent_advancement() {
    let local = LocalStore::ephemeral();
    let shared = ProgressStore::new(MemoryHost::unavailable(), local.clone()).into_shared();

    let mut handles = Vec::new();
    for location in [3u32, 1, 4, 2, 5, 0] {
        let shared = Arc::clone(&shared);
        handles.push(tokio::spawn(async move {
            shared
                .lock()
                .await
                .update_location_if_advanced(location)
                .await
                .expect("advance")
        }));
    }
    for handle in handles {
        handle.await.expect("join");
    }

    assert_eq!(shared.lock().await.location(), Some(5));
    assert_eq!(local.get(BOOKMARK_KEY).await.expect("get").as_deref(), Some("5"));
}
