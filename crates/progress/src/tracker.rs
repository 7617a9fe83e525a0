//! Route tracking.
//!
//! The route collaborator reports every navigation here. The tracker turns
//! paths into ordinals for the store and decides the one redirect a
//! returning learner gets after choosing to resume.

use coursemark_core::{normalize_route, CourseMap};

use crate::error::Result;
use crate::store::ProgressStore;

/// What a reported navigation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateOutcome {
    /// The path is not part of the course.
    UnknownRoute,
    /// The location moved forward to this ordinal.
    Advanced(u32),
    /// The ordinal was not past the stored location.
    Unchanged(u32),
}

/// Adapter between the course's routes and the progress store.
#[derive(Debug, Clone)]
pub struct RouteTracker {
    course: CourseMap,
    redirect_done: bool,
}

impl RouteTracker {
    /// Create a tracker for `course`.
    pub fn new(course: CourseMap) -> Self {
        Self {
            course,
            redirect_done: false,
        }
    }

    /// The course map.
    pub fn course(&self) -> &CourseMap {
        &self.course
    }

    /// Report a navigation to `path`.
    pub async fn on_navigate(&self, store: &mut ProgressStore, path: &str) -> Result<NavigateOutcome> {
        let Some(ordinal) = self.course.ordinal(path) else {
            tracing::debug!(path, "Navigation outside the course map");
            return Ok(NavigateOutcome::UnknownRoute);
        };

        if store.update_location_if_advanced(ordinal).await? {
            Ok(NavigateOutcome::Advanced(ordinal))
        } else {
            Ok(NavigateOutcome::Unchanged(ordinal))
        }
    }

    /// Whether the resume prompt should be shown.
    pub fn should_prompt(store: &ProgressStore) -> bool {
        store.resume_available() && !store.resume_decision_made()
    }

    /// Route a returning learner should be sent to, at most once per session.
    ///
    /// Only fires after the learner chose to resume and hydration found a
    /// location past the start. Returns `None` when the learner is already
    /// on the target.
    pub fn resume_redirect(&mut self, store: &ProgressStore, current_path: &str) -> Option<String> {
        if self.redirect_done || !store.resume_available() || !store.resume_decision_made() {
            return None;
        }

        let location = store.location().filter(|loc| *loc > 0)?;
        self.redirect_done = true;

        let target = self.course.route(location)?;
        if normalize_route(current_path) == target {
            return None;
        }

        tracing::info!(session = %store.session(), route = target, location, "Redirecting to resume point");
        Some(target.to_string())
    }
}
