//! Language preference hook.
//!
//! Hydration may recover a language from the suspend payload. The store hands
//! it to a [`LanguagePreference`] on a spawned task and never waits for it, so
//! a slow or failing preference loader cannot hold up or fail hydration.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Options for a language load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Whether the loader should write the preference back to persistence.
    /// Loads triggered by hydration always pass `false`.
    pub persist: bool,
}

/// Collaborator that owns the learner's language preference.
#[async_trait]
pub trait LanguagePreference: Send + Sync {
    /// Load `lang` as the active language.
    async fn load(&self, lang: &str, options: LoadOptions) -> anyhow::Result<()>;
}

/// A language load forwarded over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRequest {
    /// Language code
    pub lang: String,
    /// Options the store passed
    pub options: LoadOptions,
}

#[async_trait]
impl LanguagePreference for mpsc::UnboundedSender<LanguageRequest> {
    async fn load(&self, lang: &str, options: LoadOptions) -> anyhow::Result<()> {
        self.send(LanguageRequest {
            lang: lang.to_string(),
            options,
        })
        .map_err(|_| anyhow::anyhow!("language receiver dropped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_forwards_request() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.load("fr", LoadOptions { persist: false }).await.unwrap();

        let request = rx.recv().await.unwrap();
        assert_eq!(request.lang, "fr");
        assert!(!request.options.persist);
    }

    #[tokio::test]
    async fn test_closed_channel_is_an_error() {
        let (tx, rx) = mpsc::unbounded_channel::<LanguageRequest>();
        drop(rx);
        assert!(tx.load("de", LoadOptions { persist: false }).await.is_err());
    }
}
