// src/publish/mod.rs
pub mod bluesky;

use anyhow::Result;

/// The external posting surface. At-least-once semantics: the caller only
/// records a fingerprint as posted after `publish` returns Ok.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<()>;
}

/// Records posts in memory; can be scripted to reject selected texts.
/// Clones share the same post log, so tests keep a handle after boxing.
#[derive(Clone)]
pub struct MockPublisher {
    posts: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    fail_containing: Option<String>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            posts: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
            fail_containing: None,
        }
    }

    /// Fail any publish whose text contains `needle`.
    pub fn failing_on(needle: impl Into<String>) -> Self {
        Self {
            fail_containing: Some(needle.into()),
            ..Self::new()
        }
    }

    pub fn posted(&self) -> Vec<String> {
        self.posts.lock().unwrap().clone()
    }
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, text: &str) -> Result<()> {
        if let Some(needle) = &self.fail_containing {
            if text.contains(needle.as_str()) {
                anyhow::bail!("mock publisher rejecting post");
            }
        }
        self.posts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
