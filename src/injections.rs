//! Durability boundary for the injection set.
//!
//! The pipeline itself treats injections as request arguments; keeping them
//! across sessions is a key-value collaborator's job. The trait is the seam,
//! the in-memory implementation backs tests and ephemeral sessions.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::snapshot::Injection;

/// Key-value collaborator that persists the ordered injection set.
#[async_trait]
pub trait InjectionStore: Send + Sync {
    /// Load the stored injection set, empty if none was saved.
    async fn load(&self) -> Result<Vec<Injection>>;

    /// Replace the stored injection set.
    async fn save(&self, injections: &[Injection]) -> Result<()>;
}

/// In-memory injection store.
#[derive(Debug, Default)]
pub struct MemoryInjectionStore {
    injections: RwLock<Vec<Injection>>,
}

impl MemoryInjectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InjectionStore for MemoryInjectionStore {
    async fn load(&self) -> Result<Vec<Injection>> {
        Ok(self.injections.read().await.clone())
    }

    async fn save(&self, injections: &[Injection]) -> Result<()> {
        *self.injections.write().await = injections.to_vec();
        Ok(())
    }
}
