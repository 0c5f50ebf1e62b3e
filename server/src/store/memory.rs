use super::{resolver_for, Clock, EntityStore};
use crate::error::Result;
use async_trait::async_trait;
use memverse_engine::{ChangeFilter, MemoryStore, PushSummary, ReferencePolicy, SyncBatch};
use tokio::sync::RwLock;

/// Process-local store; pushes serialize on a write lock.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    inner: RwLock<MemoryStore>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn push(
        &self,
        batch: SyncBatch,
        policy: ReferencePolicy,
        clock: &dyn Clock,
    ) -> Result<PushSummary> {
        let mut store = self.inner.write().await;
        let resolver = resolver_for(policy, clock);
        Ok(store.apply(batch, &resolver)?)
    }

    async fn pull(&self, filter: &ChangeFilter) -> Result<SyncBatch> {
        let store = self.inner.read().await;
        Ok(store.select(filter))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
