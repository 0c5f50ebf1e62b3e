//! Entity stores behind the sync endpoints.
//!
//! Both implementations give the same guarantees: a push is applied
//! completely or not at all, and a pull reads one consistent snapshot.
//!
//! The write time of a push is read from the [`Clock`] only once the store
//! has excluded concurrent pulls. A pull therefore either sees the push or
//! ran before its write time, and a client's next day cutoff cannot skip it.

mod memory;
mod postgres;

pub use memory::MemoryEntityStore;
pub use postgres::PgStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use memverse_engine::{
    ChangeFilter, ConflictResolver, PushSummary, ReferencePolicy, SyncBatch, Timestamp,
};

/// Source of push write times.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> Timestamp + Send + Sync,
{
    fn now(&self) -> Timestamp {
        self()
    }
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Upsert every record of `batch` in one unit, resolving each against
    /// what is stored under the same identity.
    async fn push(
        &self,
        batch: SyncBatch,
        policy: ReferencePolicy,
        clock: &dyn Clock,
    ) -> Result<PushSummary>;

    /// Every record selected by `filter`, ordered by write time then id.
    async fn pull(&self, filter: &ChangeFilter) -> Result<SyncBatch>;

    /// Short backend name for health reporting.
    fn backend(&self) -> &'static str;
}

/// Resolver for one push; call only while holding the store's write lock.
fn resolver_for(policy: ReferencePolicy, clock: &dyn Clock) -> ConflictResolver {
    let resolver = ConflictResolver::new(policy, clock.now());
    tracing::trace!(
        written_at = %resolver.now(),
        policy = %resolver.policy(),
        "Push write time stamped"
    );
    resolver
}
