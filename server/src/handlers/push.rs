//! Push handler - stores records sent by a client.

use crate::error::Result;
use crate::store::{EntityStore, SystemClock};
use memverse_engine::{PushSummary, ReferencePolicy, SyncBatch};

/// Apply a client's batch. Every record in it gets the same write time.
pub async fn handle_push(
    store: &dyn EntityStore,
    policy: ReferencePolicy,
    batch: SyncBatch,
) -> Result<PushSummary> {
    if batch.is_empty() {
        tracing::debug!("Empty push, nothing to store");
        return Ok(PushSummary::default());
    }

    let summary = store.push(batch, policy, &SystemClock).await?;

    tracing::info!(
        collections = summary.collections,
        cards = summary.cards,
        card_verses = summary.card_verses,
        "Push applied"
    );
    Ok(summary)
}
