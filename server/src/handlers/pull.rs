//! Pull handler - serves records changed since a client's last sync.

use crate::error::Result;
use crate::store::EntityStore;
use memverse_engine::{ChangeFilter, SyncBatch};

/// Select records for a pull.
///
/// Without a marker the client gets every live record. With a `YYYY-MM-DD`
/// marker it gets every record written on or after that day, tombstones
/// included, so it can drop what was deleted elsewhere.
pub async fn handle_pull(store: &dyn EntityStore, marker: Option<&str>) -> Result<SyncBatch> {
    let filter = ChangeFilter::from_marker(marker)?;
    let batch = store.pull(&filter).await?;

    tracing::debug!(
        incremental = filter.is_incremental(),
        records = batch.len(),
        "Pull served"
    );
    Ok(batch)
}
