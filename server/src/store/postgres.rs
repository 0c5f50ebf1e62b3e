use super::{resolver_for, Clock, EntityStore};
use crate::db::{self, PgEntity, Pool};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use memverse_engine::{
    Card, CardVerse, ChangeFilter, Collection, ConflictResolver, Error as EngineError,
    PushSummary, ReferencePolicy, SyncBatch,
};
use sqlx::PgConnection;

/// Advisory lock shared by pulls and held exclusively by a push.
const SYNC_LOCK_KEY: i64 = 0x6d656d7665727365;

/// PostgreSQL-backed store. One transaction per push and per pull.
///
/// Pushes take `SYNC_LOCK_KEY` exclusively and pulls take it shared, so a
/// pull's three reads see no push half-committed.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn push(
        &self,
        batch: SyncBatch,
        policy: ReferencePolicy,
        clock: &dyn Clock,
    ) -> Result<PushSummary> {
        if batch.is_empty() {
            return Ok(PushSummary::default());
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SYNC_LOCK_KEY)
            .execute(&mut *tx)
            .await?;
        let resolver = resolver_for(policy, clock);

        let summary = PushSummary {
            collections: upsert_collections(&mut tx, batch.collections, &resolver).await?,
            cards: upsert_all(&mut tx, batch.cards, &resolver).await?,
            card_verses: upsert_all(&mut tx, batch.card_verses, &resolver).await?,
        };

        tx.commit().await?;
        Ok(summary)
    }

    async fn pull(&self, filter: &ChangeFilter) -> Result<SyncBatch> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        sqlx::query("SELECT pg_advisory_xact_lock_shared($1)")
            .bind(SYNC_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let since = filter.cutoff();
        let batch = SyncBatch {
            collections: Collection::fetch_changed(&mut tx, since).await?,
            cards: Card::fetch_changed(&mut tx, since).await?,
            card_verses: CardVerse::fetch_changed(&mut tx, since).await?,
        };

        tx.commit().await?;
        Ok(batch)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// Collections additionally carry the live-name unique index; a violation
/// surfaces as a duplicate name rather than a database failure.
async fn upsert_collections(
    conn: &mut PgConnection,
    records: Vec<Collection>,
    resolver: &ConflictResolver,
) -> Result<usize> {
    let count = records.len();
    for record in records {
        let name = record.name.clone();
        match upsert_one(conn, record, resolver).await {
            Err(AppError::Database(e)) if db::is_unique_violation(&e) => {
                return Err(EngineError::DuplicateName(name).into());
            }
            other => other?,
        }
    }
    Ok(count)
}

async fn upsert_all<T: PgEntity>(
    conn: &mut PgConnection,
    records: Vec<T>,
    resolver: &ConflictResolver,
) -> Result<usize> {
    let count = records.len();
    for record in records {
        upsert_one(conn, record, resolver).await?;
    }
    Ok(count)
}

async fn upsert_one<T: PgEntity>(
    conn: &mut PgConnection,
    record: T,
    resolver: &ConflictResolver,
) -> Result<()> {
    let existing = match record.id() {
        Some(id) => T::fetch_for_update(conn, id.as_ref()).await?,
        None => None,
    };
    let (id, merged) = resolver.merge(existing.as_ref(), record)?;

    if let Some(reference) = resolver.required_reference(&merged) {
        let exists = db::reference_exists(conn, &reference).await?;
        resolver.check_reference(&merged, &reference, exists)?;
    }

    T::upsert(conn, &merged).await?;
    tracing::trace!("Stored {} {}", T::KIND, id);
    Ok(())
}
