//! Database module for PostgreSQL persistence.
//!
//! Each entity kind has its own table with the same bookkeeping columns
//! (`created_date`, `updated_date`, `deleted_at`). Queries take a
//! `PgConnection` so callers can run them inside one transaction.

mod card_verses;
mod cards;
mod collections;
mod pool;

pub use pool::*;

use async_trait::async_trait;
use memverse_engine::{Entity, EntityKind, Reference, Timestamp};
use sqlx::PgConnection;

/// An entity kind persisted in its own table.
#[async_trait]
pub trait PgEntity: Entity + Send + Sync + Sized + 'static {
    /// Load the stored record, locking its row until the transaction ends.
    async fn fetch_for_update(conn: &mut PgConnection, id: &str) -> sqlx::Result<Option<Self>>;

    /// Insert or overwrite the whole row.
    async fn upsert(conn: &mut PgConnection, record: &Self) -> sqlx::Result<()>;

    /// Live rows when `since` is `None`, otherwise every row written at or
    /// after `since`. Ordered by `updated_date, id`.
    async fn fetch_changed(
        conn: &mut PgConnection,
        since: Option<Timestamp>,
    ) -> sqlx::Result<Vec<Self>>;
}

/// Whether a live (not soft-deleted) row satisfies `reference`.
///
/// The target row is share-locked until the transaction ends, so it cannot
/// be tombstoned underneath the referencing write; a writer already holding
/// it is waited for and its outcome re-checked.
pub async fn reference_exists(conn: &mut PgConnection, reference: &Reference) -> sqlx::Result<bool> {
    let sql = match reference.target {
        EntityKind::Collection => {
            "SELECT 1 FROM collections WHERE id = $1 AND deleted_at IS NULL FOR SHARE"
        }
        EntityKind::Card => "SELECT 1 FROM cards WHERE id = $1 AND deleted_at IS NULL FOR SHARE",
        EntityKind::CardVerse => {
            "SELECT 1 FROM card_verses WHERE id = $1 AND deleted_at IS NULL FOR SHARE"
        }
    };

    let row = sqlx::query(sql)
        .bind(&reference.id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// Check if a SQL error is a unique constraint violation.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        // PostgreSQL unique violation code is "23505"
        db_err.code().map(|c| c == "23505").unwrap_or(false)
    } else {
        false
    }
}
