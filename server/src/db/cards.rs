use super::PgEntity;
use async_trait::async_trait;
use memverse_engine::{Card, Metadata, Timestamp};
use sqlx::{PgConnection, Row};

/// A row of the `cards` table.
#[derive(Debug)]
struct CardRow {
    id: String,
    collection_id: String,
    verse_id: String,
    last_review_date: Option<Timestamp>,
    ease_factor: f64,
    interval_days: i64,
    repetition_number: i64,
    created_date: Timestamp,
    updated_date: Timestamp,
    deleted_at: Option<Timestamp>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for CardRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(CardRow {
            id: row.try_get("id")?,
            collection_id: row.try_get("collection_id")?,
            verse_id: row.try_get("verse_id")?,
            last_review_date: row.try_get("last_review_date")?,
            ease_factor: row.try_get("ease_factor")?,
            interval_days: row.try_get("interval_days")?,
            repetition_number: row.try_get("repetition_number")?,
            created_date: row.try_get("created_date")?,
            updated_date: row.try_get("updated_date")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

impl From<CardRow> for Card {
    fn from(row: CardRow) -> Self {
        Card {
            id: Some(row.id.into()),
            collection_id: row.collection_id.into(),
            verse_id: row.verse_id,
            last_review_date: row.last_review_date,
            ease_factor: row.ease_factor,
            interval: row.interval_days,
            repetition_number: row.repetition_number,
            metadata: Metadata {
                created_date: row.created_date,
                updated_date: row.updated_date,
                deleted_at: row.deleted_at,
            },
        }
    }
}

const CARD_COLUMNS: &str = "id, collection_id, verse_id, last_review_date, ease_factor, \
     interval_days, repetition_number, created_date, updated_date, deleted_at";

#[async_trait]
impl PgEntity for Card {
    async fn fetch_for_update(conn: &mut PgConnection, id: &str) -> sqlx::Result<Option<Self>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, CardRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.map(Card::from))
    }

    async fn upsert(conn: &mut PgConnection, record: &Self) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cards (
                id, collection_id, verse_id, last_review_date, ease_factor,
                interval_days, repetition_number, created_date, updated_date, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                collection_id = EXCLUDED.collection_id,
                verse_id = EXCLUDED.verse_id,
                last_review_date = EXCLUDED.last_review_date,
                ease_factor = EXCLUDED.ease_factor,
                interval_days = EXCLUDED.interval_days,
                repetition_number = EXCLUDED.repetition_number,
                created_date = EXCLUDED.created_date,
                updated_date = EXCLUDED.updated_date,
                deleted_at = EXCLUDED.deleted_at
            "#,
        )
        .bind(record.id.as_ref().map(|id| id.as_str()))
        .bind(record.collection_id.as_str())
        .bind(&record.verse_id)
        .bind(record.last_review_date)
        .bind(record.ease_factor)
        .bind(record.interval)
        .bind(record.repetition_number)
        .bind(record.metadata.created_date)
        .bind(record.metadata.updated_date)
        .bind(record.metadata.deleted_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn fetch_changed(
        conn: &mut PgConnection,
        since: Option<Timestamp>,
    ) -> sqlx::Result<Vec<Self>> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM cards \
             WHERE ($1::timestamptz IS NULL AND deleted_at IS NULL) OR updated_date >= $1 \
             ORDER BY updated_date, id"
        );
        let rows = sqlx::query_as::<_, CardRow>(&sql)
            .bind(since)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows.into_iter().map(Card::from).collect())
    }
}
