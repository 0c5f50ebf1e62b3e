use super::PgEntity;
use async_trait::async_trait;
use memverse_engine::{CardVerse, Metadata, Timestamp};
use sqlx::{PgConnection, Row};

/// A row of the `card_verses` table.
#[derive(Debug)]
struct CardVerseRow {
    id: String,
    card_id: String,
    verse_id: String,
    created_date: Timestamp,
    updated_date: Timestamp,
    deleted_at: Option<Timestamp>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for CardVerseRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(CardVerseRow {
            id: row.try_get("id")?,
            card_id: row.try_get("card_id")?,
            verse_id: row.try_get("verse_id")?,
            created_date: row.try_get("created_date")?,
            updated_date: row.try_get("updated_date")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

impl From<CardVerseRow> for CardVerse {
    fn from(row: CardVerseRow) -> Self {
        CardVerse {
            id: Some(row.id.into()),
            card_id: row.card_id.into(),
            verse_id: row.verse_id,
            metadata: Metadata {
                created_date: row.created_date,
                updated_date: row.updated_date,
                deleted_at: row.deleted_at,
            },
        }
    }
}

#[async_trait]
impl PgEntity for CardVerse {
    async fn fetch_for_update(conn: &mut PgConnection, id: &str) -> sqlx::Result<Option<Self>> {
        let row = sqlx::query_as::<_, CardVerseRow>(
            r#"
            SELECT id, card_id, verse_id, created_date, updated_date, deleted_at
            FROM card_verses
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(CardVerse::from))
    }

    async fn upsert(conn: &mut PgConnection, record: &Self) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO card_verses (id, card_id, verse_id, created_date, updated_date, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                card_id = EXCLUDED.card_id,
                verse_id = EXCLUDED.verse_id,
                created_date = EXCLUDED.created_date,
                updated_date = EXCLUDED.updated_date,
                deleted_at = EXCLUDED.deleted_at
            "#,
        )
        .bind(record.id.as_ref().map(|id| id.as_str()))
        .bind(record.card_id.as_str())
        .bind(&record.verse_id)
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
        let rows = sqlx::query_as::<_, CardVerseRow>(
            r#"
            SELECT id, card_id, verse_id, created_date, updated_date, deleted_at
            FROM card_verses
            WHERE ($1::timestamptz IS NULL AND deleted_at IS NULL)
               OR updated_date >= $1
            ORDER BY updated_date, id
            "#,
        )
        .bind(since)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(CardVerse::from).collect())
    }
}
