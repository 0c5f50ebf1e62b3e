use super::PgEntity;
use async_trait::async_trait;
use memverse_engine::{Collection, Metadata, Timestamp};
use sqlx::{PgConnection, Row};

/// A row of the `collections` table.
#[derive(Debug)]
struct CollectionRow {
    id: String,
    name: String,
    created_date: Timestamp,
    updated_date: Timestamp,
    deleted_at: Option<Timestamp>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for CollectionRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(CollectionRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_date: row.try_get("created_date")?,
            updated_date: row.try_get("updated_date")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Collection {
            id: Some(row.id.into()),
            name: row.name,
            metadata: Metadata {
                created_date: row.created_date,
                updated_date: row.updated_date,
                deleted_at: row.deleted_at,
            },
        }
    }
}

#[async_trait]
impl PgEntity for Collection {
    async fn fetch_for_update(conn: &mut PgConnection, id: &str) -> sqlx::Result<Option<Self>> {
        let row = sqlx::query_as::<_, CollectionRow>(
            r#"
            SELECT id, name, created_date, updated_date, deleted_at
            FROM collections
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Collection::from))
    }

    async fn upsert(conn: &mut PgConnection, record: &Self) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collections (id, name, created_date, updated_date, deleted_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                created_date = EXCLUDED.created_date,
                updated_date = EXCLUDED.updated_date,
                deleted_at = EXCLUDED.deleted_at
            "#,
        )
        .bind(record.id.as_ref().map(|id| id.as_str()))
        .bind(&record.name)
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
        let rows = sqlx::query_as::<_, CollectionRow>(
            r#"
            SELECT id, name, created_date, updated_date, deleted_at
            FROM collections
            WHERE ($1::timestamptz IS NULL AND deleted_at IS NULL)
               OR updated_date >= $1
            ORDER BY updated_date, id
            "#,
        )
        .bind(since)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(Collection::from).collect())
    }
}
