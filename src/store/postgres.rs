//! PostgreSQL record store.
//!
//! Queries are checked at runtime (`query_as::<_, Row>`), matching how the
//! claiming SQL in this codebase is issued, so builds do not need a live database.

use super::RecordStore;
use crate::error::{StoreError, StoreResult};
use crate::models::{Annotation, ContentRecord, NewContentRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// Deliberately non-unique: the lock protocol, not the schema, prevents duplicates.
const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS content_records (
        id BIGSERIAL PRIMARY KEY,
        category TEXT NOT NULL,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        annotations JSONB NOT NULL DEFAULT '[]'::jsonb,
        generated_by TEXT NOT NULL,
        effective_date DATE NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_INDEX_SQL: &str = r#"
    CREATE INDEX IF NOT EXISTS index_content_records_on_category_and_date
        ON content_records (category, effective_date)
"#;

#[derive(Debug, sqlx::FromRow)]
struct ContentRecordRow {
    id: i64,
    category: String,
    title: String,
    body: String,
    annotations: Json<Vec<Annotation>>,
    generated_by: String,
    effective_date: NaiveDate,
}

impl From<ContentRecordRow> for ContentRecord {
    fn from(row: ContentRecordRow) -> Self {
        ContentRecord {
            id: row.id,
            category: row.category,
            title: row.title,
            body: row.body,
            annotations: row.annotations.0,
            generated_by: row.generated_by,
            effective_date: row.effective_date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::connection(format!("Failed to connect to Postgres: {e}")))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `content_records` table and its lookup index if absent
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in [CREATE_TABLE_SQL, CREATE_INDEX_SQL] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::query("migrate", e.to_string()))?;
        }
        debug!("content_records schema ready");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[instrument(skip(self))]
    async fn lookup(&self, category: &str, date: NaiveDate) -> StoreResult<Option<ContentRecord>> {
        let query = r#"
            SELECT id, category, title, body, annotations, generated_by, effective_date
            FROM content_records
            WHERE category = $1 AND effective_date = $2
            ORDER BY id
            LIMIT 1
        "#;

        let row = sqlx::query_as::<_, ContentRecordRow>(query)
            .bind(category)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to look up content record: {}", e);
                match e {
                    sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                        StoreError::decode(e.to_string())
                    }
                    other => StoreError::query("lookup", other.to_string()),
                }
            })?;

        Ok(row.map(ContentRecord::from))
    }

    #[instrument(skip(self, record), fields(category = %record.category, date = %record.effective_date))]
    async fn insert(&self, record: NewContentRecord) -> StoreResult<ContentRecord> {
        let query = r#"
            INSERT INTO content_records
                (category, title, body, annotations, generated_by, effective_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, category, title, body, annotations, generated_by, effective_date
        "#;

        let row = sqlx::query_as::<_, ContentRecordRow>(query)
            .bind(&record.category)
            .bind(&record.title)
            .bind(&record.body)
            .bind(Json(&record.annotations))
            .bind(&record.generated_by)
            .bind(record.effective_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to insert content record: {}", e);
                StoreError::query("insert", e.to_string())
            })?;

        debug!(id = row.id, "Inserted content record");
        Ok(row.into())
    }

    fn store_name(&self) -> &'static str {
        "postgres"
    }
}
