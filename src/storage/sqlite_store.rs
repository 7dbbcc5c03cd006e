//! Local vector store on `SQLite` + sqlite-vec.

use chrono::Utc;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::core::config::VectorStoreConfig;
use crate::core::errors::{HubError, HubResult};
use crate::ingest::namespace::Namespace;
use crate::storage::vector_store::{
    QueryMatch, RecordMetadata, StoreFuture, VectorRecord, VectorStore,
};

/// Vector store keeping every record in one table, ranked with
/// `vec_distance_cosine`.
///
/// Call [`init_sqlite_vec_extension`](crate::storage::init_sqlite_vec_extension)
/// before opening it.
pub struct SqliteVectorStore {
    conn: Connection,
    table: String,
    ndims: usize,
}

struct Row {
    id: String,
    namespace: String,
    resource_id: String,
    provider: String,
    chunk_index: i64,
    chunk_count: i64,
    text: String,
    embedding_json: String,
    created_at: String,
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

impl SqliteVectorStore {
    /// Open (or create) the database at the configured path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the table cannot be created.
    pub async fn open(config: &VectorStoreConfig, ndims: usize) -> HubResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::with_connection(conn, &config.table, ndims).await
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the table cannot be created.
    pub async fn in_memory(table: &str, ndims: usize) -> HubResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn, table, ndims).await
    }

    async fn with_connection(conn: Connection, table: &str, ndims: usize) -> HubResult<Self> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(HubError::InvalidConfig(format!(
                "invalid table name {table:?}"
            )));
        }
        let table_name = table.to_string();
        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    id TEXT PRIMARY KEY,
                    namespace TEXT NOT NULL,
                    resource_id TEXT NOT NULL,
                    provider TEXT NOT NULL,
                    chunk_index INTEGER NOT NULL,
                    chunk_count INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    embedding BLOB NOT NULL,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS {table_name}_namespace_idx
                    ON {table_name}(namespace);"
            ))?;
            Ok(())
        })
        .await?;

        let version = conn
            .call(|conn| {
                let version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
                Ok(version)
            })
            .await?;
        info!(table, %version, "Opened SQLite vector store");

        Ok(Self {
            conn,
            table: table.to_string(),
            ndims,
        })
    }

    fn check_dims(&self, len: usize) -> HubResult<()> {
        if len == self.ndims {
            Ok(())
        } else {
            Err(HubError::DimensionMismatch {
                expected: self.ndims,
                got: len,
            })
        }
    }
}

impl VectorStore for SqliteVectorStore {
    fn upsert(
        &self,
        namespace: &Namespace,
        records: Vec<VectorRecord>,
    ) -> StoreFuture<'_, HubResult<usize>> {
        let namespace = namespace.as_str().to_string();
        Box::pin(async move {
            let now = Utc::now().to_rfc3339();
            let mut rows = Vec::with_capacity(records.len());
            for record in records {
                self.check_dims(record.values.len())?;
                rows.push(Row {
                    id: record.id.to_string(),
                    namespace: namespace.clone(),
                    resource_id: record.metadata.resource_id,
                    provider: record.metadata.provider,
                    chunk_index: to_i64(record.metadata.chunk_index),
                    chunk_count: to_i64(record.metadata.chunk_count),
                    text: record.metadata.text,
                    embedding_json: serde_json::to_string(&record.values)?,
                    created_at: now.clone(),
                });
            }
            if rows.is_empty() {
                return Ok(0);
            }

            let table = self.table.clone();
            let written = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    {
                        let mut stmt = tx.prepare(&format!(
                            "INSERT OR REPLACE INTO {table}
                                (id, namespace, resource_id, provider, chunk_index,
                                 chunk_count, text, embedding, created_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, vec_f32(?8), ?9)"
                        ))?;
                        for row in &rows {
                            stmt.execute(rusqlite::params![
                                row.id,
                                row.namespace,
                                row.resource_id,
                                row.provider,
                                row.chunk_index,
                                row.chunk_count,
                                row.text,
                                row.embedding_json,
                                row.created_at,
                            ])?;
                        }
                    }
                    tx.commit()?;
                    Ok(rows.len())
                })
                .await?;
            debug!(namespace = %namespace, written, "SQLite upsert");
            Ok(written)
        })
    }

    fn query(
        &self,
        namespace: &Namespace,
        vector: Vec<f32>,
        top_k: usize,
    ) -> StoreFuture<'_, HubResult<Vec<QueryMatch>>> {
        let namespace = namespace.as_str().to_string();
        Box::pin(async move {
            self.check_dims(vector.len())?;
            let vector_json = serde_json::to_string(&vector)?;
            let table = self.table.clone();
            let limit = to_i64(top_k.max(1));

            let matches = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT id, text, resource_id, provider, chunk_index, chunk_count,
                                vec_distance_cosine(embedding, vec_f32(?2)) AS distance
                         FROM {table}
                         WHERE namespace = ?1
                         ORDER BY distance ASC
                         LIMIT ?3"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![namespace, vector_json, limit], |row| {
                            let distance: f64 = row.get(6)?;
                            #[allow(clippy::cast_possible_truncation)]
                            let score = (1.0 - distance) as f32;
                            Ok(QueryMatch {
                                id: row.get(0)?,
                                score,
                                metadata: Some(RecordMetadata {
                                    text: row.get(1)?,
                                    resource_id: row.get(2)?,
                                    provider: row.get(3)?,
                                    chunk_index: to_usize(row.get(4)?),
                                    chunk_count: to_usize(row.get(5)?),
                                }),
                            })
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;
            Ok(matches)
        })
    }

    fn delete_namespace(&self, namespace: &Namespace) -> StoreFuture<'_, HubResult<()>> {
        let namespace = namespace.as_str().to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let ns = namespace.clone();
            let deleted = self
                .conn
                .call(move |conn| {
                    let deleted =
                        conn.execute(&format!("DELETE FROM {table} WHERE namespace = ?1"), [ns])?;
                    Ok(deleted)
                })
                .await?;
            info!(namespace = %namespace, deleted, "Deleted SQLite namespace");
            Ok(())
        })
    }

    fn count(&self, namespace: &Namespace) -> StoreFuture<'_, HubResult<usize>> {
        let namespace = namespace.as_str().to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let count = self
                .conn
                .call(move |conn| {
                    let count: i64 = conn.query_row(
                        &format!("SELECT COUNT(*) FROM {table} WHERE namespace = ?1"),
                        [namespace],
                        |row| row.get(0),
                    )?;
                    Ok(count)
                })
                .await?;
            Ok(to_usize(count))
        })
    }

    fn ndims(&self) -> usize {
        self.ndims
    }
}
