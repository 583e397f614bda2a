use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::appresult::{DataError, DataResult};

use super::{push_key, Root, Store};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS nodes (
    root TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (root, key)
)";

/// Store keeping every record as a JSON document in one SQLite table.
///
/// Values are written with `serde_json`'s sorted-key encoding, so equal
/// documents have equal text and compare-and-set can compare strings.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> DataResult<SqliteStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect(url)
            .await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> DataResult<SqliteStore> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(SqliteStore { pool })
    }
}

fn parse_rows(rows: Vec<(String, String)>) -> DataResult<Vec<(String, Value)>> {
    rows.into_iter()
        .map(|(key, value)| Ok((key, serde_json::from_str(&value)?)))
        .collect()
}

#[async_trait]
impl Store for SqliteStore {
    async fn get(&self, root: Root, key: &str) -> DataResult<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM nodes WHERE root=? AND key=?")
            .bind(root.as_str())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((value,)) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, root: Root) -> DataResult<Vec<(String, Value)>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key,value FROM nodes WHERE root=? ORDER BY key")
            .bind(root.as_str())
            .fetch_all(&self.pool)
            .await?;
        parse_rows(rows)
    }

    async fn query_eq(&self, root: Root, child: &str, value: &str) -> DataResult<Vec<(String, Value)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key,value FROM nodes WHERE root=? AND json_extract(value, ?)=? ORDER BY key",
        )
            .bind(root.as_str())
            .bind(format!("$.{child}"))
            .bind(value)
            .fetch_all(&self.pool)
            .await?;
        parse_rows(rows)
    }

    async fn set(&self, root: Root, key: &str, value: Value) -> DataResult<()> {
        sqlx::query(
            "INSERT INTO nodes (root,key,value) VALUES (?,?,?) \
             ON CONFLICT(root,key) DO UPDATE SET value=excluded.value",
        )
            .bind(root.as_str())
            .bind(key)
            .bind(serde_json::to_string(&value)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create(&self, root: Root, key: &str, value: Value) -> DataResult<()> {
        let result = sqlx::query("INSERT INTO nodes (root,key,value) VALUES (?,?,?) ON CONFLICT(root,key) DO NOTHING")
            .bind(root.as_str())
            .bind(key)
            .bind(serde_json::to_string(&value)?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::Conflict(format!("{root}/{key} already exists")));
        }
        Ok(())
    }

    async fn update(&self, root: Root, key: &str, fields: Map<String, Value>) -> DataResult<()> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM nodes WHERE root=? AND key=?")
            .bind(root.as_str())
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;
        let Some((current,)) = row else {
            return Err(DataError::NotFound(format!("{root}/{key}")));
        };

        let mut record: Value = serde_json::from_str(&current)?;
        let Some(object) = record.as_object_mut() else {
            return Err(DataError::Invalid(format!("{root}/{key} is not an object")));
        };
        object.extend(fields);

        sqlx::query("UPDATE nodes SET value=? WHERE root=? AND key=?")
            .bind(serde_json::to_string(&record)?)
            .bind(root.as_str())
            .bind(key)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn push(&self, root: Root, value: Value) -> DataResult<String> {
        let key = push_key();
        self.create(root, &key, value).await?;
        Ok(key)
    }

    async fn remove(&self, root: Root, key: &str) -> DataResult<()> {
        sqlx::query("DELETE FROM nodes WHERE root=? AND key=?")
            .bind(root.as_str())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn compare_and_set(&self, root: Root, key: &str, expected: &Value, value: Value) -> DataResult<bool> {
        let result = sqlx::query("UPDATE nodes SET value=? WHERE root=? AND key=? AND value=?")
            .bind(serde_json::to_string(&value)?)
            .bind(root.as_str())
            .bind(key)
            .bind(serde_json::to_string(expected)?)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
