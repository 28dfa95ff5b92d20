use async_trait::async_trait;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{bool_to_i64, conn, ser};
use crate::repository::{FlagRepository, StorageError};

#[async_trait]
impl FlagRepository for SqliteRepository {
    async fn get_flag(&self, key: &str) -> Result<Option<bool>, StorageError> {
        let row = sqlx::query("SELECT value FROM flags WHERE key = ?1")
            .bind(key.to_owned())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let value: i64 = row.try_get("value").map_err(ser)?;
        Ok(Some(value != 0))
    }

    async fn set_flag(&self, key: &str, value: bool) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        sqlx::query(
            r"
            INSERT INTO flags (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(key.to_owned())
        .bind(bool_to_i64(value))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
