use quiz_core::model::TestSummary;
use sqlx::{QueryBuilder, Sqlite};

use super::SqliteRepository;
use super::mapping::{conn, count_to_i64, map_summary_row, position_to_i64};
use super::migrate;
use crate::repository::{CatalogRepository, SkippedRow, StorageError, UpsertReport};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        migrate::run_migrations(&self.pool).await.map_err(conn)
    }

    async fn upsert_all(&self, entries: &[TestSummary]) -> Result<UpsertReport, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut report = UpsertReport::default();

        // Rows the latest fetch no longer lists must not linger with stale positions.
        let mut prune = QueryBuilder::<Sqlite>::new("DELETE FROM tests WHERE id NOT IN (");
        let mut ids = prune.separated(", ");
        for entry in entries {
            ids.push_bind(entry.id().as_str().to_owned());
        }
        ids.push_unseparated(")");
        let pruned = prune
            .build()
            .execute(&mut *tx)
            .await
            .map_err(conn)?
            .rows_affected();

        for (position, entry) in entries.iter().enumerate() {
            let written = sqlx::query(
                r"
                INSERT INTO tests (id, name, description, level, numberOfTasks, position)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    level = excluded.level,
                    numberOfTasks = excluded.numberOfTasks,
                    position = excluded.position
                ",
            )
            .bind(entry.id().as_str().to_owned())
            .bind(entry.name().to_owned())
            .bind(entry.description().to_owned())
            .bind(entry.level().to_owned())
            .bind(count_to_i64(entry.number_of_tasks()))
            .bind(position_to_i64(position)?)
            .execute(&mut *tx)
            .await;

            match written {
                Ok(_) => report.written += 1,
                Err(err) => {
                    tracing::warn!(test_id = %entry.id(), error = %err, "failed to cache catalog row, skipping");
                    report.skipped.push(SkippedRow {
                        id: entry.id().clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(
            written = report.written,
            pruned,
            skipped = report.skipped.len(),
            "catalog batch committed"
        );
        Ok(report)
    }

    async fn query_all(&self) -> Result<Vec<TestSummary>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, description, level, numberOfTasks
            FROM tests
            ORDER BY position ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            summaries.push(map_summary_row(&row)?);
        }
        Ok(summaries)
    }
}
