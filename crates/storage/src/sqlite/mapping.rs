use quiz_core::model::{TestId, TestSummary};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn count_to_i64(v: u32) -> i64 {
    i64::from(v)
}

pub(crate) fn count_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn position_to_i64(position: usize) -> Result<i64, StorageError> {
    i64::try_from(position).map_err(|_| StorageError::Serialization("position overflow".into()))
}

pub(crate) fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}

pub(crate) fn map_summary_row(row: &SqliteRow) -> Result<TestSummary, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let number_of_tasks = count_from_i64(
        "numberOfTasks",
        row.try_get::<i64, _>("numberOfTasks").map_err(ser)?,
    )?;

    TestSummary::new(
        TestId::new(id),
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<String, _>("description").map_err(ser)?,
        row.try_get::<String, _>("level").map_err(ser)?,
        number_of_tasks,
    )
    .map_err(ser)
}
