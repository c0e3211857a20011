//! Tables of the tracer's SQLite export

use rusqlite::Connection;

pub const NVTX_EVENTS: &str = "NVTX_EVENTS";
pub const KERNEL_EVENTS: &str = "CUPTI_ACTIVITY_KIND_KERNEL";
pub const TARGET_INFO_GPU: &str = "TARGET_INFO_GPU";
pub const STRING_IDS: &str = "StringIds";
pub const GENERIC_EVENTS: &str = "GENERIC_EVENTS";

/// Check if a table exists in the database
pub fn table_exists(conn: &Connection, table_name: &str) -> rusqlite::Result<bool> {
    let mut stmt =
        conn.prepare_cached("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    let mut rows = stmt.query([table_name])?;
    Ok(rows.next()?.is_some())
}
