//! Queries over the tracer's SQLite export
//!
//! [`NsightAnalyzer`] holds a read-only connection for its lifetime. Every
//! accessor returns rows in storage order; range filters are closed intervals
//! bound as query parameters. Tables the tracer omitted (it skips categories
//! with no events) read as empty.

pub mod record;
pub mod schema;

pub use record::Record;

use crate::error::{ProfileError, Result};
use deepprofile_shared::types::job::RUN_RANGE;
use deepprofile_shared::types::trace::{
    DeviceLimits, Dim3, KernelOccupancy, Occupancy, TimeRange,
};
use record::query_records;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything recovered from one trace, ready for JSON export
#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    pub database: PathBuf,
    pub run_range: Option<TimeRange>,
    pub nvtx_events: Vec<Record>,
    pub kernels: Vec<Record>,
    pub gpus: Vec<Record>,
    pub generic_events: Vec<Record>,
}

/// Read-only view of a trace export
pub struct NsightAnalyzer {
    path: PathBuf,
    conn: Connection,
}

impl NsightAnalyzer {
    /// Open the export at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ProfileError::MissingArtifact(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!("Opened trace {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// NVTX range and mark events, optionally limited to `range`
    pub fn nvtx_events(&self, range: Option<TimeRange>) -> Result<Vec<Record>> {
        self.select(schema::NVTX_EVENTS, range)
    }

    /// One record per device the tracer discovered
    pub fn gpu_info(&self) -> Result<Vec<Record>> {
        self.select(schema::TARGET_INFO_GPU, None)
    }

    /// Kernel launches, optionally limited to `range`, each with a trailing
    /// `name` column resolved from `shortName`
    pub fn cupti_kernel_events(&self, range: Option<TimeRange>) -> Result<Vec<Record>> {
        let kernels = if schema::table_exists(&self.conn, schema::STRING_IDS)? {
            let query = format!(
                "SELECT k.*, s.value AS name FROM {} AS k \
                 LEFT JOIN {} AS s ON s.id = k.shortName",
                schema::KERNEL_EVENTS,
                schema::STRING_IDS
            );
            self.select_query(schema::KERNEL_EVENTS, &query, "k.", range)?
        } else {
            let mut kernels = self.select(schema::KERNEL_EVENTS, range)?;
            for kernel in &mut kernels {
                kernel.push("name", Value::Null);
            }
            kernels
        };

        // A name reference with nothing behind it
        let dangling = kernels.iter().find_map(|kernel| {
            let id = kernel.get_i64("shortName")?;
            matches!(kernel.get("name"), Some(Value::Null)).then_some(id)
        });
        if let Some(id) = dangling {
            return Err(ProfileError::NotFound {
                what: "string id",
                id,
            });
        }

        Ok(kernels)
    }

    /// User-level generic events, unfiltered
    pub fn generic_events(&self) -> Result<Vec<Record>> {
        self.select(schema::GENERIC_EVENTS, None)
    }

    /// Launch limits of the first device whose id is `device_id`
    pub fn device_limits(&self, device_id: i64) -> Result<DeviceLimits> {
        let not_found = ProfileError::NotFound {
            what: "device",
            id: device_id,
        };
        if !schema::table_exists(&self.conn, schema::TARGET_INFO_GPU)? {
            return Err(not_found);
        }

        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT maxBlockDimX, maxBlockDimY, maxBlockDimZ, \
                    maxGridDimX, maxGridDimY, maxGridDimZ \
             FROM {} WHERE id = ?1 LIMIT 1",
            schema::TARGET_INFO_GPU
        ))?;
        let dims = stmt
            .query_row([device_id], |row| {
                let dim = |i: usize| -> rusqlite::Result<u64> {
                    Ok(row.get::<_, i64>(i)?.max(0) as u64)
                };
                Ok((
                    Dim3::new(dim(0)?, dim(1)?, dim(2)?),
                    Dim3::new(dim(3)?, dim(4)?, dim(5)?),
                ))
            })
            .optional()?;

        let (max_block_dim, max_grid_dim) = dims.ok_or(not_found)?;
        Ok(DeviceLimits {
            device_id,
            max_block_dim,
            max_grid_dim,
        })
    }

    /// Occupancy of `blocks` and `grids` on device `device_id`.
    ///
    /// Results above 1.0 are returned unclamped.
    pub fn compute_occupancy(&self, device_id: i64, blocks: u64, grids: u64) -> Result<Occupancy> {
        self.device_limits(device_id)?
            .occupancy(blocks, grids)
            .ok_or(ProfileError::DegenerateDevice(device_id))
    }

    /// Occupancy of every kernel launch against its own device
    pub fn kernel_occupancies(&self, range: Option<TimeRange>) -> Result<Vec<KernelOccupancy>> {
        let mut devices: HashMap<i64, DeviceLimits> = HashMap::new();
        let mut result = Vec::new();

        for kernel in self.cupti_kernel_events(range)? {
            let device_id = required_i64(&kernel, "deviceId")?;
            let blocks = volume(&kernel, ["blockX", "blockY", "blockZ"])?;
            let grids = volume(&kernel, ["gridX", "gridY", "gridZ"])?;

            if !devices.contains_key(&device_id) {
                let limits = self.device_limits(device_id)?;
                devices.insert(device_id, limits);
            }
            let occupancy = devices[&device_id]
                .occupancy(blocks, grids)
                .ok_or(ProfileError::DegenerateDevice(device_id))?;

            result.push(KernelOccupancy {
                name: kernel.get_str("name").unwrap_or_default().to_string(),
                device_id,
                start: required_i64(&kernel, "start")?,
                end: required_i64(&kernel, "end")?,
                blocks,
                grids,
                occupancy,
            });
        }

        Ok(result)
    }

    /// Interval of the runner's `run` range, if the trace recorded one
    pub fn run_range(&self) -> Result<Option<TimeRange>> {
        self.named_range(RUN_RANGE)
    }

    /// Interval of the earliest closed NVTX range called `name`
    pub fn named_range(&self, name: &str) -> Result<Option<TimeRange>> {
        if !schema::table_exists(&self.conn, schema::NVTX_EVENTS)? {
            return Ok(None);
        }

        // Without a string table only inline names can match
        let query = if schema::table_exists(&self.conn, schema::STRING_IDS)? {
            format!(
                "SELECT e.start, e.\"end\" FROM {} AS e \
                 LEFT JOIN {} AS s ON s.id = e.textId \
                 WHERE e.\"end\" IS NOT NULL AND COALESCE(e.text, s.value) = ?1 \
                 ORDER BY e.start LIMIT 1",
                schema::NVTX_EVENTS,
                schema::STRING_IDS
            )
        } else {
            format!(
                "SELECT start, \"end\" FROM {} \
                 WHERE \"end\" IS NOT NULL AND text = ?1 \
                 ORDER BY start LIMIT 1",
                schema::NVTX_EVENTS
            )
        };
        let mut stmt = self.conn.prepare_cached(&query)?;
        let range = stmt
            .query_row([name], |row| Ok(TimeRange::new(row.get(0)?, row.get(1)?)))
            .optional()?;
        Ok(range)
    }

    /// Collect every table into one report
    pub fn report(&self) -> Result<TraceReport> {
        Ok(TraceReport {
            database: self.path.clone(),
            run_range: self.run_range()?,
            nvtx_events: self.nvtx_events(None)?,
            kernels: self.cupti_kernel_events(None)?,
            gpus: self.gpu_info()?,
            generic_events: self.generic_events()?,
        })
    }

    fn select(&self, table: &'static str, range: Option<TimeRange>) -> Result<Vec<Record>> {
        self.select_query(table, &format!("SELECT * FROM {table}"), "", range)
    }

    /// Run `query` over `table` in storage order, filtered to `range`.
    ///
    /// `qualifier` prefixes the filter and order columns when the query
    /// aliases the table.
    fn select_query(
        &self,
        table: &'static str,
        query: &str,
        qualifier: &str,
        range: Option<TimeRange>,
    ) -> Result<Vec<Record>> {
        if let Some(range) = range {
            if !range.is_valid() {
                return Err(ProfileError::InvalidRange {
                    start: range.start,
                    end: range.end,
                });
            }
        }

        if !schema::table_exists(&self.conn, table)? {
            debug!("Table {} not present in {}", table, self.path.display());
            return Ok(Vec::new());
        }

        let q = qualifier;
        let records = match range {
            Some(range) => query_records(
                &self.conn,
                &format!(
                    "{query} WHERE {q}start >= ?1 AND {q}\"end\" <= ?2 ORDER BY {q}rowid"
                ),
                [range.start, range.end],
            )?,
            None => query_records(&self.conn, &format!("{query} ORDER BY {q}rowid"), [])?,
        };
        debug!("{} rows from {}", records.len(), table);
        Ok(records)
    }
}

fn required_i64(record: &Record, column: &'static str) -> Result<i64> {
    record
        .get_i64(column)
        .ok_or_else(|| ProfileError::Query(rusqlite::Error::InvalidColumnName(column.to_string())))
}

fn volume(record: &Record, columns: [&'static str; 3]) -> Result<u64> {
    let mut total: u64 = 1;
    for column in columns {
        total = total.saturating_mul(required_i64(record, column)?.max(0) as u64);
    }
    Ok(total)
}
