//! Trace data structures
//!
//! Typed views over values recovered from a tracer export: time intervals,
//! per-device launch limits and the occupancy derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp in tracer clock units (nanoseconds)
pub type Timestamp = i64;

/// Closed time interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// A range is well formed when it does not end before it starts
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Whether `[start, end]` lies entirely inside this range (bounds inclusive)
    pub fn contains(&self, start: Timestamp, end: Timestamp) -> bool {
        start >= self.start && end <= self.end
    }

    pub fn duration_ns(&self) -> u64 {
        self.end.saturating_sub(self.start).max(0) as u64
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

impl std::str::FromStr for TimeRange {
    type Err = anyhow::Error;

    /// Parse `START:END`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("Invalid range (expected START:END): {}", s))?;
        Ok(TimeRange::new(start.trim().parse()?, end.trim().parse()?))
    }
}

/// Three-dimensional launch extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dim3 {
    pub x: u64,
    pub y: u64,
    pub z: u64,
}

impl Dim3 {
    pub fn new(x: u64, y: u64, z: u64) -> Self {
        Self { x, y, z }
    }

    /// Product of the three axes
    pub fn volume(&self) -> u128 {
        self.x as u128 * self.y as u128 * self.z as u128
    }
}

/// Launch limits reported for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceLimits {
    pub device_id: i64,
    pub max_block_dim: Dim3,
    pub max_grid_dim: Dim3,
}

impl DeviceLimits {
    /// Ratio of requested blocks and grids to the device maxima.
    ///
    /// Values above 1.0 are returned as is. Returns `None` when the device
    /// reports a zero maximum along any axis.
    pub fn occupancy(&self, blocks: u64, grids: u64) -> Option<Occupancy> {
        let max_blocks = self.max_block_dim.volume();
        let max_grids = self.max_grid_dim.volume();
        if max_blocks == 0 || max_grids == 0 {
            return None;
        }

        Some(Occupancy {
            block_occupancy: blocks as f64 / max_blocks as f64,
            grid_occupancy: grids as f64 / max_grids as f64,
        })
    }
}

/// Requested resources relative to device maxima
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occupancy {
    pub block_occupancy: f64,
    pub grid_occupancy: f64,
}

/// Occupancy of a single recorded kernel launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelOccupancy {
    pub name: String,
    pub device_id: i64,
    pub start: Timestamp,
    pub end: Timestamp,
    pub blocks: u64,
    pub grids: u64,
    pub occupancy: Occupancy,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(block: (u64, u64, u64), grid: (u64, u64, u64)) -> DeviceLimits {
        DeviceLimits {
            device_id: 0,
            max_block_dim: Dim3::new(block.0, block.1, block.2),
            max_grid_dim: Dim3::new(grid.0, grid.1, grid.2),
        }
    }

    #[test]
    fn test_occupancy_exact_ratio() {
        let limits = device((32, 32, 1), (8, 8, 1));
        let occ = limits.occupancy(512, 16).unwrap();
        assert_eq!(occ.block_occupancy, 0.5);
        assert_eq!(occ.grid_occupancy, 0.25);
    }

    #[test]
    fn test_occupancy_is_not_clamped() {
        let limits = device((32, 32, 1), (8, 8, 1));
        let occ = limits.occupancy(2048, 128).unwrap();
        assert_eq!(occ.block_occupancy, 2.0);
        assert_eq!(occ.grid_occupancy, 2.0);
    }

    #[test]
    fn test_occupancy_monotonic() {
        let limits = device((1024, 1024, 64), (2147483647, 65535, 65535));
        let mut last = limits.occupancy(0, 0).unwrap();
        for n in [1u64, 32, 256, 1024, 4096] {
            let occ = limits.occupancy(n, n).unwrap();
            assert!(occ.block_occupancy >= last.block_occupancy);
            assert!(occ.grid_occupancy >= last.grid_occupancy);
            last = occ;
        }
    }

    #[test]
    fn test_occupancy_degenerate_device() {
        assert!(device((32, 0, 1), (8, 8, 1)).occupancy(1, 1).is_none());
        assert!(device((32, 32, 1), (0, 0, 0)).occupancy(1, 1).is_none());
    }

    #[test]
    fn test_range_contains_inclusive() {
        let range = TimeRange::new(100, 200);
        assert!(range.contains(100, 200));
        assert!(range.contains(150, 160));
        assert!(!range.contains(99, 150));
        assert!(!range.contains(150, 201));
    }

    #[test]
    fn test_range_parse() {
        let range: TimeRange = "10:20".parse().unwrap();
        assert_eq!(range, TimeRange::new(10, 20));
        assert!(range.is_valid());
        assert_eq!(range.duration_ns(), 10);

        assert!("10-20".parse::<TimeRange>().is_err());
        assert!("a:b".parse::<TimeRange>().is_err());
        assert!(!"20:10".parse::<TimeRange>().unwrap().is_valid());
    }
}
