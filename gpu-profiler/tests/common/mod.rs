//! Fixture exports laid out like the tracer's SQLite schema

#![allow(dead_code)]

use rusqlite::Connection;
use std::path::Path;

pub const SCHEMA: &str = "
CREATE TABLE StringIds (id INTEGER PRIMARY KEY, value TEXT NOT NULL);

CREATE TABLE NVTX_EVENTS (
    start INTEGER NOT NULL,
    \"end\" INTEGER,
    eventType INTEGER NOT NULL,
    rangeId INTEGER,
    category INTEGER,
    color INTEGER,
    text TEXT,
    globalTid INTEGER,
    endGlobalTid INTEGER,
    textId INTEGER,
    domainId INTEGER
);

CREATE TABLE CUPTI_ACTIVITY_KIND_KERNEL (
    start INTEGER NOT NULL,
    \"end\" INTEGER NOT NULL,
    deviceId INTEGER NOT NULL,
    contextId INTEGER NOT NULL,
    streamId INTEGER NOT NULL,
    correlationId INTEGER,
    globalPid INTEGER,
    demangledName INTEGER NOT NULL,
    shortName INTEGER NOT NULL,
    gridX INTEGER NOT NULL,
    gridY INTEGER NOT NULL,
    gridZ INTEGER NOT NULL,
    blockX INTEGER NOT NULL,
    blockY INTEGER NOT NULL,
    blockZ INTEGER NOT NULL,
    registersPerThread INTEGER NOT NULL,
    staticSharedMemory INTEGER NOT NULL,
    dynamicSharedMemory INTEGER NOT NULL
);

CREATE TABLE TARGET_INFO_GPU (
    vmId INTEGER NOT NULL,
    id INTEGER NOT NULL,
    name TEXT,
    busLocation TEXT,
    isDiscrete INTEGER,
    l2CacheSize INTEGER,
    totalMemory INTEGER,
    smCount INTEGER,
    maxBlockDimX INTEGER NOT NULL,
    maxBlockDimY INTEGER NOT NULL,
    maxBlockDimZ INTEGER NOT NULL,
    maxGridDimX INTEGER NOT NULL,
    maxGridDimY INTEGER NOT NULL,
    maxGridDimZ INTEGER NOT NULL
);

CREATE TABLE GENERIC_EVENTS (
    rawTimestamp INTEGER NOT NULL,
    timestamp INTEGER NOT NULL,
    typeId INTEGER NOT NULL,
    data TEXT NOT NULL
);
";

pub const DATA: &str = "
INSERT INTO StringIds VALUES (1, 'myKernel');
INSERT INTO StringIds VALUES (2, 'gemm_kernel');
INSERT INTO StringIds VALUES (3, 'void gemm_kernel<float>(float*, float*)');
INSERT INTO StringIds VALUES (4, 'warmup');

INSERT INTO NVTX_EVENTS VALUES (500, 800, 59, NULL, NULL, NULL, 'setup', 1, NULL, NULL, 0);
INSERT INTO NVTX_EVENTS VALUES (1000, 9000, 59, NULL, NULL, NULL, 'run', 1, NULL, NULL, 0);
INSERT INTO NVTX_EVENTS VALUES (1500, 2500, 59, NULL, NULL, NULL, NULL, 1, NULL, 4, 0);
INSERT INTO NVTX_EVENTS VALUES (3000, 8000, 59, NULL, NULL, NULL, 'step', 1, NULL, NULL, 0);
INSERT INTO NVTX_EVENTS VALUES (9500, NULL, 34, NULL, NULL, NULL, 'mark', 1, NULL, NULL, 0);

INSERT INTO CUPTI_ACTIVITY_KIND_KERNEL VALUES
    (2000, 2400, 0, 1, 7, 10, 100, 1, 1, 4, 1, 1, 256, 1, 1, 32, 0, 0);
INSERT INTO CUPTI_ACTIVITY_KIND_KERNEL VALUES
    (3100, 3900, 0, 1, 7, 11, 100, 3, 2, 8, 8, 1, 32, 32, 1, 64, 1024, 0);
INSERT INTO CUPTI_ACTIVITY_KIND_KERNEL VALUES
    (4000, 4500, 1, 2, 13, 12, 100, 1, 1, 1, 1, 1, 64, 1, 1, 16, 0, 0);

INSERT INTO TARGET_INFO_GPU VALUES
    (0, 0, 'NVIDIA A100-SXM4-40GB', '0000:07:00.0', 1, 41943040, 42505273344, 108,
     1024, 1024, 64, 2147483647, 65535, 65535);
INSERT INTO TARGET_INFO_GPU VALUES
    (0, 1, 'Test GPU', '0000:0a:00.0', 1, 1048576, 8589934592, 8,
     32, 32, 1, 8, 8, 1);
INSERT INTO TARGET_INFO_GPU VALUES
    (0, 2, 'Broken GPU', '0000:0b:00.0', 1, 0, 0, 0,
     0, 0, 0, 0, 0, 0);

INSERT INTO GENERIC_EVENTS VALUES (1200, 1200, 5, '{\"step\":1}');
INSERT INTO GENERIC_EVENTS VALUES (9100, 9100, 5, '{\"step\":2}');
";

/// Write the full fixture export to `path`
pub fn build_trace(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn.execute_batch(DATA).unwrap();
}

/// Write a fixture whose only kernel references a missing string id
pub fn build_trace_with_dangling_name(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn.execute_batch(
        "INSERT INTO CUPTI_ACTIVITY_KIND_KERNEL VALUES
            (2000, 2400, 0, 1, 7, 10, 100, 99, 99, 1, 1, 1, 1, 1, 1, 8, 0, 0);",
    )
    .unwrap();
}

/// Write the full fixture minus the runner's `run` range
pub fn build_trace_without_run_range(path: &Path) {
    build_trace(path);
    Connection::open(path)
        .unwrap()
        .execute("DELETE FROM NVTX_EVENTS WHERE text = 'run'", [])
        .unwrap();
}

/// Write a fixture with kernels but no string table at all
pub fn build_trace_without_string_ids(path: &Path) {
    build_trace(path);
    Connection::open(path)
        .unwrap()
        .execute_batch("DROP TABLE StringIds;")
        .unwrap();
}
