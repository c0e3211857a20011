//! NVTX FFI bindings
//!
//! Only the range push/pop entry points of `libnvToolsExt` are bound. The
//! library is loaded at run time so the runner works on hosts without CUDA.

use std::ffi::{c_char, c_int};

pub type NvtxRangePushA = unsafe extern "C" fn(message: *const c_char) -> c_int;
pub type NvtxRangePop = unsafe extern "C" fn() -> c_int;

/// Environment variable overriding the library path
pub const LIBRARY_ENV: &str = "DEEPPROFILE_NVTX_LIB";

/// Library names tried in order when no override is set
pub const LIBRARY_NAMES: &[&str] = &[
    "libnvToolsExt.so.1",
    "libnvToolsExt.so",
    "/usr/local/cuda/lib64/libnvToolsExt.so.1",
    "nvToolsExt64_1.dll",
];

pub const SYM_RANGE_PUSH_A: &[u8] = b"nvtxRangePushA\0";
pub const SYM_RANGE_POP: &[u8] = b"nvtxRangePop\0";
