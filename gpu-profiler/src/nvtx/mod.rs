//! NVTX named ranges
//!
//! The tracer records ranges pushed through `libnvToolsExt`. When the library
//! cannot be loaded, ranges become no-ops and a warning is logged once; the
//! launcher rejects traces that lack the resulting `run` range.

pub mod bindings;

use bindings::{NvtxRangePop, NvtxRangePushA};
use libloading::Library;
use std::ffi::CString;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Resolved NVTX entry points
pub(crate) struct Nvtx {
    push: NvtxRangePushA,
    pop: NvtxRangePop,
    // Keeps `push` and `pop` valid
    _library: Option<Library>,
}

static NVTX: OnceLock<Option<Nvtx>> = OnceLock::new();

fn nvtx() -> Option<&'static Nvtx> {
    NVTX.get_or_init(load).as_ref()
}

fn load() -> Option<Nvtx> {
    let candidates: Vec<String> = match std::env::var(bindings::LIBRARY_ENV) {
        Ok(path) => vec![path],
        Err(_) => bindings::LIBRARY_NAMES.iter().map(|s| s.to_string()).collect(),
    };

    let nvtx = load_from(candidates.iter().map(String::as_str));
    if nvtx.is_none() {
        warn!("NVTX library not found; named ranges will not be recorded");
    }
    nvtx
}

fn load_from<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Option<Nvtx> {
    for name in candidates {
        // SAFETY: dynamic library probing only.
        let library = match unsafe { Library::new(name) } {
            Ok(library) => library,
            Err(e) => {
                debug!("NVTX library {} not loadable: {}", name, e);
                continue;
            }
        };

        // SAFETY: the symbol types match the C signatures declared in `bindings`.
        let symbols = unsafe {
            match (
                library.get::<NvtxRangePushA>(bindings::SYM_RANGE_PUSH_A),
                library.get::<NvtxRangePop>(bindings::SYM_RANGE_POP),
            ) {
                (Ok(push), Ok(pop)) => Some((*push, *pop)),
                _ => None,
            }
        };
        let Some((push, pop)) = symbols else {
            warn!("{} does not export the NVTX range API", name);
            continue;
        };

        debug!("Loaded NVTX from {}", name);
        return Some(Nvtx {
            push,
            pop,
            _library: Some(library),
        });
    }
    None
}

impl Nvtx {
    fn push_range(&'static self, name: &str) -> RangeGuard {
        let Ok(message) = CString::new(name) else {
            warn!("NVTX range name contains a NUL byte: {:?}", name);
            return RangeGuard { nvtx: None };
        };

        // SAFETY: `message` outlives the call; NVTX copies the string.
        unsafe { (self.push)(message.as_ptr()) };
        debug!("Pushed NVTX range {}", name);

        RangeGuard { nvtx: Some(self) }
    }
}

/// Whether ranges pushed by this process reach the tracer
pub fn is_available() -> bool {
    nvtx().is_some()
}

/// Push a named range that is popped when the returned guard drops
pub fn push_range(name: &str) -> RangeGuard {
    match nvtx() {
        Some(nvtx) => nvtx.push_range(name),
        None => RangeGuard { nvtx: None },
    }
}

/// Open NVTX range; pops on drop
#[must_use = "the range is popped as soon as the guard is dropped"]
pub struct RangeGuard {
    nvtx: Option<&'static Nvtx>,
}

impl RangeGuard {
    pub fn is_active(&self) -> bool {
        self.nvtx.is_some()
    }
}

impl Drop for RangeGuard {
    fn drop(&mut self) {
        if let Some(nvtx) = self.nvtx {
            // SAFETY: pairs with the push made when this guard was created.
            unsafe { (nvtx.pop)() };
        }
    }
}
