//! Profile job descriptor
//!
//! A job is the unit of work handed from the launcher to the runner process.
//! It names a function registered in the runner and carries its arguments as
//! structured JSON data, so it can be reconstructed in a fresh process.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the NVTX range the runner pushes around the job
pub const RUN_RANGE: &str = "run";

/// A registered function name plus its positional and keyword arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileJob {
    /// Name of the function in the runner's job registry
    pub function: String,

    /// Positional arguments
    #[serde(default)]
    pub args: Vec<Value>,

    /// Keyword arguments
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl ProfileJob {
    /// Create a job with no arguments
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }

    /// Append a positional argument
    pub fn with_arg<T: Serialize>(mut self, value: T) -> serde_json::Result<Self> {
        self.args.push(serde_json::to_value(value)?);
        Ok(self)
    }

    /// Set a keyword argument, replacing any previous value
    pub fn with_kwarg<T: Serialize>(
        mut self,
        name: impl Into<String>,
        value: T,
    ) -> serde_json::Result<Self> {
        self.kwargs.insert(name.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Decode the positional argument at `index`, if present
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> serde_json::Result<Option<T>> {
        self.args
            .get(index)
            .map(|v| T::deserialize(v))
            .transpose()
    }

    /// Decode the keyword argument `name`, if present
    pub fn kwarg<T: DeserializeOwned>(&self, name: &str) -> serde_json::Result<Option<T>> {
        self.kwargs
            .get(name)
            .map(|v| T::deserialize(v))
            .transpose()
    }

    /// Serialize to the payload format read by the runner
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse a payload written by [`ProfileJob::to_payload`]
    pub fn from_payload(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
