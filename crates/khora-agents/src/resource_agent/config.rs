// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Loader configuration and per-call request options.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration of a [`ResourceLoader`](super::ResourceLoader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// When `true`, callers that did not trigger a load (they attached to an
    /// in-flight request or hit the cache) receive the handler's
    /// `clone_resource` of the shared resource instead of the shared one.
    pub clone_shared: bool,
    /// Upper bound on requests inside their handler's `load` at once. Waiting
    /// requests start by priority, then in the order they were made. Values
    /// below 1 are treated as 1.
    pub max_concurrent_requests: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            clone_shared: false,
            max_concurrent_requests: 32,
        }
    }
}

impl LoaderConfig {
    /// Parses a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.max_concurrent_requests.max(1)
    }
}

/// Free-form options passed along with a request call.
///
/// Handlers read them through their load context. Options given to a
/// top-level call are inherited by every dependency the handlers request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestOptions {
    values: Map<String, Value>,
}

impl RequestOptions {
    /// Creates an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`RequestOptions::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Reads `key` as a `T`. Returns `None` when it is absent or has another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?.clone();
        serde_json::from_value(value).ok()
    }

    /// The raw JSON value stored under `key`.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns `true` if `key` is set.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns `true` if no option is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
