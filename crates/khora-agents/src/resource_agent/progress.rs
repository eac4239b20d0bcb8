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

//! Load progress counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// A snapshot of how many serviced requests were issued and how many settled
/// successfully since the last reset.
///
/// Cache hits and requests attached to an in-flight load are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadProgress {
    /// Requests handed to a handler.
    pub requested: u64,
    /// Requests that settled successfully.
    pub loaded: u64,
}

impl LoadProgress {
    /// `loaded / requested`, or `1.0` when nothing was requested.
    pub fn ratio(&self) -> f32 {
        if self.requested == 0 {
            1.0
        } else {
            self.loaded as f32 / self.requested as f32
        }
    }

    /// Returns `true` once every requested resource is loaded.
    pub fn is_complete(&self) -> bool {
        self.loaded >= self.requested
    }
}

#[derive(Debug, Default)]
pub(crate) struct ProgressCounters {
    requested: AtomicU64,
    loaded: AtomicU64,
}

impl ProgressCounters {
    pub(crate) fn record_requested(&self) {
        self.requested.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_loaded(&self) -> LoadProgress {
        self.loaded.fetch_add(1, Ordering::SeqCst);
        self.snapshot()
    }

    pub(crate) fn snapshot(&self) -> LoadProgress {
        LoadProgress {
            requested: self.requested.load(Ordering::SeqCst),
            loaded: self.loaded.load(Ordering::SeqCst),
        }
    }

    pub(crate) fn reset(&self) {
        self.requested.store(0, Ordering::SeqCst);
        self.loaded.store(0, Ordering::SeqCst);
    }
}
