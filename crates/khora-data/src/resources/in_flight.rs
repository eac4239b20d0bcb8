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

//! Requests currently being serviced, keyed by canonical identifier.

use khora_core::resource::ResourceId;
use std::collections::HashMap;

/// Tracks the live request servicing each canonical identifier, so concurrent
/// requests for the same key attach to it instead of loading twice.
///
/// Generic over the request representation, which belongs to the loader.
#[derive(Debug)]
pub struct InFlightTable<T> {
    entries: HashMap<ResourceId, T>,
}

impl<T> InFlightTable<T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The request servicing `identifier`, if one is running.
    pub fn get(&self, identifier: &ResourceId) -> Option<&T> {
        self.entries.get(identifier)
    }

    /// Registers `request` for `identifier`.
    ///
    /// Returns `false` and leaves the table untouched when the key is already
    /// being serviced.
    pub fn register(&mut self, identifier: ResourceId, request: T) -> bool {
        if self.entries.contains_key(&identifier) {
            return false;
        }
        self.entries.insert(identifier, request);
        true
    }

    /// Removes the entry for `identifier` only if `is_same` accepts it.
    ///
    /// Lets a settling request remove itself without clobbering a newer request
    /// registered under the same key.
    pub fn remove_if(&mut self, identifier: &ResourceId, is_same: impl FnOnce(&T) -> bool) -> Option<T> {
        match self.entries.get(identifier) {
            Some(entry) if is_same(entry) => self.entries.remove(identifier),
            _ => None,
        }
    }

    /// Checks if `identifier` is being serviced.
    pub fn contains(&self, identifier: &ResourceId) -> bool {
        self.entries.contains_key(identifier)
    }

    /// The number of requests in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for InFlightTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
