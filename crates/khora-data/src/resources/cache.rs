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

//! The result cache: canonical identifier to loaded resource.

use khora_core::resource::{Resource, ResourceHandle, ResourceId, UntypedHandle};
use std::collections::HashMap;

/// A central, in-memory cache of loaded resources, keyed by canonical identifier.
///
/// Entries are insertion-only: the first resource stored under a key stays there
/// until it is explicitly evicted. Subsequent requests for the same key receive
/// a clone of the cached handle.
#[derive(Debug, Default, Clone)]
pub struct ResourceCache {
    storage: HashMap<ResourceId, UntypedHandle>,
}

impl ResourceCache {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self {
            storage: HashMap::new(),
        }
    }

    /// Stores `handle` under `identifier` unless the key is already taken.
    ///
    /// Returns `true` when the handle was inserted, `false` when an earlier
    /// entry was kept.
    pub fn insert(&mut self, identifier: ResourceId, handle: UntypedHandle) -> bool {
        if self.storage.contains_key(&identifier) {
            log::debug!("ResourceCache: '{identifier}' already cached, keeping the first entry.");
            return false;
        }
        self.storage.insert(identifier, handle);
        true
    }

    /// Stores `handle` if the key is free and returns whichever handle ends up cached.
    pub fn get_or_insert(&mut self, identifier: ResourceId, handle: UntypedHandle) -> UntypedHandle {
        self.storage.entry(identifier).or_insert(handle).clone()
    }

    /// Retrieves the handle cached under `identifier`.
    pub fn get(&self, identifier: &ResourceId) -> Option<&UntypedHandle> {
        self.storage.get(identifier)
    }

    /// Retrieves the handle cached under `identifier` as a `T`.
    ///
    /// Returns `None` when nothing is cached or the cached resource is not a `T`.
    pub fn get_typed<T: Resource>(&self, identifier: &ResourceId) -> Option<ResourceHandle<T>> {
        self.storage.get(identifier).and_then(UntypedHandle::typed::<T>)
    }

    /// Checks if a resource is cached under `identifier`.
    pub fn contains(&self, identifier: &ResourceId) -> bool {
        self.storage.contains_key(identifier)
    }

    /// Removes and returns the entry for `identifier`.
    pub fn remove(&mut self, identifier: &ResourceId) -> Option<UntypedHandle> {
        self.storage.remove(identifier)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.storage.clear();
    }

    /// The number of cached resources.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Iterates over the cached identifiers, in no particular order.
    pub fn identifiers(&self) -> impl Iterator<Item = &ResourceId> {
        self.storage.keys()
    }
}
