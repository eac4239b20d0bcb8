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

//! Identity canonicalization through content hashes.

use khora_core::resource::{ContentHash, ResourceId};
use std::collections::HashMap;

/// Maps identifiers to the canonical identifier used for caching.
///
/// Identifiers without a registered hash are their own canonical identifier.
/// Identifiers sharing a hash collapse onto the first identifier that registered
/// that hash. Both tables are first-registration-wins and never overwritten.
#[derive(Debug, Default, Clone)]
pub struct IdentityTable {
    identifier_to_hash: HashMap<ResourceId, ContentHash>,
    hash_to_canonical: HashMap<ContentHash, ResourceId>,
}

impl IdentityTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `identifier` has content `hash`.
    ///
    /// Idempotent per table entry: an identifier keeps its first hash, and a hash
    /// keeps its first canonical identifier. Returns the canonical identifier of
    /// `identifier` after registration.
    pub fn register_hash(&mut self, hash: ContentHash, identifier: ResourceId) -> ResourceId {
        self.hash_to_canonical
            .entry(hash.clone())
            .or_insert_with(|| identifier.clone());
        self.identifier_to_hash
            .entry(identifier.clone())
            .or_insert(hash);
        self.canonicalize(&identifier)
    }

    /// Resolves `identifier` to its canonical identifier. Never fails.
    pub fn canonicalize(&self, identifier: &ResourceId) -> ResourceId {
        self.identifier_to_hash
            .get(identifier)
            .and_then(|hash| self.hash_to_canonical.get(hash))
            .unwrap_or(identifier)
            .clone()
    }

    /// The hash registered for `identifier`, if any.
    pub fn hash_of(&self, identifier: &ResourceId) -> Option<&ContentHash> {
        self.identifier_to_hash.get(identifier)
    }

    /// The number of identifiers with a registered hash.
    pub fn len(&self) -> usize {
        self.identifier_to_hash.len()
    }

    /// Returns `true` when no hash is registered.
    pub fn is_empty(&self) -> bool {
        self.identifier_to_hash.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_identifiers_map_to_themselves() {
        let table = IdentityTable::new();
        let id = ResourceId::from("http://example.com/a.png");
        assert_eq!(table.canonicalize(&id), id);
    }

    #[test]
    fn aliases_collapse_onto_the_first_registration() {
        let mut table = IdentityTable::new();
        let hash = ContentHash::from("abc123");

        let first = table.register_hash(hash.clone(), "http://cdn/a.png".into());
        let alias = table.register_hash(hash, "local/a.png".into());

        assert_eq!(first.as_str(), "http://cdn/a.png");
        assert_eq!(alias.as_str(), "http://cdn/a.png");
        assert_eq!(
            table.canonicalize(&"local/a.png".into()).as_str(),
            "http://cdn/a.png"
        );
    }

    #[test]
    fn registrations_are_never_overwritten() {
        let mut table = IdentityTable::new();
        table.register_hash("h1".into(), "a".into());
        table.register_hash("h2".into(), "a".into());
        table.register_hash("h2".into(), "b".into());

        assert_eq!(table.hash_of(&"a".into()), Some(&ContentHash::from("h1")));
        // "a" claimed h2 first even though its own hash stayed h1.
        assert_eq!(table.canonicalize(&"b".into()).as_str(), "a");
        assert_eq!(table.canonicalize(&"a".into()).as_str(), "a");
        assert_eq!(table.len(), 2);
    }
}
