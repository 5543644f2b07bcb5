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


//! Origin-keyed storage of shared resources, partitioned by kind.

use crate::resource::Resource;
use ahash::AHashMap;
use reliquary_core::{OriginKey, ResourceError, ResourceResult, TypeTag};
use std::sync::Arc;

/// Maps `(kind, origin key)` to the one shared instance loaded from that origin.
///
/// Entries hold strong references: a cached resource stays alive until it is
/// evicted, even if every caller has dropped its handle. Evicting returns the
/// removed handles so the caller decides where they are dropped.
#[derive(Debug, Default)]
pub struct ResourceCache {
    slots: AHashMap<TypeTag, AHashMap<OriginKey, Arc<Resource>>>,
}

impl ResourceCache {
    /// Creates an empty cache with no kinds enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the (empty) slot map for a kind. Does nothing if it exists.
    pub fn add_kind(&mut self, kind: TypeTag) {
        self.slots.entry(kind).or_default();
    }

    /// Returns the cached instance for `key`, if any.
    pub fn get(&self, kind: TypeTag, key: &OriginKey) -> Option<Arc<Resource>> {
        self.slots.get(&kind)?.get(key).cloned()
    }

    /// Stores `resource` under `key`, replacing and returning any previous entry.
    ///
    /// # Errors
    /// [`ResourceError::UnknownKind`] if the kind has no slot map.
    pub fn insert(
        &mut self,
        kind: TypeTag,
        key: OriginKey,
        resource: Arc<Resource>,
    ) -> ResourceResult<Option<Arc<Resource>>> {
        let slot = self
            .slots
            .get_mut(&kind)
            .ok_or(ResourceError::UnknownKind(kind))?;
        Ok(slot.insert(key, resource))
    }

    /// Removes one entry.
    pub fn evict(&mut self, kind: TypeTag, key: &OriginKey) -> Option<Arc<Resource>> {
        self.slots.get_mut(&kind)?.remove(key)
    }

    /// Removes every entry of a kind. The slot map itself is kept.
    pub fn evict_all(&mut self, kind: TypeTag) -> Vec<Arc<Resource>> {
        self.slots
            .get_mut(&kind)
            .map(|slot| slot.drain().map(|(_, resource)| resource).collect())
            .unwrap_or_default()
    }

    /// Returns `true` if `key` is cached under `kind`.
    pub fn contains(&self, kind: TypeTag, key: &OriginKey) -> bool {
        self.slots
            .get(&kind)
            .is_some_and(|slot| slot.contains_key(key))
    }

    /// Number of cached entries of a kind.
    pub fn len(&self, kind: TypeTag) -> usize {
        self.slots.get(&kind).map_or(0, |slot| slot.len())
    }

    /// Total number of cached entries across all kinds.
    pub fn total(&self) -> usize {
        self.slots.values().map(|slot| slot.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{LoadState, ResourceData};
    use reliquary_core::{IdentityRegistry, Referable};
    use std::any::Any;

    #[derive(Debug, Default)]
    struct Blob;

    impl ResourceData for Blob {
        fn clear(&mut self) {}

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn blob(identities: &IdentityRegistry, kind: TypeTag) -> Arc<Resource> {
        identities.create(|lease| Resource::new(lease, kind, Box::new(Blob), LoadState::Loaded, None))
    }

    #[test]
    fn test_insert_requires_a_registered_kind() {
        let identities = IdentityRegistry::new();
        let mut cache = ResourceCache::new();
        let image = TypeTag::new("Image");

        let err = cache
            .insert(image, OriginKey::new("/a.img"), blob(&identities, image))
            .unwrap_err();
        assert!(matches!(err, ResourceError::UnknownKind(_)));

        cache.add_kind(image);
        assert!(cache
            .insert(image, OriginKey::new("/a.img"), blob(&identities, image))
            .unwrap()
            .is_none());
        assert!(cache.contains(image, &OriginKey::new("/a.img")));
    }

    #[test]
    fn test_last_insert_wins() {
        let identities = IdentityRegistry::new();
        let mut cache = ResourceCache::new();
        let image = TypeTag::new("Image");
        cache.add_kind(image);

        let first = blob(&identities, image);
        let second = blob(&identities, image);
        let key = OriginKey::new("/a.img");
        cache.insert(image, key.clone(), first.clone()).unwrap();
        let replaced = cache.insert(image, key.clone(), second.clone()).unwrap();

        assert!(Arc::ptr_eq(&replaced.unwrap(), &first));
        assert!(Arc::ptr_eq(&cache.get(image, &key).unwrap(), &second));
        assert_eq!(cache.len(image), 1);
    }

    #[test]
    fn test_kinds_are_partitioned() {
        let identities = IdentityRegistry::new();
        let mut cache = ResourceCache::new();
        let (image, mesh) = (TypeTag::new("Image"), TypeTag::new("Mesh"));
        cache.add_kind(image);
        cache.add_kind(mesh);

        let key = OriginKey::new("/shared.bin");
        cache.insert(image, key.clone(), blob(&identities, image)).unwrap();

        assert!(cache.get(mesh, &key).is_none());
        assert_eq!(cache.get(image, &key).unwrap().kind(), image);
    }

    #[test]
    fn test_evict_all_returns_handles_and_keeps_the_kind() {
        let identities = IdentityRegistry::new();
        let mut cache = ResourceCache::new();
        let image = TypeTag::new("Image");
        cache.add_kind(image);
        for path in ["/a", "/b", "/c"] {
            cache.insert(image, OriginKey::new(path), blob(&identities, image)).unwrap();
        }
        assert_eq!(identities.live_count(), 3);

        let evicted = cache.evict_all(image);
        assert_eq!(evicted.len(), 3);
        assert_eq!(cache.total(), 0);
        assert_eq!(identities.live_count(), 3, "Evicted handles are still held");

        drop(evicted);
        assert_eq!(identities.live_count(), 0);

        // The kind stays usable after a full eviction.
        cache.insert(image, OriginKey::new("/a"), blob(&identities, image)).unwrap();
        assert!(cache.evict(image, &OriginKey::new("/a")).is_some());
        assert!(cache.evict(image, &OriginKey::new("/a")).is_none());
    }
}
