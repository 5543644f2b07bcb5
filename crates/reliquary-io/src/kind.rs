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


//! The registry of resource kinds.

use crate::resource::ResourceData;
use ahash::AHashMap;
use reliquary_core::{ResourceError, ResourceResult, TypeTag};
use std::fmt;
use std::sync::Arc;

/// Produces an empty payload for a kind.
pub type KindFactory = Arc<dyn Fn() -> Box<dyn ResourceData> + Send + Sync>;

/// A registered resource kind: its tag, caching policy, and payload factory.
#[derive(Clone)]
pub struct ResourceKind {
    tag: TypeTag,
    caching_enabled: bool,
    factory: KindFactory,
}

impl ResourceKind {
    /// The kind's tag.
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Whether path loads of this kind go through the cache.
    pub fn caching_enabled(&self) -> bool {
        self.caching_enabled
    }

    /// Builds a fresh, empty payload.
    pub fn create(&self) -> Box<dyn ResourceData> {
        (self.factory)()
    }
}

impl fmt::Debug for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceKind")
            .field("tag", &self.tag)
            .field("caching_enabled", &self.caching_enabled)
            .finish_non_exhaustive()
    }
}

/// Kinds in registration order, indexed by tag.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    kinds: Vec<ResourceKind>,
    index: AHashMap<TypeTag, usize>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kind with caching enabled.
    pub fn register(&mut self, tag: TypeTag, factory: KindFactory) -> ResourceResult<()> {
        self.register_with_policy(tag, true, factory)
    }

    /// Registers a kind with an explicit caching policy.
    ///
    /// # Errors
    /// [`ResourceError::AlreadyExists`] if `tag` is already registered.
    pub fn register_with_policy(
        &mut self,
        tag: TypeTag,
        caching_enabled: bool,
        factory: KindFactory,
    ) -> ResourceResult<()> {
        if self.index.contains_key(&tag) {
            return Err(ResourceError::AlreadyExists(tag.to_string()));
        }
        self.index.insert(tag, self.kinds.len());
        self.kinds.push(ResourceKind {
            tag,
            caching_enabled,
            factory,
        });
        Ok(())
    }

    /// Changes the caching policy of a kind and returns the previous one.
    ///
    /// # Errors
    /// [`ResourceError::UnknownKind`] if `tag` was never registered.
    pub fn set_caching(&mut self, tag: TypeTag, enabled: bool) -> ResourceResult<bool> {
        let kind = self
            .index
            .get(&tag)
            .map(|&i| &mut self.kinds[i])
            .ok_or(ResourceError::UnknownKind(tag))?;
        Ok(std::mem::replace(&mut kind.caching_enabled, enabled))
    }

    /// Returns the caching policy of a kind.
    pub fn is_caching(&self, tag: TypeTag) -> ResourceResult<bool> {
        self.get(tag).map(ResourceKind::caching_enabled)
    }

    /// Looks up a kind.
    pub fn get(&self, tag: TypeTag) -> ResourceResult<&ResourceKind> {
        self.index
            .get(&tag)
            .map(|&i| &self.kinds[i])
            .ok_or(ResourceError::UnknownKind(tag))
    }

    /// Returns `true` if `tag` was registered.
    pub fn contains(&self, tag: TypeTag) -> bool {
        self.index.contains_key(&tag)
    }

    /// Builds an empty payload of the given kind.
    pub fn create(&self, tag: TypeTag) -> ResourceResult<Box<dyn ResourceData>> {
        self.get(tag).map(ResourceKind::create)
    }

    /// Registered tags in registration order.
    pub fn list(&self) -> Vec<TypeTag> {
        self.kinds.iter().map(ResourceKind::tag).collect()
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns `true` if no kind was registered.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
