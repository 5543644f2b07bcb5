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


//! Resource instances, their origins, and the load/unload state machine.
//!
//! A [`Resource`] pairs an identity with a type-erased payload
//! ([`ResourceData`]). Resources obtained from a path or a stream carry a
//! [`ResourceOrigin`] that remembers where the bytes came from and which loader
//! decoded them, so the content can be dropped and re-materialized later
//! without sniffing the format again.

use crate::codec::{run_loader, CodecRegistry, ResourceLoader};
use reliquary_core::{
    Identity, IdentityLease, IdentityRegistry, OriginKey, PathResolver, Referable, ResourceError,
    ResourceResult, TypeTag,
};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The content of a resource, populated by loaders and read by writers.
pub trait ResourceData: Any + Send + Sync + fmt::Debug {
    /// Drops the loaded content, returning the payload to its freshly created state.
    fn clear(&mut self);

    /// Returns a deep copy, or `None` if this payload cannot be copied.
    fn duplicate(&self) -> Option<Box<dyn ResourceData>> {
        None
    }

    /// The concrete Rust type name, used in mismatch errors.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns a reference to the payload as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to the payload as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Downcasts a populate target to the payload type a loader expects.
///
/// # Errors
/// Returns [`ResourceError::TypeMismatch`] if `target` is not a `T`.
pub fn downcast_target<T: ResourceData>(target: &mut dyn ResourceData) -> ResourceResult<&mut T> {
    let found = target.type_name();
    target
        .as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| ResourceError::type_mismatch(std::any::type_name::<T>(), found))
}

/// Whether a resource's payload currently holds loaded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// The payload is empty; `load` will populate it from the origin.
    Unloaded,
    /// The payload holds content.
    Loaded,
}

/// The deferred-load descriptor of a resource.
#[derive(Clone)]
pub struct ResourceOrigin {
    origin: String,
    key: Option<OriginKey>,
    loader: Option<Arc<dyn ResourceLoader>>,
}

impl ResourceOrigin {
    /// Creates an origin for the raw path (or stream origin) the bytes come from.
    ///
    /// `key` is the normalized cache key, if the origin could be normalized.
    /// Without a `loader`, the first load resolves one by sniffing.
    pub fn new(
        origin: impl Into<String>,
        key: Option<OriginKey>,
        loader: Option<Arc<dyn ResourceLoader>>,
    ) -> Self {
        Self {
            origin: origin.into(),
            key,
            loader,
        }
    }

    /// The raw origin string used to reopen the bytes.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The normalized cache key, if any.
    pub fn key(&self) -> Option<&OriginKey> {
        self.key.as_ref()
    }

    /// The name of the loader bound to this origin, if one has been resolved.
    pub fn loader_name(&self) -> Option<&str> {
        self.loader.as_deref().map(|loader| loader.name())
    }
}

impl fmt::Debug for ResourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOrigin")
            .field("origin", &self.origin)
            .field("key", &self.key)
            .field("loader", &self.loader_name())
            .finish()
    }
}

struct ResourceSlot {
    data: Box<dyn ResourceData>,
    state: LoadState,
    origin: Option<ResourceOrigin>,
}

/// A shared, identity-tracked resource of one kind.
///
/// Every holder of the same `Arc<Resource>` observes the same payload: the
/// cache never copies. Interior mutability is provided by a `RwLock` so loads
/// and unloads can happen through shared handles.
pub struct Resource {
    lease: IdentityLease,
    kind: TypeTag,
    slot: RwLock<ResourceSlot>,
}

impl Resource {
    pub(crate) fn new(
        lease: IdentityLease,
        kind: TypeTag,
        data: Box<dyn ResourceData>,
        state: LoadState,
        origin: Option<ResourceOrigin>,
    ) -> Self {
        Self {
            lease,
            kind,
            slot: RwLock::new(ResourceSlot {
                data,
                state,
                origin,
            }),
        }
    }

    /// The current load state.
    pub fn state(&self) -> LoadState {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).state
    }

    /// Returns `true` if the payload holds content.
    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    /// A copy of the origin descriptor, if the resource came from a path or stream.
    pub fn origin(&self) -> Option<ResourceOrigin> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .origin
            .clone()
    }

    /// Runs `read` against the payload downcast to `T`.
    ///
    /// # Errors
    /// [`ResourceError::TypeMismatch`] if the payload is not a `T`.
    pub fn read_as<T: ResourceData, R>(&self, read: impl FnOnce(&T) -> R) -> ResourceResult<R> {
        let slot = self.read_slot()?;
        let data = slot
            .data
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| ResourceError::type_mismatch(std::any::type_name::<T>(), slot.data.type_name()))?;
        Ok(read(data))
    }

    /// Runs `write` against the payload downcast to `T`.
    ///
    /// The change is visible to every holder of this resource.
    pub fn write_as<T: ResourceData, R>(
        &self,
        write: impl FnOnce(&mut T) -> R,
    ) -> ResourceResult<R> {
        let mut slot = self.write_slot()?;
        let data = downcast_target::<T>(slot.data.as_mut())?;
        Ok(write(data))
    }

    /// Runs `read` against the type-erased payload.
    pub fn with_data<R>(&self, read: impl FnOnce(&dyn ResourceData) -> R) -> ResourceResult<R> {
        let slot = self.read_slot()?;
        Ok(read(slot.data.as_ref()))
    }

    /// Populates the payload from the origin if it is currently unloaded.
    ///
    /// Returns `Ok(true)` if a load was performed. Resources without an origin
    /// are always loaded, so this is a no-op for them, as it is for resources
    /// that are already loaded. A loader resolved here (by sniffing, restricted
    /// to this resource's kind) is remembered for the next load.
    ///
    /// On failure the payload is cleared back to its empty state and the
    /// resource stays [`LoadState::Unloaded`].
    pub(crate) fn load(
        &self,
        resolver: &dyn PathResolver,
        codecs: &CodecRegistry,
    ) -> ResourceResult<bool> {
        let mut slot = self.write_slot()?;
        if slot.state == LoadState::Loaded {
            return Ok(false);
        }
        let Some(origin) = slot.origin.clone() else {
            slot.state = LoadState::Loaded;
            return Ok(false);
        };

        let mut stream = resolver.open(&origin.origin)?;
        let loader = match origin.loader {
            Some(loader) => loader,
            None => {
                let (loader, kind) = codecs.resolve_loader(stream.as_mut(), Some(self.kind))?;
                if kind != self.kind {
                    return Err(ResourceError::type_mismatch(self.kind, kind));
                }
                loader
            }
        };

        if let Err(e) = run_loader(loader.as_ref(), stream.as_mut(), slot.data.as_mut()) {
            slot.data.clear();
            return Err(e);
        }

        slot.state = LoadState::Loaded;
        if let Some(origin) = slot.origin.as_mut() {
            origin.loader = Some(loader);
        }
        log::debug!("Loaded {} {} from '{}'", self.kind, self.identity(), origin.origin);
        Ok(true)
    }

    /// Drops the payload's content. Returns `Ok(true)` if the state changed.
    ///
    /// Resources without an origin cannot be reloaded, so unloading them is a no-op.
    pub(crate) fn unload(&self) -> ResourceResult<bool> {
        let mut slot = self.write_slot()?;
        if slot.origin.is_none() || slot.state == LoadState::Unloaded {
            return Ok(false);
        }
        slot.data.clear();
        slot.state = LoadState::Unloaded;
        log::debug!("Unloaded {} {}", self.kind, self.identity());
        Ok(true)
    }

    /// Copies the payload into a new resource with its own identity and the same origin.
    ///
    /// # Errors
    /// [`ResourceError::CloneNotSupported`] if the payload cannot be duplicated.
    pub fn duplicate(&self, identities: &IdentityRegistry) -> ResourceResult<Arc<Resource>> {
        let slot = self.read_slot()?;
        let data = slot
            .data
            .duplicate()
            .ok_or(ResourceError::CloneNotSupported(self.kind))?;
        let state = slot.state;
        let origin = slot.origin.clone();
        drop(slot);

        Ok(identities.create(|lease| Resource::new(lease, self.kind, data, state, origin)))
    }

    fn read_slot(&self) -> ResourceResult<RwLockReadGuard<'_, ResourceSlot>> {
        self.slot
            .read()
            .map_err(|_| ResourceError::LockPoisoned("resource payload"))
    }

    fn write_slot(&self) -> ResourceResult<RwLockWriteGuard<'_, ResourceSlot>> {
        self.slot
            .write()
            .map_err(|_| ResourceError::LockPoisoned("resource payload"))
    }
}

impl Referable for Resource {
    fn identity(&self) -> Identity {
        self.lease.identity()
    }

    fn kind(&self) -> TypeTag {
        self.kind
    }

    fn try_clone(&self, identities: &IdentityRegistry) -> ResourceResult<Arc<dyn Referable>> {
        let copy: Arc<dyn Referable> = self.duplicate(identities)?;
        Ok(copy)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("identity", &self.identity())
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}
