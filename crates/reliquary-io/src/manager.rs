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


//! The resource manager: one context object owning kinds, cache, and codecs.

use crate::cache::ResourceCache;
use crate::codec::{run_loader, CodecRegistry, ResourceLoader, ResourceWriter};
use crate::kind::TypeRegistry;
use crate::metrics::ResourceMetrics;
use crate::resource::{LoadState, Resource, ResourceData, ResourceOrigin};
use crate::settings::ResourceSettings;
use reliquary_core::telemetry::MetricsResult;
use reliquary_core::{
    ByteStream, Identity, IdentityRegistry, OriginKey, PathResolver, Referable, ResourceError,
    ResourceResult, TypeTag,
};
use reliquary_telemetry::MetricsRegistry;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

/// Everything guarded by the manager's single lock.
#[derive(Default)]
struct ManagerState {
    kinds: TypeRegistry,
    cache: ResourceCache,
    codecs: CodecRegistry,
}

/// Serves resources by kind and origin, loading each origin at most once per cached kind.
///
/// Kind registration, cache access, codec resolution, and loader runs are all
/// serialized by one lock, so two threads requesting the same origin always
/// end up with the same instance. The identity table has its own lock and is
/// never held while the manager lock is being acquired.
///
/// Reading or mutating a resource's payload does not take the manager lock.
pub struct ResourceManager {
    identities: IdentityRegistry,
    resolver: Arc<dyn PathResolver>,
    state: Mutex<ManagerState>,
    settings: ResourceSettings,
    metrics: Option<ResourceMetrics>,
}

impl ResourceManager {
    /// Creates a manager with default settings.
    pub fn new(resolver: Arc<dyn PathResolver>) -> Self {
        Self::with_settings(resolver, ResourceSettings::default())
    }

    /// Creates a manager with explicit settings.
    pub fn with_settings(resolver: Arc<dyn PathResolver>, settings: ResourceSettings) -> Self {
        Self {
            identities: IdentityRegistry::with_capacity(settings.identity_capacity),
            resolver,
            state: Mutex::new(ManagerState::default()),
            settings,
            metrics: None,
        }
    }

    /// Registers the resource metrics in `registry`, unless the settings disable them.
    pub fn with_metrics(mut self, registry: &MetricsRegistry) -> MetricsResult<Self> {
        if self.settings.record_metrics {
            self.metrics = Some(ResourceMetrics::register(
                registry,
                &self.settings.metrics_namespace,
            )?);
        }
        Ok(self)
    }

    /// The identity registry every resource of this manager is enrolled in.
    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    /// The settings this manager was built with.
    pub fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    /// The manager's metrics, or `None` when they were disabled in the settings.
    pub fn metrics(&self) -> Option<&ResourceMetrics> {
        self.metrics.as_ref()
    }

    /// The resolver paths are normalized and opened through.
    pub fn resolver(&self) -> &Arc<dyn PathResolver> {
        &self.resolver
    }

    // --- Kinds ---

    /// Registers a kind with the default caching policy from the settings.
    ///
    /// # Errors
    /// [`ResourceError::AlreadyExists`] if the kind is already registered.
    pub fn register_kind<F>(&self, kind: impl Into<TypeTag>, factory: F) -> ResourceResult<()>
    where
        F: Fn() -> Box<dyn ResourceData> + Send + Sync + 'static,
    {
        let kind = kind.into();
        let mut state = self.lock()?;
        state
            .kinds
            .register_with_policy(kind, self.settings.default_caching, Arc::new(factory))?;
        state.cache.add_kind(kind);
        log::info!(
            "Registered resource kind '{kind}' (caching {})",
            if self.settings.default_caching { "on" } else { "off" }
        );
        Ok(())
    }

    /// Registers a kind whose empty payload is `T::default()`.
    pub fn register_kind_of<T>(&self, kind: impl Into<TypeTag>) -> ResourceResult<()>
    where
        T: ResourceData + Default,
    {
        self.register_kind(kind, || Box::new(T::default()) as Box<dyn ResourceData>)
    }

    /// Turns caching on or off for a kind.
    ///
    /// Turning it off evicts every cached resource of the kind. Callers that
    /// still hold an evicted resource keep it; it is only forgotten by the cache.
    ///
    /// # Errors
    /// [`ResourceError::UnknownKind`] if the kind was never registered.
    pub fn set_caching(&self, kind: impl Into<TypeTag>, enabled: bool) -> ResourceResult<()> {
        let kind = kind.into();
        let mut state = self.lock()?;
        let was_enabled = state.kinds.set_caching(kind, enabled)?;
        let evicted = if was_enabled && !enabled {
            state.cache.evict_all(kind)
        } else {
            Vec::new()
        };
        drop(state);

        log::info!(
            "Caching for '{kind}' turned {} ({} evicted)",
            if enabled { "on" } else { "off" },
            evicted.len()
        );
        self.record(|m| m.evicted(evicted.len()));
        drop(evicted);
        self.record_live();
        Ok(())
    }

    /// Returns whether resources of `kind` are currently cached.
    pub fn is_caching(&self, kind: impl Into<TypeTag>) -> ResourceResult<bool> {
        self.lock()?.kinds.is_caching(kind.into())
    }

    /// Registered kinds in registration order.
    pub fn kinds(&self) -> ResourceResult<Vec<TypeTag>> {
        Ok(self.lock()?.kinds.list())
    }

    // --- Codecs ---

    /// Appends a loader; it is tried before every loader registered earlier.
    pub fn register_loader(&self, loader: impl ResourceLoader + 'static) -> ResourceResult<()> {
        self.lock()?.codecs.register_loader(Arc::new(loader))
    }

    /// Appends a writer; it is tried before every writer registered earlier.
    pub fn register_writer(&self, writer: impl ResourceWriter + 'static) -> ResourceResult<()> {
        self.lock()?.codecs.register_writer(Arc::new(writer))
    }

    /// Loader names in resolution order.
    pub fn loader_names(&self) -> ResourceResult<Vec<String>> {
        Ok(self.lock()?.codecs.loader_names())
    }

    /// Writer names in resolution order.
    pub fn writer_names(&self) -> ResourceResult<Vec<String>> {
        Ok(self.lock()?.codecs.writer_names())
    }

    // --- Resources ---

    /// Creates an in-memory resource with an empty payload.
    ///
    /// It has no origin, counts as loaded, and is never cached.
    pub fn create(&self, kind: impl Into<TypeTag>) -> ResourceResult<Arc<Resource>> {
        let kind = kind.into();
        let data = self.lock()?.kinds.create(kind)?;
        let resource = self
            .identities
            .create(|lease| Resource::new(lease, kind, data, LoadState::Loaded, None));
        self.record_live();
        Ok(resource)
    }

    /// Returns a resource for `path` without reading it.
    ///
    /// If the origin is already cached, that instance is returned. Otherwise a
    /// new, unloaded resource is created; it enters the cache after its first
    /// successful [`load_resource`](Self::load_resource).
    pub fn declare(&self, kind: impl Into<TypeTag>, path: &str) -> ResourceResult<Arc<Resource>> {
        let kind = kind.into();
        let state = self.lock()?;
        let data = state.kinds.create(kind)?;
        let key = self.resolver.normalize(path);

        if let Some(key) = &key {
            if let Some(hit) = self.cache_lookup(&state, kind, key) {
                return Ok(hit);
            }
        }
        drop(state);

        let origin = ResourceOrigin::new(path, key, None);
        let resource = self
            .identities
            .create(|lease| Resource::new(lease, kind, data, LoadState::Unloaded, Some(origin)));
        self.record_live();
        Ok(resource)
    }

    /// Returns the cached instance for `path`, without loading anything.
    ///
    /// Always `None` for kinds with caching disabled and for paths the
    /// resolver cannot normalize.
    pub fn cached(
        &self,
        kind: impl Into<TypeTag>,
        path: &str,
    ) -> ResourceResult<Option<Arc<Resource>>> {
        let kind = kind.into();
        let state = self.lock()?;
        if !state.kinds.is_caching(kind)? {
            return Ok(None);
        }
        Ok(self
            .resolver
            .normalize(path)
            .and_then(|key| state.cache.get(kind, &key)))
    }

    /// Resolves an identity to a live resource of this manager.
    pub fn look_up(&self, identity: Identity) -> Option<Arc<Resource>> {
        self.identities
            .look_up(identity)?
            .into_any()
            .downcast::<Resource>()
            .ok()
    }

    // --- Loading ---

    /// Returns the `kind` resource at `path`, loading it on a cache miss.
    ///
    /// Only loaders that sniff the content as `kind` are considered.
    ///
    /// # Errors
    /// [`ResourceError::UnknownKind`], [`ResourceError::NotFound`],
    /// [`ResourceError::NoLoaderFound`], or whatever the loader reports.
    pub fn load(&self, kind: impl Into<TypeTag>, path: &str) -> ResourceResult<Arc<Resource>> {
        self.request(Some(kind.into()), path)
    }

    /// Returns the resource at `path` with whatever kind its content sniffs as.
    pub fn load_any(&self, path: &str) -> ResourceResult<Arc<Resource>> {
        self.request(None, path)
    }

    /// Loads a resource from an already open stream, starting at its current position.
    ///
    /// The stream's own origin, if it has one, is used as the cache key and
    /// recorded on the resource. Anonymous streams bypass the cache and
    /// produce resources without an origin.
    ///
    /// # Errors
    /// On any failure the stream is left at the position it had on entry, so
    /// the caller can retry it, e.g. after registering another loader.
    pub fn load_stream(
        &self,
        requested: Option<TypeTag>,
        stream: &mut dyn ByteStream,
    ) -> ResourceResult<Arc<Resource>> {
        let mut state = self.lock()?;
        if let Some(kind) = requested {
            state.kinds.get(kind)?;
        }
        let key = stream.origin().cloned();

        if let (Some(kind), Some(key)) = (requested, &key) {
            if let Some(hit) = self.cache_lookup(&state, kind, key) {
                return self.ensure_loaded(&state, hit);
            }
        }

        let (loader, kind) = state.codecs.resolve_loader(stream, requested)?;
        if requested.is_none() {
            state.kinds.get(kind)?;
            if let Some(key) = &key {
                if let Some(hit) = self.cache_lookup(&state, kind, key) {
                    return self.ensure_loaded(&state, hit);
                }
            }
        }

        let origin = key.map(|key| {
            ResourceOrigin::new(key.to_string(), Some(key), Some(Arc::clone(&loader)))
        });
        self.materialize(&mut state, kind, loader, stream, origin)
    }

    /// Loads a declared or unloaded resource in place. Returns `Ok(true)` if a load ran.
    ///
    /// After the first successful load, the resource is cached under its
    /// origin unless another instance already occupies that slot.
    ///
    /// # Errors
    /// On failure the resource stays unloaded and is not cached.
    pub fn load_resource(&self, resource: &Arc<Resource>) -> ResourceResult<bool> {
        let mut state = self.lock()?;
        let loaded = self.load_in_place(&state, resource)?;

        if let Some(key) = resource.origin().and_then(|o| o.key().cloned()) {
            let kind = resource.kind();
            if state.kinds.is_caching(kind)? && !state.cache.contains(kind, &key) {
                log::debug!("Caching {kind} {} under '{key}'", resource.identity());
                state.cache.insert(kind, key, Arc::clone(resource))?;
            }
        }
        Ok(loaded)
    }

    /// Drops the content of a resource that has an origin. Returns `Ok(true)` if it was loaded.
    ///
    /// The resource stays cached; the next request for it loads it again.
    pub fn unload(&self, resource: &Resource) -> ResourceResult<bool> {
        let _state = self.lock()?;
        resource.unload()
    }

    /// Unloads then loads a resource, reusing the loader bound to its origin.
    pub fn reload(&self, resource: &Arc<Resource>) -> ResourceResult<()> {
        let state = self.lock()?;
        resource.unload()?;
        self.load_in_place(&state, resource)?;
        Ok(())
    }

    // --- Cache ---

    /// Removes the cached instance for `path`. Returns `Ok(true)` if there was one.
    ///
    /// Callers still holding the resource keep it; use [`cached`](Self::cached)
    /// first to get a handle.
    pub fn evict(&self, kind: impl Into<TypeTag>, path: &str) -> ResourceResult<bool> {
        let kind = kind.into();
        let mut state = self.lock()?;
        state.kinds.get(kind)?;
        let evicted = self
            .resolver
            .normalize(path)
            .and_then(|key| state.cache.evict(kind, &key));
        drop(state);

        let Some(evicted) = evicted else {
            return Ok(false);
        };
        log::debug!("Evicted {kind} '{path}'");
        self.record(|m| m.evicted(1));
        drop(evicted);
        self.record_live();
        Ok(true)
    }

    /// Removes every cached instance of a kind. Returns how many were removed.
    pub fn evict_all(&self, kind: impl Into<TypeTag>) -> ResourceResult<usize> {
        let kind = kind.into();
        let mut state = self.lock()?;
        state.kinds.get(kind)?;
        let evicted = state.cache.evict_all(kind);
        drop(state);

        let count = evicted.len();
        log::debug!("Evicted {count} cached {kind} resources");
        self.record(|m| m.evicted(count));
        drop(evicted);
        self.record_live();
        Ok(count)
    }

    /// Number of cached resources of a kind.
    pub fn cached_count(&self, kind: impl Into<TypeTag>) -> ResourceResult<usize> {
        let kind = kind.into();
        let state = self.lock()?;
        state.kinds.get(kind)?;
        Ok(state.cache.len(kind))
    }

    // --- Writing ---

    /// Serializes a resource with the newest writer supporting its kind and `extension`.
    ///
    /// An unloaded resource is loaded first.
    pub fn write(
        &self,
        resource: &Resource,
        extension: &str,
        sink: &mut dyn Write,
    ) -> ResourceResult<()> {
        let writer = self.prepare_write(resource, extension)?;
        write_with(resource, writer.as_ref(), sink)
    }

    /// Writes a resource to `path` through the resolver, picking the writer by the path's extension.
    ///
    /// Nothing is created or replaced at `path` unless the writer succeeded.
    pub fn save(&self, resource: &Resource, path: &str) -> ResourceResult<()> {
        let extension = OriginKey::new(path)
            .extension()
            .ok_or_else(|| ResourceError::NoWriterFound {
                kind: resource.kind(),
                extension: String::new(),
            })?;
        let writer = self.prepare_write(resource, &extension)?;

        // Serialize fully before touching the destination, so a failing writer leaves it intact.
        let mut encoded = Vec::new();
        write_with(resource, writer.as_ref(), &mut encoded)?;

        let mut sink = self.resolver.create(path)?;
        sink.write_all(&encoded)?;
        sink.flush()?;
        log::info!("Saved {} {} to '{path}'", resource.kind(), resource.identity());
        Ok(())
    }

    /// Copies a resource's payload into a new resource with its own identity.
    ///
    /// The copy keeps the origin but is not cached.
    pub fn duplicate(&self, resource: &Resource) -> ResourceResult<Arc<Resource>> {
        let copy = resource.duplicate(&self.identities)?;
        self.record_live();
        Ok(copy)
    }

    /// Number of identities currently registered.
    pub fn live_identities(&self) -> usize {
        self.identities.live_count()
    }

    // --- Internals ---

    fn request(&self, requested: Option<TypeTag>, path: &str) -> ResourceResult<Arc<Resource>> {
        let mut state = self.lock()?;
        if let Some(kind) = requested {
            state.kinds.get(kind)?;
        }

        let key = self.resolver.normalize(path);
        if key.is_none() {
            log::debug!("'{path}' cannot be normalized; bypassing the cache");
        }
        if let (Some(kind), Some(key)) = (requested, &key) {
            if let Some(hit) = self.cache_lookup(&state, kind, key) {
                return self.ensure_loaded(&state, hit);
            }
        }

        let mut stream = self.resolver.open(path)?;
        let (loader, kind) = state.codecs.resolve_loader(stream.as_mut(), requested)?;
        if requested.is_none() {
            state.kinds.get(kind)?;
            if let Some(key) = &key {
                if let Some(hit) = self.cache_lookup(&state, kind, key) {
                    return self.ensure_loaded(&state, hit);
                }
            }
        }

        let origin = ResourceOrigin::new(path, key, Some(loader.clone()));
        self.materialize(&mut state, kind, loader, stream.as_mut(), Some(origin))
    }

    /// Runs the loader into a fresh payload and enrolls the result.
    ///
    /// The cache is only touched after the loader succeeded.
    fn materialize(
        &self,
        state: &mut ManagerState,
        kind: TypeTag,
        loader: Arc<dyn ResourceLoader>,
        stream: &mut dyn ByteStream,
        origin: Option<ResourceOrigin>,
    ) -> ResourceResult<Arc<Resource>> {
        let mut data = state.kinds.create(kind)?;
        let result = {
            let _timer = self.metrics.as_ref().map(ResourceMetrics::load_timer);
            run_loader(loader.as_ref(), stream, data.as_mut())
        };
        if let Err(e) = result {
            self.record(ResourceMetrics::failed);
            return Err(e);
        }
        self.record(ResourceMetrics::loaded);

        let key = origin.as_ref().and_then(|o| o.key().cloned());
        let resource = self
            .identities
            .create(|lease| Resource::new(lease, kind, data, LoadState::Loaded, origin));
        log::debug!(
            "Loaded {kind} {} with '{}'",
            resource.identity(),
            loader.name()
        );

        if let Some(key) = key {
            if state.kinds.is_caching(kind)? {
                state.cache.insert(kind, key, Arc::clone(&resource))?;
            }
        }
        self.record_live();
        Ok(resource)
    }

    /// Looks a key up in the cache of a caching kind and records the hit or miss.
    fn cache_lookup(
        &self,
        state: &ManagerState,
        kind: TypeTag,
        key: &OriginKey,
    ) -> Option<Arc<Resource>> {
        if !state.kinds.is_caching(kind).unwrap_or(false) {
            return None;
        }
        match state.cache.get(kind, key) {
            Some(hit) => {
                log::debug!("Cache hit for {kind} '{key}'");
                self.record(ResourceMetrics::hit);
                Some(hit)
            }
            None => {
                log::debug!("Cache miss for {kind} '{key}'");
                self.record(ResourceMetrics::miss);
                None
            }
        }
    }

    /// Cached resources may have been unloaded since; bring them back before handing them out.
    fn ensure_loaded(
        &self,
        state: &ManagerState,
        resource: Arc<Resource>,
    ) -> ResourceResult<Arc<Resource>> {
        self.load_in_place(state, &resource)?;
        Ok(resource)
    }

    fn load_in_place(&self, state: &ManagerState, resource: &Resource) -> ResourceResult<bool> {
        if resource.is_loaded() {
            return Ok(false);
        }
        let result = {
            let _timer = self.metrics.as_ref().map(ResourceMetrics::load_timer);
            resource.load(self.resolver.as_ref(), &state.codecs)
        };
        match &result {
            Ok(true) => self.record(ResourceMetrics::loaded),
            Ok(false) => {}
            Err(_) => self.record(ResourceMetrics::failed),
        }
        result
    }

    fn prepare_write(
        &self,
        resource: &Resource,
        extension: &str,
    ) -> ResourceResult<Arc<dyn ResourceWriter>> {
        let state = self.lock()?;
        let writer = state.codecs.resolve_writer(resource.kind(), extension)?;
        self.load_in_place(&state, resource)?;
        Ok(writer)
    }

    fn record(&self, update: impl FnOnce(&ResourceMetrics)) {
        if let Some(metrics) = &self.metrics {
            update(metrics);
        }
    }

    fn record_live(&self) {
        let live = self.identities.live_count();
        self.record(|m| m.live(live));
    }

    fn lock(&self) -> ResourceResult<MutexGuard<'_, ManagerState>> {
        self.state
            .lock()
            .map_err(|_| ResourceError::LockPoisoned("resource manager"))
    }
}

fn write_with(
    resource: &Resource,
    writer: &dyn ResourceWriter,
    sink: &mut dyn Write,
) -> ResourceResult<()> {
    log::debug!(
        "Writing {} {} with '{}'",
        resource.kind(),
        resource.identity(),
        writer.name()
    );
    resource.with_data(|data| writer.write(data, sink))?
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("identities", &self.identities)
            .field("settings", &self.settings)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}
