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

//! The `ResourceLoader`: deduplicated, cached, dependency-aware loading.

use super::config::{LoaderConfig, RequestOptions};
use super::events::{LoaderEvent, LoaderEvents};
use super::handler::{LoadContext, PendingResource, ResourceHandler};
use super::node::RequestNode;
use super::progress::{LoadProgress, ProgressCounters};
use super::registry::{ErasedHandler, HandlerRegistry};
use super::settle::settle_closure;
use super::slots::LoadSlots;
use khora_core::resource::{
    ContentHash, LoaderError, Resource, ResourceHandle, ResourceId, ResourceRequest, ResourceType,
    UntypedHandle,
};
use khora_data::resources::{IdentityTable, InFlightTable, ResourceCache};
use std::any::type_name;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Everything guarded by the loader's lock.
#[derive(Default)]
struct LoaderTables {
    handlers: HandlerRegistry,
    identity: IdentityTable,
    cache: ResourceCache,
    in_flight: InFlightTable<Arc<RequestNode>>,
    next_sequence: u64,
}

struct LoaderInner {
    config: LoaderConfig,
    tables: Mutex<LoaderTables>,
    slots: LoadSlots,
    progress: ProgressCounters,
    events: LoaderEvents,
}

/// How a request was matched when it was enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// A new request was created and handed to its handler.
    Created,
    /// The request joined one already in flight for the same canonical id.
    Attached,
    /// The resource was already cached.
    Cached,
    /// No handler is registered for the type.
    Rejected,
}

struct Enqueued {
    request: ResourceRequest,
    node: Arc<RequestNode>,
    origin: Origin,
}

/// Loads resources through registered handlers.
///
/// Concurrent requests for the same canonical identifier share one load, loaded
/// resources are cached, and a request only settles once every dependency its
/// handler requested (transitively) has settled. Handlers run on the tokio
/// runtime; the loader must be used from within one.
///
/// The loader is a cheap handle: clones share the same tables.
#[derive(Clone)]
pub struct ResourceLoader {
    inner: Arc<LoaderInner>,
}

impl Default for ResourceLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceLoader {
    /// Creates a loader with the default configuration.
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    /// Creates a loader with the given configuration.
    pub fn with_config(config: LoaderConfig) -> Self {
        let slots = LoadSlots::new(config.concurrency());
        Self {
            inner: Arc::new(LoaderInner {
                config,
                tables: Mutex::new(LoaderTables::default()),
                slots,
                progress: ProgressCounters::default(),
                events: LoaderEvents::new(),
            }),
        }
    }

    /// The configuration the loader was built with.
    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    // --- Handlers ---

    /// Registers `handler` for `resource_type`, replacing any previous one.
    pub fn register_handler<H: ResourceHandler>(
        &self,
        resource_type: impl Into<ResourceType>,
        handler: H,
    ) {
        let resource_type = resource_type.into();
        log::info!(
            "ResourceLoader: registered handler '{}' for type '{}'.",
            type_name::<H>(),
            resource_type
        );
        if self.tables().handlers.register(resource_type.clone(), handler) {
            log::debug!("ResourceLoader: replaced the previous handler for '{resource_type}'.");
        }
    }

    /// Removes the handler for `resource_type`. Loads already running keep it.
    pub fn unregister_handler(&self, resource_type: &str) -> bool {
        self.tables().handlers.unregister(resource_type)
    }

    /// Returns `true` if a handler is registered for `resource_type`.
    pub fn has_handler(&self, resource_type: &str) -> bool {
        self.tables().handlers.is_registered(resource_type)
    }

    // --- Identity ---

    /// Associates `identifier` with a content hash. Identifiers sharing a hash
    /// resolve to the first identifier registered for it.
    ///
    /// Returns the canonical identifier for `hash`.
    pub fn register_hash(&self, hash: ContentHash, identifier: impl Into<ResourceId>) -> ResourceId {
        self.tables().identity.register_hash(hash, identifier.into())
    }

    /// The identifier `identifier` is cached and deduplicated under.
    pub fn canonicalize(&self, identifier: impl Into<ResourceId>) -> ResourceId {
        self.tables().identity.canonicalize(&identifier.into())
    }

    // --- Cache ---

    /// The cached resource for `identifier` (after canonicalization), if any.
    pub fn get_from_cache(&self, identifier: impl Into<ResourceId>) -> Option<UntypedHandle> {
        let tables = self.tables();
        let canonical = tables.identity.canonicalize(&identifier.into());
        tables.cache.get(&canonical).cloned()
    }

    /// [`ResourceLoader::get_from_cache`], downcast to `T`.
    pub fn get_cached<T: Resource>(&self, identifier: impl Into<ResourceId>) -> Option<ResourceHandle<T>> {
        self.get_from_cache(identifier)?.typed::<T>()
    }

    /// Seeds the cache. A resource already cached under the same canonical
    /// identifier is kept, and `false` is returned.
    pub fn add_to_cache(&self, identifier: impl Into<ResourceId>, resource: UntypedHandle) -> bool {
        let mut tables = self.tables();
        let canonical = tables.identity.canonicalize(&identifier.into());
        tables.cache.insert(canonical, resource)
    }

    /// Removes `identifier` from the cache. Later requests load it again.
    pub fn evict(&self, identifier: impl Into<ResourceId>) -> Option<UntypedHandle> {
        let mut tables = self.tables();
        let canonical = tables.identity.canonicalize(&identifier.into());
        tables.cache.remove(&canonical)
    }

    /// Empties the cache. Requests in flight are unaffected.
    pub fn clear_cache(&self) {
        let mut tables = self.tables();
        log::debug!(
            "ResourceLoader: clearing {} cached resources.",
            tables.cache.len()
        );
        tables.cache.clear();
    }

    /// Number of requests currently being serviced.
    pub fn in_flight_count(&self) -> usize {
        self.tables().in_flight.len()
    }

    // --- Progress and events ---

    /// Progress since the last reset.
    pub fn progress(&self) -> LoadProgress {
        self.inner.progress.snapshot()
    }

    /// Sets both progress counters back to zero.
    pub fn reset_progress(&self) {
        self.inner.progress.reset();
    }

    /// Event callbacks and subscriptions.
    pub fn events(&self) -> &LoaderEvents {
        &self.inner.events
    }

    // --- Requests ---

    /// [`ResourceLoader::request_with_options`] with no options.
    pub async fn request<I>(&self, requests: I) -> Result<Vec<UntypedHandle>, LoaderError>
    where
        I: IntoIterator<Item = ResourceRequest>,
    {
        self.request_with_options(requests, &RequestOptions::default())
            .await
    }

    /// Loads every request, and resolves once all of them, with their
    /// dependency closures, have settled.
    ///
    /// Resources are returned in request order. If any request fails, the call
    /// fails: with that error when exactly one failed, with
    /// [`LoaderError::Batch`] (in request order) otherwise.
    pub async fn request_with_options<I>(
        &self,
        requests: I,
        options: &RequestOptions,
    ) -> Result<Vec<UntypedHandle>, LoaderError>
    where
        I: IntoIterator<Item = ResourceRequest>,
    {
        let entries: Vec<Enqueued> = requests
            .into_iter()
            .map(|request| self.enqueue(request, options, None))
            .collect();

        let mut resources = Vec::with_capacity(entries.len());
        let mut errors = Vec::new();
        for entry in &entries {
            match entry.node.settled().await {
                Ok(resource) => resources.push(self.deliver(entry, resource)),
                Err(error) => errors.push(error),
            }
        }

        if let Some(error) = LoaderError::from_many(errors) {
            return Err(error);
        }
        self.inner.events.emit(LoaderEvent::Complete {
            resources: resources.clone(),
        });
        Ok(resources)
    }

    /// Loads a single request.
    pub async fn request_one(&self, request: ResourceRequest) -> Result<UntypedHandle, LoaderError> {
        let entry = self.enqueue(request, &RequestOptions::default(), None);
        let resource = entry.node.settled().await?;
        let resource = self.deliver(&entry, resource);
        self.inner.events.emit(LoaderEvent::Complete {
            resources: vec![resource.clone()],
        });
        Ok(resource)
    }

    /// Loads `identifier` with the handler for `resource_type` and downcasts
    /// the result to `T`.
    pub async fn load<T: Resource>(
        &self,
        identifier: impl Into<ResourceId>,
        resource_type: impl Into<ResourceType>,
    ) -> Result<ResourceHandle<T>, LoaderError> {
        let identifier = identifier.into();
        let resource = self
            .request_one(ResourceRequest::new(identifier.clone(), resource_type))
            .await?;
        resource.typed::<T>().ok_or_else(|| LoaderError::TypeMismatch {
            identifier,
            expected: type_name::<T>(),
            actual: resource.type_name(),
        })
    }

    /// Enqueues a dependency of `parent`. The dependency takes the parent's
    /// priority.
    pub(crate) fn enqueue_dependency(
        &self,
        request: ResourceRequest,
        options: &RequestOptions,
        parent: &Arc<RequestNode>,
    ) -> PendingResource {
        let request = request.with_priority(parent.priority());
        PendingResource::new(self.enqueue(request, options, Some(parent)).node)
    }

    fn enqueue(
        &self,
        request: ResourceRequest,
        options: &RequestOptions,
        parent: Option<&Arc<RequestNode>>,
    ) -> Enqueued {
        let mut spawn = None;
        let mut rejected = None;
        let (node, origin) = {
            let mut guard = self.tables();
            let tables = &mut *guard;
            let canonical = tables.identity.canonicalize(&request.identifier);

            if let Some(existing) = tables.in_flight.get(&canonical) {
                log::trace!(
                    "ResourceLoader: '{}' joins the in-flight load of '{canonical}'.",
                    request.identifier
                );
                existing.raise_priority(request.priority());
                (Arc::clone(existing), Origin::Attached)
            } else if let Some(cached) = tables.cache.get(&canonical) {
                log::trace!("ResourceLoader: '{canonical}' served from cache.");
                let node = RequestNode::cached(request.clone(), canonical, cached.clone());
                (node, Origin::Cached)
            } else if let Some(handler) = tables.handlers.get(request.resource_type.as_str()) {
                log::trace!("ResourceLoader: new request for '{canonical}'.");
                let sequence = tables.next_sequence;
                tables.next_sequence += 1;
                let node = RequestNode::new(request.clone(), canonical.clone(), sequence);
                tables.in_flight.register(canonical, Arc::clone(&node));
                self.inner.progress.record_requested();
                spawn = Some(handler);
                (node, Origin::Created)
            } else {
                let error = LoaderError::HandlerMissing {
                    identifier: request.identifier.clone(),
                    resource_type: request.resource_type.clone(),
                };
                rejected = Some(error.clone());
                let node = RequestNode::rejected(request.clone(), canonical, error);
                (node, Origin::Rejected)
            }
        };

        if let Some(parent) = parent {
            if !parent.attach_child(Arc::clone(&node)) {
                log::warn!(
                    "ResourceLoader: '{}' requested '{}' while {}; the dependency is loaded but not awaited.",
                    parent.canonical(),
                    request.identifier,
                    parent.state()
                );
            }
        }

        if let Some(handler) = spawn {
            tokio::spawn(self.clone().service(Arc::clone(&node), handler, options.clone()));
        }

        if let Some(error) = rejected {
            log::error!("ResourceLoader: {error}");
            self.inner.events.emit(LoaderEvent::Error {
                request: request.clone(),
                error,
            });
        }

        Enqueued {
            request,
            node,
            origin,
        }
    }

    /// Runs a created request to settlement.
    async fn service(
        self,
        node: Arc<RequestNode>,
        handler: Arc<dyn ErasedHandler>,
        options: RequestOptions,
    ) {
        let ctx = LoadContext::new(self.clone(), Arc::clone(&node), options);
        let outcome = match self.run_handler(&node, handler.as_ref(), &ctx).await {
            Ok(resource) => {
                let resource = self
                    .tables()
                    .cache
                    .get_or_insert(node.canonical().clone(), resource);
                node.finish_open();
                settle_closure(&node).await.map(|()| resource)
            }
            Err(error) => Err(error),
        };
        self.settle(&node, outcome);
    }

    /// Runs `load` then `open`. Only `load` holds a loading slot, so an `open`
    /// that awaits its own dependencies never starves them.
    async fn run_handler(
        &self,
        node: &Arc<RequestNode>,
        handler: &dyn ErasedHandler,
        ctx: &LoadContext,
    ) -> Result<UntypedHandle, LoaderError> {
        let raw = {
            let _slot = self.inner.slots.acquire(node).await;
            node.begin_loading();
            log::debug!(
                "ResourceLoader: loading '{}' as '{}' (priority {}).",
                node.canonical(),
                node.request().resource_type,
                node.priority()
            );
            handler
                .load(ctx)
                .await
                .map_err(|source| LoaderError::LoadFailure {
                    identifier: node.canonical().clone(),
                    source: source.into(),
                })?
        };

        node.begin_opening();
        handler
            .open(raw, ctx)
            .await
            .map_err(|source| LoaderError::OpenFailure {
                identifier: node.canonical().clone(),
                source: source.into(),
            })
    }

    /// Publishes the outcome of a serviced request. Events go out before
    /// waiters are released.
    fn settle(&self, node: &Arc<RequestNode>, outcome: Result<UntypedHandle, LoaderError>) {
        self.tables()
            .in_flight
            .remove_if(node.canonical(), |entry| Arc::ptr_eq(entry, node));

        let request = node.request().clone();
        match outcome {
            Ok(resource) => {
                let progress = self.inner.progress.record_loaded();
                log::debug!(
                    "ResourceLoader: '{}' loaded ({}/{}).",
                    node.canonical(),
                    progress.loaded,
                    progress.requested
                );
                self.inner.events.emit(LoaderEvent::Progress(progress));
                self.inner.events.emit(LoaderEvent::Loaded {
                    request,
                    canonical: node.canonical().clone(),
                    resource: resource.clone(),
                });
                node.succeed(resource);
            }
            Err(error) => {
                let originating = error.is_originating();
                if originating {
                    log::error!("ResourceLoader: {error}");
                } else {
                    log::debug!("ResourceLoader: '{}' failed: {error}", node.canonical());
                }
                self.inner
                    .events
                    .emit(LoaderEvent::Progress(self.inner.progress.snapshot()));
                if originating {
                    self.inner.events.emit(LoaderEvent::Error {
                        request,
                        error: error.clone(),
                    });
                }
                node.fail(error);
            }
        }
    }

    /// The value handed to the caller of `entry`.
    fn deliver(&self, entry: &Enqueued, resource: UntypedHandle) -> UntypedHandle {
        if !self.inner.config.clone_shared || entry.origin == Origin::Created {
            return resource;
        }
        let handler = self.tables().handlers.get(entry.request.resource_type.as_str());
        match handler {
            Some(handler) => handler.clone_resource(&resource, &entry.request),
            None => resource,
        }
    }

    fn tables(&self) -> MutexGuard<'_, LoaderTables> {
        self.inner
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
