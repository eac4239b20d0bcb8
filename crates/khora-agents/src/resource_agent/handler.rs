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

//! The contract a resource type implements to be loadable, and the context a
//! handler works in.

use super::config::RequestOptions;
use super::loader::ResourceLoader;
use super::node::RequestNode;
use async_trait::async_trait;
use khora_core::resource::{
    BoxedHandlerError, LoaderError, RequestState, Resource, ResourceHandle, ResourceId,
    ResourceRequest, ResourceType, UntypedHandle,
};
use std::any::{type_name, Any};
use std::sync::Arc;

/// Result type returned by handler steps.
pub type HandlerResult<T> = Result<T, BoxedHandlerError>;

/// Loads one type of resource in two steps.
///
/// `load` fetches the raw data (bytes, a parsed document, ...). `open` turns it
/// into the final resource. Either step may request dependencies through
/// [`LoadContext::load_dependency`]; the request only settles once they all have.
///
/// # Examples
///
/// ```ignore
/// struct TextHandler;
///
/// #[async_trait]
/// impl ResourceHandler for TextHandler {
///     type Raw = Vec<u8>;
///     type Output = String;
///
///     async fn load(&self, ctx: &LoadContext) -> HandlerResult<Vec<u8>> {
///         Ok(std::fs::read(ctx.identifier().as_str())?)
///     }
///
///     async fn open(&self, raw: Vec<u8>, _ctx: &LoadContext) -> HandlerResult<String> {
///         Ok(String::from_utf8(raw)?)
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceHandler: Send + Sync + 'static {
    /// What `load` produces.
    type Raw: Send + 'static;
    /// The opened resource.
    type Output: Resource;

    /// Fetches the raw data for the request described by `ctx`.
    async fn load(&self, ctx: &LoadContext) -> HandlerResult<Self::Raw>;

    /// Builds the resource from the raw data.
    async fn open(&self, raw: Self::Raw, ctx: &LoadContext) -> HandlerResult<Self::Output>;

    /// Produces the value handed to a caller that shares an existing resource,
    /// when the loader is configured to clone shared resources.
    ///
    /// The default shares the resource itself.
    fn clone_resource(
        &self,
        resource: &ResourceHandle<Self::Output>,
        _request: &ResourceRequest,
    ) -> ResourceHandle<Self::Output> {
        resource.clone()
    }
}

/// What a handler sees of the request it is servicing.
///
/// Clones refer to the same request. A clone kept past the end of `open` can
/// still request dependencies, but the request no longer waits for them.
#[derive(Clone)]
pub struct LoadContext {
    loader: ResourceLoader,
    node: Arc<RequestNode>,
    options: RequestOptions,
}

impl LoadContext {
    pub(crate) fn new(loader: ResourceLoader, node: Arc<RequestNode>, options: RequestOptions) -> Self {
        Self {
            loader,
            node,
            options,
        }
    }

    /// The request as it was made.
    pub fn request(&self) -> &ResourceRequest {
        self.node.request()
    }

    /// The identifier as supplied by the caller.
    pub fn identifier(&self) -> &ResourceId {
        &self.node.request().identifier
    }

    /// The identifier the resource will be cached under.
    pub fn canonical(&self) -> &ResourceId {
        self.node.canonical()
    }

    /// The type tag that selected this handler.
    pub fn resource_type(&self) -> &ResourceType {
        &self.node.request().resource_type
    }

    /// The payload attached with [`ResourceRequest::with_data`], if it is a `D`.
    pub fn data<D: Any + Send + Sync>(&self) -> Option<&D> {
        self.node.request().data::<D>()
    }

    /// Options of the call that led to this request.
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// The current state of the request.
    pub fn state(&self) -> RequestState {
        self.node.state()
    }

    /// The request's priority; lower values load first.
    pub fn priority(&self) -> u32 {
        self.node.priority()
    }

    /// The loader servicing the request, for cache lookups and the like.
    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    /// Requests a dependency of the current resource.
    ///
    /// The dependency is registered before this returns: the current request
    /// will not settle until the dependency (and its own dependencies) have.
    /// Awaiting the returned [`PendingResource`] is optional, and must not be
    /// done for a dependency that could itself depend on the current request.
    /// Await dependencies from `open`: `load` holds one of the loader's
    /// loading slots, and waiting there can starve the dependency of one.
    /// The dependency is loaded with the current request's priority.
    pub fn load_dependency(&self, request: ResourceRequest) -> PendingResource {
        self.loader.enqueue_dependency(request, &self.options, &self.node)
    }
}

/// A request that may still be in progress.
#[derive(Clone)]
pub struct PendingResource {
    node: Arc<RequestNode>,
}

impl PendingResource {
    pub(crate) fn new(node: Arc<RequestNode>) -> Self {
        Self { node }
    }

    /// The identifier the resource is cached under.
    pub fn canonical(&self) -> &ResourceId {
        self.node.canonical()
    }

    /// The current state of the request.
    pub fn state(&self) -> RequestState {
        self.node.state()
    }

    /// Waits for the request and its dependency closure to settle.
    pub async fn wait(self) -> Result<UntypedHandle, LoaderError> {
        self.node.settled().await
    }

    /// [`PendingResource::wait`], then downcasts the resource to `T`.
    pub async fn wait_typed<T: Resource>(self) -> Result<ResourceHandle<T>, LoaderError> {
        let identifier = self.node.canonical().clone();
        let resource = self.wait().await?;
        resource.typed::<T>().ok_or_else(|| LoaderError::TypeMismatch {
            identifier,
            expected: type_name::<T>(),
            actual: resource.type_name(),
        })
    }
}

impl std::fmt::Debug for PendingResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResource")
            .field("canonical", self.node.canonical())
            .field("state", &self.node.state())
            .finish()
    }
}
