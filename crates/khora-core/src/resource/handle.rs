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

use super::Resource;
use std::{any::Any, fmt, ops::Deref, sync::Arc};

/// A thread-safe, reference-counted handle to a loaded resource.
///
/// Cloning a handle is cheap, as it only increments the reference count
/// and does not duplicate the underlying resource. A handler that wants
/// per-consumer copies does so explicitly in `clone_resource`.
pub struct ResourceHandle<T: Resource>(Arc<T>);

impl<T: Resource> ResourceHandle<T> {
    /// Creates a new `ResourceHandle` that takes ownership of the resource.
    pub fn new(resource: T) -> Self {
        Self(Arc::new(resource))
    }

    /// Returns `true` when both handles point at the same instance.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<T: Resource> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Resource> Deref for ResourceHandle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Resource + fmt::Debug> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceHandle").field(&*self.0).finish()
    }
}

/// A type-erased handle, as stored in the cache and returned by batch requests.
///
/// Use [`UntypedHandle::typed`] to recover a [`ResourceHandle<T>`].
#[derive(Clone)]
pub struct UntypedHandle {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl UntypedHandle {
    /// Wraps a freshly produced resource.
    pub fn new<T: Resource>(resource: T) -> Self {
        Self::from(ResourceHandle::new(resource))
    }

    /// Returns a typed handle sharing the same instance, or `None` when the
    /// resource is not a `T`.
    pub fn typed<T: Resource>(&self) -> Option<ResourceHandle<T>> {
        self.inner.clone().downcast::<T>().ok().map(ResourceHandle)
    }

    /// Borrows the resource as a `T`, if it is one.
    pub fn downcast_ref<T: Resource>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns `true` when the resource is a `T`.
    pub fn is<T: Resource>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// The Rust type name of the stored resource, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` when both handles point at the same instance.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&a.inner), Arc::as_ptr(&b.inner))
    }
}

impl<T: Resource> From<ResourceHandle<T>> for UntypedHandle {
    fn from(handle: ResourceHandle<T>) -> Self {
        Self {
            inner: handle.0,
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl fmt::Debug for UntypedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UntypedHandle")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
