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

//! Provides the foundational types for Khora's resource loader.
//!
//! This module is the "common language" shared by the loader agent, the
//! bookkeeping tables in `khora-data`, and every resource handler. It holds
//! no orchestration logic.
//!
//! The key components are:
//! - The [`Resource`] trait: what a handler may produce.
//! - Identifiers: [`ResourceId`], [`ResourceType`] and [`ContentHash`].
//! - Handles: [`ResourceHandle`] and its type-erased form [`UntypedHandle`].
//! - The request data model: [`ResourceRequest`] and [`RequestState`].
//! - The error taxonomy: [`LoaderError`].

mod error;
mod handle;
mod id;
mod request;

pub use error::*;
pub use handle::*;
pub use id::*;
pub use request::*;

/// Marker for values the loader can cache and hand out.
///
/// The supertraits are what background loading needs:
/// - `Send` + `Sync`: the resource is shared between tasks and threads.
/// - `'static`: the resource can live in the cache for the loader's lifetime.
///
/// Every type meeting those bounds is a resource, so handlers can produce plain
/// engine types (or even a `String`) without any extra impl.
///
/// # Examples
///
/// ```
/// use khora_core::resource::{Resource, UntypedHandle};
///
/// struct Texture {
///     width: u32,
/// }
///
/// fn assert_resource<T: Resource>() {}
/// assert_resource::<Texture>();
///
/// let handle = UntypedHandle::new(Texture { width: 4 });
/// assert_eq!(handle.typed::<Texture>().map(|t| t.width), Some(4));
/// ```
pub trait Resource: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Resource for T {}
