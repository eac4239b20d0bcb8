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

//! The resource agent loads resources and their dependencies.
//!
//! Each resource type is served by a [`ResourceHandler`] registered on a
//! [`ResourceLoader`]. A handler may request further resources while it runs;
//! the loader tracks those requests as a graph and only settles a request once
//! everything reachable from it has settled. Requests for the same canonical
//! identifier are serviced once and shared, and results are cached.

mod config;
mod events;
mod handler;
mod loader;
mod node;
mod progress;
mod registry;
mod settle;
mod slots;

pub use self::config::{LoaderConfig, RequestOptions};
pub use self::events::{LoaderEvent, LoaderEvents};
pub use self::handler::{HandlerResult, LoadContext, PendingResource, ResourceHandler};
pub use self::loader::ResourceLoader;
pub use self::progress::LoadProgress;
