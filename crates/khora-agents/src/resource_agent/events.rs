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

//! Notifications emitted by the resource loader.

use super::progress::LoadProgress;
use khora_core::event::EventBus;
use khora_core::resource::{LoaderError, ResourceId, ResourceRequest, UntypedHandle};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Something the loader reports while servicing requests.
#[derive(Debug, Clone)]
pub enum LoaderEvent {
    /// A serviced request settled (successfully or not).
    Progress(LoadProgress),
    /// A serviced request and its dependency closure settled successfully.
    Loaded {
        /// The request as the first caller made it.
        request: ResourceRequest,
        /// Canonical identifier the resource is cached under.
        canonical: ResourceId,
        /// The shared resource.
        resource: UntypedHandle,
    },
    /// A request failed where the failure originated. Parents that fail because
    /// of it do not emit their own event.
    Error {
        /// The failing request.
        request: ResourceRequest,
        /// Why it failed.
        error: LoaderError,
    },
    /// A top-level request call settled successfully.
    Complete {
        /// The delivered resources, in request order.
        resources: Vec<UntypedHandle>,
    },
}

type Listener = Arc<dyn Fn(&LoaderEvent) + Send + Sync>;

/// Callback lists plus a channel fan-out for [`LoaderEvent`]s.
///
/// Callbacks run synchronously on the task that settled the request, after the
/// loader released its tables.
pub struct LoaderEvents {
    listeners: Mutex<Vec<Listener>>,
    bus: EventBus<LoaderEvent>,
}

impl LoaderEvents {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            bus: EventBus::new(),
        }
    }

    /// Calls `listener` for every event.
    pub fn on_event(&self, listener: impl Fn(&LoaderEvent) + Send + Sync + 'static) {
        self.lock().push(Arc::new(listener));
    }

    /// Calls `listener` with the progress after every settlement.
    pub fn on_progress(&self, listener: impl Fn(LoadProgress) + Send + Sync + 'static) {
        self.on_event(move |event| {
            if let LoaderEvent::Progress(progress) = event {
                listener(*progress);
            }
        });
    }

    /// Calls `listener` for every request that loaded.
    pub fn on_load(
        &self,
        listener: impl Fn(&ResourceRequest, &UntypedHandle) + Send + Sync + 'static,
    ) {
        self.on_event(move |event| {
            if let LoaderEvent::Loaded {
                request, resource, ..
            } = event
            {
                listener(request, resource);
            }
        });
    }

    /// Calls `listener` for every originating failure.
    pub fn on_error(&self, listener: impl Fn(&ResourceRequest, &LoaderError) + Send + Sync + 'static) {
        self.on_event(move |event| {
            if let LoaderEvent::Error { request, error } = event {
                listener(request, error);
            }
        });
    }

    /// Calls `listener` when a top-level request call completes.
    pub fn on_complete(&self, listener: impl Fn(&[UntypedHandle]) + Send + Sync + 'static) {
        self.on_event(move |event| {
            if let LoaderEvent::Complete { resources } = event {
                listener(resources);
            }
        });
    }

    /// A receiver that gets every event emitted from now on.
    pub fn subscribe(&self) -> flume::Receiver<LoaderEvent> {
        self.bus.subscribe()
    }

    /// Drops every registered callback. Channel subscribers are unaffected.
    pub fn clear_listeners(&self) {
        self.lock().clear();
    }

    pub(crate) fn emit(&self, event: LoaderEvent) {
        // Snapshot so a callback may register another one without deadlocking.
        let listeners = self.lock().clone();
        for listener in &listeners {
            listener(&event);
        }
        self.bus.publish(event);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
