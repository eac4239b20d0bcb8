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

use super::{ResourceId, ResourceType};
use std::{any::Any, fmt, sync::Arc};

/// Priority of a request that did not ask for one. Lower values load first.
pub const DEFAULT_PRIORITY: u32 = 1;

/// A caller's request for one resource: what to load and which handler loads it.
#[derive(Clone)]
pub struct ResourceRequest {
    /// The identifier as supplied by the caller.
    pub identifier: ResourceId,
    /// The type tag selecting the handler.
    pub resource_type: ResourceType,
    priority: u32,
    data: Option<Arc<dyn Any + Send + Sync>>,
}

impl ResourceRequest {
    /// Creates a request for `identifier`, handled by the handler registered for `resource_type`.
    pub fn new(identifier: impl Into<ResourceId>, resource_type: impl Into<ResourceType>) -> Self {
        Self {
            identifier: identifier.into(),
            resource_type: resource_type.into(),
            priority: DEFAULT_PRIORITY,
            data: None,
        }
    }

    /// Sets the loading priority. Lower values load first; requests of equal
    /// priority load in the order they were made.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// The loading priority, [`DEFAULT_PRIORITY`] unless set.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Attaches a caller-provided payload the handler can read while loading
    /// (e.g. overrides to apply to the opened resource).
    pub fn with_data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data = Some(Arc::new(data));
        self
    }

    /// Returns the attached payload if it is a `D`.
    pub fn data<D: Any + Send + Sync>(&self) -> Option<&D> {
        self.data.as_deref().and_then(|data| data.downcast_ref::<D>())
    }
}

impl fmt::Debug for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRequest")
            .field("identifier", &self.identifier)
            .field("resource_type", &self.resource_type)
            .field("priority", &self.priority)
            .field("has_data", &self.data.is_some())
            .finish()
    }
}

/// Lifecycle of a request. States only move forward, in declaration order.
///
/// `Succeeded` and `Failed` are the settled states: a request reaches one of them
/// only once its whole transitive set of children has settled too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestState {
    /// Created, waiting for a loading slot.
    Pending,
    /// The handler's `load` is running.
    Loading,
    /// The handler's `open` is running.
    Opening,
    /// The resource is opened and cached; children are being waited on.
    AwaitingChildren,
    /// Settled successfully.
    Succeeded,
    /// Settled with an error.
    Failed,
}

impl RequestState {
    /// Returns `true` for `Succeeded` and `Failed`.
    pub fn is_settled(self) -> bool {
        matches!(self, RequestState::Succeeded | RequestState::Failed)
    }

    /// Children may only be attached while the handler is still running.
    pub fn accepts_children(self) -> bool {
        matches!(self, RequestState::Loading | RequestState::Opening)
    }

    /// Returns `true` once the request's own `open` step is over, whatever the outcome.
    pub fn is_opened(self) -> bool {
        self >= RequestState::AwaitingChildren
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Pending => "pending",
            RequestState::Loading => "loading",
            RequestState::Opening => "opening",
            RequestState::AwaitingChildren => "awaiting children",
            RequestState::Succeeded => "succeeded",
            RequestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_ordered_by_lifecycle() {
        assert!(RequestState::Pending < RequestState::Loading);
        assert!(RequestState::Opening < RequestState::AwaitingChildren);
        assert!(RequestState::AwaitingChildren < RequestState::Succeeded);
        assert!(RequestState::Failed.is_opened());
        assert!(!RequestState::Opening.is_opened());
    }

    #[test]
    fn only_running_requests_accept_children() {
        assert!(RequestState::Loading.accepts_children());
        assert!(RequestState::Opening.accepts_children());
        assert!(!RequestState::Pending.accepts_children());
        assert!(!RequestState::AwaitingChildren.accepts_children());
        assert!(!RequestState::Succeeded.accepts_children());
    }

    #[test]
    fn payload_is_typed() {
        let request = ResourceRequest::new("models/crate.json", "model").with_data(42u32);
        assert_eq!(request.data::<u32>(), Some(&42));
        assert_eq!(request.data::<String>(), None);
        assert_eq!(ResourceRequest::new("a", "b").data::<u32>(), None);
    }

    #[test]
    fn priority_defaults_to_one() {
        assert_eq!(ResourceRequest::new("a", "b").priority(), DEFAULT_PRIORITY);
        assert_eq!(ResourceRequest::new("a", "b").with_priority(0).priority(), 0);
    }
}
