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

//! A request in the dependency graph.

use khora_core::resource::{LoaderError, RequestState, ResourceId, ResourceRequest, UntypedHandle};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// What a node currently holds, published to everyone waiting on it.
#[derive(Clone)]
enum Status {
    Pending,
    Loading,
    Opening,
    AwaitingChildren,
    Succeeded(UntypedHandle),
    Failed(LoaderError),
}

impl Status {
    fn state(&self) -> RequestState {
        match self {
            Status::Pending => RequestState::Pending,
            Status::Loading => RequestState::Loading,
            Status::Opening => RequestState::Opening,
            Status::AwaitingChildren => RequestState::AwaitingChildren,
            Status::Succeeded(_) => RequestState::Succeeded,
            Status::Failed(_) => RequestState::Failed,
        }
    }
}

/// One request being serviced (or already settled), with the children its
/// handler discovered.
///
/// Children can only be attached while the handler runs (`Loading`/`Opening`);
/// the transition to `AwaitingChildren` happens under the same lock, so the set
/// of children is frozen from then on.
pub(crate) struct RequestNode {
    request: ResourceRequest,
    canonical: ResourceId,
    /// Order of creation, breaking ties between equal priorities.
    sequence: u64,
    priority: AtomicU32,
    children: Mutex<Vec<Arc<RequestNode>>>,
    status: watch::Sender<Status>,
}

impl RequestNode {
    pub(crate) fn new(request: ResourceRequest, canonical: ResourceId, sequence: u64) -> Arc<Self> {
        Self::with_status(request, canonical, sequence, Status::Pending)
    }

    /// A node that is settled from the start, standing for a cache hit.
    pub(crate) fn cached(
        request: ResourceRequest,
        canonical: ResourceId,
        resource: UntypedHandle,
    ) -> Arc<Self> {
        Self::with_status(request, canonical, 0, Status::Succeeded(resource))
    }

    /// A node that failed before it could be serviced.
    pub(crate) fn rejected(
        request: ResourceRequest,
        canonical: ResourceId,
        error: LoaderError,
    ) -> Arc<Self> {
        Self::with_status(request, canonical, 0, Status::Failed(error))
    }

    fn with_status(
        request: ResourceRequest,
        canonical: ResourceId,
        sequence: u64,
        status: Status,
    ) -> Arc<Self> {
        let (status, _) = watch::channel(status);
        Arc::new(Self {
            priority: AtomicU32::new(request.priority()),
            request,
            canonical,
            sequence,
            children: Mutex::new(Vec::new()),
            status,
        })
    }

    pub(crate) fn request(&self) -> &ResourceRequest {
        &self.request
    }

    pub(crate) fn canonical(&self) -> &ResourceId {
        &self.canonical
    }

    pub(crate) fn state(&self) -> RequestState {
        self.status.borrow().state()
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Current priority; lower loads first.
    pub(crate) fn priority(&self) -> u32 {
        self.priority.load(Ordering::SeqCst)
    }

    /// Raises the priority to `priority` if that is more urgent.
    pub(crate) fn raise_priority(&self, priority: u32) {
        self.priority.fetch_min(priority, Ordering::SeqCst);
    }

    /// Identity of the node, for visited sets.
    pub(crate) fn key(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }

    pub(crate) fn begin_loading(&self) {
        self.advance(Status::Loading);
    }

    pub(crate) fn begin_opening(&self) {
        self.advance(Status::Opening);
    }

    /// Marks the handler as done; no more children are accepted.
    pub(crate) fn finish_open(&self) {
        self.advance(Status::AwaitingChildren);
    }

    pub(crate) fn succeed(&self, resource: UntypedHandle) -> bool {
        self.advance(Status::Succeeded(resource))
    }

    pub(crate) fn fail(&self, error: LoaderError) -> bool {
        self.advance(Status::Failed(error))
    }

    /// Moves forward to `next`. Settled nodes never change again.
    fn advance(&self, next: Status) -> bool {
        let _children = self.lock_children();
        self.status.send_if_modified(|current| {
            let from = current.state();
            if from.is_settled() || next.state() <= from {
                return false;
            }
            *current = next;
            true
        })
    }

    /// Attaches `child` if this node still accepts children.
    pub(crate) fn attach_child(&self, child: Arc<RequestNode>) -> bool {
        let mut children = self.lock_children();
        if !self.state().accepts_children() {
            return false;
        }
        children.push(child);
        true
    }

    pub(crate) fn children(&self) -> Vec<Arc<RequestNode>> {
        self.lock_children().clone()
    }

    /// Resolves once this node's own `open` step is over.
    ///
    /// Does not wait for children: that is what [`RequestNode::settled`] is for.
    pub(crate) async fn opened(&self) -> Result<(), LoaderError> {
        self.wait_for(|status| match status {
            Status::Pending | Status::Loading | Status::Opening => None,
            Status::AwaitingChildren | Status::Succeeded(_) => Some(Ok(())),
            Status::Failed(error) => Some(Err(error.clone())),
        })
        .await
    }

    /// Resolves once the node and its whole dependency closure have settled.
    pub(crate) async fn settled(&self) -> Result<UntypedHandle, LoaderError> {
        self.wait_for(|status| match status {
            Status::Succeeded(resource) => Some(Ok(resource.clone())),
            Status::Failed(error) => Some(Err(error.clone())),
            _ => None,
        })
        .await
    }

    async fn wait_for<R>(&self, pick: impl Fn(&Status) -> Option<R>) -> R {
        let mut receiver = self.status.subscribe();
        loop {
            if let Some(found) = pick(&receiver.borrow_and_update()) {
                return found;
            }
            // `self` owns the sender, so the channel stays open while we wait.
            let _ = receiver.changed().await;
        }
    }

    fn lock_children(&self) -> MutexGuard<'_, Vec<Arc<RequestNode>>> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
