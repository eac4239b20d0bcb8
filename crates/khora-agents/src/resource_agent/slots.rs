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

//! Loading slots handed out in priority order.

use super::node::RequestNode;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// A request waiting for a slot.
struct Waiter {
    node: Arc<RequestNode>,
    grant: oneshot::Sender<()>,
}

#[derive(Default)]
struct SlotState {
    running: usize,
    waiting: Vec<Waiter>,
}

/// Bounds how many requests run their `load` step at once.
///
/// When every slot is taken, requests queue up. A freed slot goes to the
/// waiting request with the lowest priority value, then the earliest created.
/// Priorities are read when the slot is handed over, so raising the priority
/// of a queued request takes effect.
pub(crate) struct LoadSlots {
    limit: usize,
    state: Mutex<SlotState>,
}

impl LoadSlots {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            state: Mutex::new(SlotState::default()),
        }
    }

    /// Waits for a slot for `node`. The slot is held until the guard drops.
    pub(crate) async fn acquire(&self, node: &Arc<RequestNode>) -> LoadSlot<'_> {
        let granted = {
            let mut state = self.lock();
            if state.running < self.limit {
                state.running += 1;
                None
            } else {
                let (grant, granted) = oneshot::channel();
                state.waiting.push(Waiter {
                    node: Arc::clone(node),
                    grant,
                });
                log::trace!(
                    "LoadSlots: '{}' queued behind {} running request(s).",
                    node.canonical(),
                    state.running
                );
                Some(granted)
            }
        };
        if let Some(granted) = granted {
            // A slot is handed over, never dropped, while `self` is alive.
            let _ = granted.await;
        }
        LoadSlot { slots: self }
    }

    /// Number of requests holding a slot.
    pub(crate) fn running(&self) -> usize {
        self.lock().running
    }

    /// Number of requests waiting for a slot.
    pub(crate) fn waiting(&self) -> usize {
        self.lock().waiting.len()
    }

    fn release(&self) {
        let mut state = self.lock();
        while let Some(index) = next_waiter(&state.waiting) {
            let waiter = state.waiting.swap_remove(index);
            if waiter.grant.send(()).is_ok() {
                // The slot moves to the waiter; `running` is unchanged.
                return;
            }
        }
        state.running = state.running.saturating_sub(1);
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Index of the most urgent waiter.
fn next_waiter(waiting: &[Waiter]) -> Option<usize> {
    waiting
        .iter()
        .enumerate()
        .min_by_key(|(_, waiter)| (waiter.node.priority(), waiter.node.sequence()))
        .map(|(index, _)| index)
}

/// A held loading slot, released on drop.
pub(crate) struct LoadSlot<'a> {
    slots: &'a LoadSlots,
}

impl Drop for LoadSlot<'_> {
    fn drop(&mut self) {
        self.slots.release();
    }
}
