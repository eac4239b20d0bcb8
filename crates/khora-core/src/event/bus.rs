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

use std::sync::{Mutex, MutexGuard, PoisonError};

/// A generic, thread-safe broadcast channel built on per-subscriber `flume` queues.
///
/// Publishing with no subscriber is a no-op, so an idle bus never accumulates events.
/// Subscribers whose receiver was dropped are pruned on the next publish.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + 'static> {
    subscribers: Mutex<Vec<flume::Sender<T>>>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Creates a bus without subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new subscriber and returns its receiving end.
    ///
    /// The channel is unbounded: a subscriber that never drains its receiver
    /// keeps every event in memory until the receiver is dropped.
    pub fn subscribe(&self) -> flume::Receiver<T> {
        let (sender, receiver) = flume::unbounded();
        self.lock().push(sender);
        log::trace!("EventBus: new subscriber registered.");
        receiver
    }

    /// Sends `event` to every live subscriber.
    pub fn publish(&self, event: T) {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());

        let pruned = before - subscribers.len();
        if pruned > 0 {
            log::debug!("EventBus: pruned {pruned} disconnected subscriber(s).");
        }
    }

    /// The number of subscribers still registered.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<flume::Sender<T>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
