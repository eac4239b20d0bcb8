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

//! Settlement of a request's transitive dependency closure.

use super::node::RequestNode;
use khora_core::resource::LoaderError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Waits until every request reachable from `root` has settled, or until the
/// first failure in that closure.
///
/// `root` must already be opened, so its children are final. The walk runs in
/// two passes:
/// 1. Breadth-first over the graph, waiting for each node to be *opened* before
///    reading its children. This discovers the whole closure and reports any
///    failure in it.
/// 2. Waits for full settlement of every discovered node that cannot reach
///    `root`. Nodes on a cycle through `root` are only ever opened from here:
///    waiting for them to settle would wait on `root` itself.
///
/// The first error found is returned as a [`LoaderError::ChildFailure`] of
/// `root`, wrapping the failure where it originated.
pub(crate) async fn settle_closure(root: &Arc<RequestNode>) -> Result<(), LoaderError> {
    let root_key = root.key();
    let mut edges: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut seen = HashSet::from([root_key]);
    let mut frontier = VecDeque::new();
    let mut discovered = Vec::new();

    let children = root.children();
    edges.insert(root_key, children.iter().map(RequestNode::key).collect());
    for child in children {
        if seen.insert(child.key()) {
            frontier.push_back(child);
        }
    }

    while let Some(node) = frontier.pop_front() {
        if let Err(error) = node.opened().await {
            return Err(LoaderError::child_of(root.canonical().clone(), error));
        }
        let children = node.children();
        edges.insert(node.key(), children.iter().map(RequestNode::key).collect());
        for child in children {
            if seen.insert(child.key()) {
                frontier.push_back(child);
            }
        }
        discovered.push(node);
    }

    let on_cycle = reaching(&edges, root_key);
    for node in &discovered {
        if on_cycle.contains(&node.key()) {
            continue;
        }
        if let Err(error) = node.settled().await {
            return Err(LoaderError::child_of(root.canonical().clone(), error));
        }
    }
    Ok(())
}

/// Every node from which `target` is reachable.
fn reaching(edges: &HashMap<usize, Vec<usize>>, target: usize) -> HashSet<usize> {
    let mut reverse: HashMap<usize, Vec<usize>> = HashMap::new();
    for (&from, targets) in edges {
        for &to in targets {
            reverse.entry(to).or_default().push(from);
        }
    }

    let mut found = HashSet::new();
    let mut stack = vec![target];
    while let Some(key) = stack.pop() {
        for &from in reverse.get(&key).into_iter().flatten() {
            if found.insert(from) {
                stack.push(from);
            }
        }
    }
    found
}
