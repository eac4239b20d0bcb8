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

//! Handlers shared by the resource loader tests.

#![allow(dead_code)]

use async_trait::async_trait;
use khora_agents::resource_agent::{HandlerResult, LoadContext, ResourceHandler};
use khora_core::resource::{ResourceHandle, ResourceRequest};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Call counters shared between a test and its handler.
#[derive(Debug, Default, Clone)]
pub struct Calls {
    loads: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
    loaded: Arc<Mutex<Vec<(String, u32)>>>,
}

impl Calls {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Identifiers in the order their `load` started, with their priority.
    pub fn load_order(&self) -> Vec<(String, u32)> {
        self.loaded.lock().unwrap().clone()
    }

    fn record_load(&self, ctx: &LoadContext) {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded
            .lock()
            .unwrap()
            .push((ctx.identifier().to_string(), ctx.priority()));
    }
}

/// Opens `id` to `"{id}-opened"`.
///
/// Identifiers containing `delay_` take a while to load, identifiers in the
/// failing set fail to load, and with a depth above zero every resource
/// requests `"{id}_child"` until the chain is `depth` children deep.
#[derive(Default)]
pub struct TestHandler {
    pub calls: Calls,
    depth: usize,
    delay: Duration,
    failing: HashSet<String>,
    clone_suffix: Option<&'static str>,
}

impl TestHandler {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(20),
            ..Self::default()
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn failing<'a>(mut self, identifiers: impl IntoIterator<Item = &'a str>) -> Self {
        self.failing
            .extend(identifiers.into_iter().map(str::to_string));
        self
    }

    pub fn cloning_with(mut self, suffix: &'static str) -> Self {
        self.clone_suffix = Some(suffix);
        self
    }
}

#[async_trait]
impl ResourceHandler for TestHandler {
    type Raw = String;
    type Output = String;

    async fn load(&self, ctx: &LoadContext) -> HandlerResult<String> {
        self.calls.record_load(ctx);
        let identifier = ctx.identifier().as_str();
        if identifier.contains("delay_") {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.contains(identifier) {
            return Err("An error occured".into());
        }
        Ok(identifier.to_string())
    }

    async fn open(&self, raw: String, ctx: &LoadContext) -> HandlerResult<String> {
        self.calls.opens.fetch_add(1, Ordering::SeqCst);
        if raw.matches("_child").count() < self.depth {
            ctx.load_dependency(ResourceRequest::new(
                format!("{raw}_child"),
                ctx.resource_type().clone(),
            ));
        }
        Ok(format!("{raw}-opened"))
    }

    fn clone_resource(
        &self,
        resource: &ResourceHandle<String>,
        _request: &ResourceRequest,
    ) -> ResourceHandle<String> {
        match self.clone_suffix {
            Some(suffix) => ResourceHandle::new(format!("{}{suffix}", resource.as_str())),
            None => resource.clone(),
        }
    }
}

/// Each resource requests the resources listed for it in `edges`. Children
/// prefixed with `missing:` are requested with a type nobody handles.
pub struct GraphHandler {
    pub calls: Calls,
    edges: HashMap<&'static str, Vec<&'static str>>,
}

impl GraphHandler {
    pub fn new(edges: impl IntoIterator<Item = (&'static str, Vec<&'static str>)>) -> Self {
        Self {
            calls: Calls::default(),
            edges: edges.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ResourceHandler for GraphHandler {
    type Raw = ();
    type Output = String;

    async fn load(&self, ctx: &LoadContext) -> HandlerResult<()> {
        self.calls.record_load(ctx);
        for child in self.edges.get(ctx.identifier().as_str()).into_iter().flatten() {
            let resource_type = match child.strip_prefix("missing:") {
                Some(_) => "missing".into(),
                None => ctx.resource_type().clone(),
            };
            ctx.load_dependency(ResourceRequest::new(*child, resource_type));
        }
        Ok(())
    }

    async fn open(&self, _raw: (), ctx: &LoadContext) -> HandlerResult<String> {
        self.calls.opens.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}-opened", ctx.identifier()))
    }
}

/// Reads the text of a string resource.
pub fn text(resource: &khora_core::resource::UntypedHandle) -> &str {
    resource
        .downcast_ref::<String>()
        .map(String::as_str)
        .unwrap_or("<not a string>")
}
