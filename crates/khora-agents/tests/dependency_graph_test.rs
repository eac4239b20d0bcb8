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

mod common;

use anyhow::Result;
use common::{text, GraphHandler, TestHandler};
use khora_agents::resource_agent::ResourceLoader;
use khora_core::resource::{LoaderError, ResourceRequest};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn request(identifier: &str) -> ResourceRequest {
    ResourceRequest::new(identifier, "test")
}

#[tokio::test]
async fn test_parent_waits_for_a_slow_child() -> Result<()> {
    let loader = ResourceLoader::new();
    loader.register_handler("test", TestHandler::new().with_depth(1));

    let parent = loader.request_one(request("delay_A")).await?;

    assert_eq!(text(&parent), "delay_A-opened");
    let child = loader
        .get_from_cache("delay_A_child")
        .expect("the child settles before its parent");
    assert_eq!(text(&child), "delay_A_child-opened");
    Ok(())
}

#[tokio::test]
async fn test_deep_chain_settles_every_level() -> Result<()> {
    const DEPTH: usize = 8;
    let handler = TestHandler::new().with_depth(DEPTH);
    let calls = handler.calls.clone();
    let loader = ResourceLoader::new();
    loader.register_handler("test", handler);

    loader.request_one(request("delay_root")).await?;

    let mut identifier = String::from("delay_root");
    for _ in 0..=DEPTH {
        let cached = loader
            .get_from_cache(identifier.as_str())
            .unwrap_or_else(|| panic!("'{identifier}' should be cached"));
        assert_eq!(text(&cached), format!("{identifier}-opened"));
        identifier.push_str("_child");
    }
    assert!(loader.get_from_cache(identifier.as_str()).is_none());
    assert_eq!(calls.loads(), DEPTH + 1);
    assert_eq!(loader.progress().loaded, (DEPTH + 1) as u64);
    Ok(())
}

#[tokio::test]
async fn test_child_failure_rejects_the_parent() {
    let loader = ResourceLoader::new();
    loader.register_handler(
        "test",
        TestHandler::new()
            .with_depth(2)
            .failing(["delay_1_child_child"]),
    );
    let errors = Arc::new(Mutex::new(Vec::new()));
    {
        let errors = Arc::clone(&errors);
        loader.events().on_error(move |request, _| {
            errors.lock().unwrap().push(request.identifier.to_string());
        });
    }

    let result = loader.request_one(request("delay_1")).await;

    match result {
        Err(LoaderError::ChildFailure {
            identifier,
            child,
            source,
        }) => {
            assert_eq!(identifier.as_str(), "delay_1");
            assert_eq!(child.as_str(), "delay_1_child_child");
            assert!(matches!(*source, LoaderError::LoadFailure { .. }));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    // Only the request where the failure happened reports it.
    assert_eq!(*errors.lock().unwrap(), vec!["delay_1_child_child".to_string()]);
    // The parent opened fine, so it stays cached.
    assert!(loader.get_from_cache("delay_1").is_some());
}

#[tokio::test]
async fn test_failure_reaches_every_parent_sharing_the_child() {
    let loader = ResourceLoader::new();
    loader.register_handler(
        "graph",
        GraphHandler::new([
            ("A", vec!["shared"]),
            ("B", vec!["shared"]),
            ("shared", vec!["missing:broken"]),
        ]),
    );
    let errors = Arc::new(Mutex::new(Vec::new()));
    {
        let errors = Arc::clone(&errors);
        loader.events().on_error(move |request, _| {
            errors.lock().unwrap().push(request.identifier.to_string());
        });
    }

    let result = loader
        .request([
            ResourceRequest::new("A", "graph"),
            ResourceRequest::new("B", "graph"),
        ])
        .await;

    let error = result.expect_err("both parents depend on a failure");
    let parents: Vec<&str> = error
        .errors()
        .iter()
        .map(|failure| failure.identifier().as_str())
        .collect();
    assert_eq!(parents, vec!["A", "B"]);
    for failure in error.errors() {
        assert!(matches!(
            failure.originating(),
            LoaderError::HandlerMissing { identifier, .. } if identifier.as_str() == "missing:broken"
        ));
    }
    assert_eq!(*errors.lock().unwrap(), vec!["missing:broken".to_string()]);
}

#[tokio::test]
async fn test_diamond_loads_the_shared_child_once() -> Result<()> {
    let handler = GraphHandler::new([
        ("top", vec!["left", "right"]),
        ("left", vec!["bottom"]),
        ("right", vec!["bottom"]),
    ]);
    let calls = handler.calls.clone();
    let loader = ResourceLoader::new();
    loader.register_handler("graph", handler);

    let top = loader
        .request_one(ResourceRequest::new("top", "graph"))
        .await?;

    assert_eq!(text(&top), "top-opened");
    assert_eq!(calls.loads(), 4);
    for identifier in ["left", "right", "bottom"] {
        assert!(loader.get_from_cache(identifier).is_some());
    }
    Ok(())
}

#[tokio::test]
async fn test_cycles_settle_without_deadlock() -> Result<()> {
    let handler = GraphHandler::new([
        ("A", vec!["B"]),
        ("B", vec!["C", "A"]),
        ("C", vec!["B"]),
        ("self", vec!["self"]),
    ]);
    let calls = handler.calls.clone();
    let loader = ResourceLoader::new();
    loader.register_handler("graph", handler);

    let resources = tokio::time::timeout(
        Duration::from_secs(5),
        loader.request([
            ResourceRequest::new("A", "graph"),
            ResourceRequest::new("self", "graph"),
        ]),
    )
    .await??;

    assert_eq!(text(&resources[0]), "A-opened");
    assert_eq!(text(&resources[1]), "self-opened");
    assert_eq!(calls.loads(), 4);
    assert_eq!(loader.in_flight_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_dependency_after_open_is_not_awaited() -> Result<()> {
    use async_trait::async_trait;
    use khora_agents::resource_agent::{HandlerResult, LoadContext, ResourceHandler};
    use tokio::sync::oneshot;

    struct Late {
        finished: Mutex<Option<oneshot::Sender<bool>>>,
    }

    #[async_trait]
    impl ResourceHandler for Late {
        type Raw = ();
        type Output = String;

        async fn load(&self, _ctx: &LoadContext) -> HandlerResult<()> {
            Ok(())
        }

        async fn open(&self, _raw: (), ctx: &LoadContext) -> HandlerResult<String> {
            if ctx.identifier().as_str() == "parent" {
                let ctx = ctx.clone();
                let finished = self.finished.lock().unwrap().take();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    let pending = ctx.load_dependency(ResourceRequest::new("late", "late"));
                    let loaded = pending.wait().await.is_ok();
                    if let Some(finished) = finished {
                        let _ = finished.send(loaded);
                    }
                });
            }
            Ok(format!("{}-opened", ctx.identifier()))
        }
    }

    let (sender, receiver) = oneshot::channel();
    let loader = ResourceLoader::new();
    loader.register_handler(
        "late",
        Late {
            finished: Mutex::new(Some(sender)),
        },
    );

    let parent = loader
        .request_one(ResourceRequest::new("parent", "late"))
        .await?;
    assert_eq!(text(&parent), "parent-opened");
    assert!(loader.get_from_cache("late").is_none());

    assert!(receiver.await?);
    assert!(loader.get_from_cache("late").is_some());
    Ok(())
}

#[tokio::test]
async fn test_children_inherit_request_options() -> Result<()> {
    use async_trait::async_trait;
    use khora_agents::resource_agent::{
        HandlerResult, LoadContext, RequestOptions, ResourceHandler,
    };

    struct Material;

    #[async_trait]
    impl ResourceHandler for Material {
        type Raw = ();
        type Output = String;

        async fn load(&self, ctx: &LoadContext) -> HandlerResult<()> {
            if ctx.identifier().as_str() == "material" {
                ctx.load_dependency(ResourceRequest::new("texture", "material"));
            }
            Ok(())
        }

        async fn open(&self, _raw: (), ctx: &LoadContext) -> HandlerResult<String> {
            let prefix: String = ctx.options().get("prefix").unwrap_or_default();
            Ok(format!("{prefix}{}", ctx.identifier()))
        }
    }

    let loader = ResourceLoader::new();
    loader.register_handler("material", Material);

    let options = RequestOptions::new().with("prefix", "hd/");
    loader
        .request_with_options([ResourceRequest::new("material", "material")], &options)
        .await?;

    let texture = loader.get_from_cache("texture").expect("child cached");
    assert_eq!(text(&texture), "hd/texture");
    Ok(())
}

#[tokio::test]
async fn test_open_can_await_a_dependency_with_a_single_slot() -> Result<()> {
    use async_trait::async_trait;
    use khora_agents::resource_agent::{
        HandlerResult, LoadContext, LoaderConfig, ResourceHandler,
    };

    struct Model;

    #[async_trait]
    impl ResourceHandler for Model {
        type Raw = ();
        type Output = String;

        async fn load(&self, _ctx: &LoadContext) -> HandlerResult<()> {
            Ok(())
        }

        async fn open(&self, _raw: (), ctx: &LoadContext) -> HandlerResult<String> {
            if ctx.identifier().as_str() != "model" {
                return Ok(ctx.identifier().to_string());
            }
            let mesh = ctx
                .load_dependency(ResourceRequest::new("mesh", "model"))
                .wait()
                .await?;
            Ok(format!("model with {}", text(&mesh)))
        }
    }

    let loader = ResourceLoader::with_config(LoaderConfig {
        max_concurrent_requests: 1,
        ..LoaderConfig::default()
    });
    loader.register_handler("model", Model);

    let model = tokio::time::timeout(
        Duration::from_secs(5),
        loader.request_one(ResourceRequest::new("model", "model")),
    )
    .await
    .expect("awaiting a dependency from open must not hold the only slot")?;

    assert_eq!(text(&model), "model with mesh");
    Ok(())
}

#[tokio::test]
async fn test_dependencies_take_the_parent_priority() -> Result<()> {
    let handler = TestHandler::new().with_depth(2);
    let calls = handler.calls.clone();
    let loader = ResourceLoader::new();
    loader.register_handler("test", handler);

    loader
        .request_one(request("model").with_priority(0))
        .await?;

    assert_eq!(
        calls.load_order(),
        vec![
            ("model".to_string(), 0),
            ("model_child".to_string(), 0),
            ("model_child_child".to_string(), 0),
        ]
    );
    Ok(())
}
