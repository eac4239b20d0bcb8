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

// Khora Engine Sandbox
// Loads a material library whose materials pull in their textures.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use khora_agents::resource_agent::{
    HandlerResult, LoadContext, LoaderConfig, RequestOptions, ResourceHandler, ResourceLoader,
};
use khora_core::resource::{ContentHash, ResourceRequest};
use serde::Deserialize;

/// Stand-in for the virtual file system: path to file contents.
#[derive(Clone, Default)]
struct MemorySource {
    files: Arc<HashMap<&'static str, &'static [u8]>>,
}

impl MemorySource {
    fn read(&self, path: &str) -> HandlerResult<Vec<u8>> {
        self.files
            .get(path)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| format!("file not found: {path}").into())
    }
}

#[derive(Debug)]
struct Texture {
    path: String,
    size: usize,
    hash: ContentHash,
}

struct TextureHandler {
    source: MemorySource,
}

#[async_trait]
impl ResourceHandler for TextureHandler {
    type Raw = Vec<u8>;
    type Output = Texture;

    async fn load(&self, ctx: &LoadContext) -> HandlerResult<Vec<u8>> {
        self.source.read(ctx.identifier().as_str())
    }

    async fn open(&self, raw: Vec<u8>, ctx: &LoadContext) -> HandlerResult<Texture> {
        Ok(Texture {
            path: ctx.identifier().to_string(),
            size: raw.len(),
            hash: ContentHash::of(&raw),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MaterialFile {
    name: String,
    #[serde(default)]
    textures: Vec<String>,
}

#[derive(Debug)]
struct Material {
    name: String,
    textures: Vec<String>,
}

struct MaterialHandler {
    source: MemorySource,
}

#[async_trait]
impl ResourceHandler for MaterialHandler {
    type Raw = MaterialFile;
    type Output = Material;

    async fn load(&self, ctx: &LoadContext) -> HandlerResult<MaterialFile> {
        let bytes = self.source.read(ctx.identifier().as_str())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn open(&self, raw: MaterialFile, ctx: &LoadContext) -> HandlerResult<Material> {
        for texture in &raw.textures {
            ctx.load_dependency(ResourceRequest::new(texture.as_str(), "texture"));
        }
        Ok(Material {
            name: raw.name,
            textures: raw.textures,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let source = MemorySource {
        files: Arc::new(HashMap::from([
            (
                "materials/brick.json",
                br#"{ "name": "brick", "textures": ["textures/brick.png", "textures/noise.png"] }"#
                    .as_slice(),
            ),
            (
                "materials/stone.json",
                br#"{ "name": "stone", "textures": ["textures/stone.png", "textures/noise.png"] }"#
                    .as_slice(),
            ),
            ("textures/brick.png", b"brick pixels".as_slice()),
            ("textures/stone.png", b"stone pixels".as_slice()),
            ("textures/noise.png", b"noise pixels".as_slice()),
        ])),
    };

    let loader = ResourceLoader::with_config(LoaderConfig::from_json(
        r#"{ "max_concurrent_requests": 4 }"#,
    )?);
    loader.register_handler(
        "texture",
        TextureHandler {
            source: source.clone(),
        },
    );
    loader.register_handler("material", MaterialHandler { source });

    // The same bytes under another name resolve to the original texture.
    let noise = ContentHash::of(b"noise pixels");
    loader.register_hash(noise.clone(), "textures/noise.png");
    loader.register_hash(noise, "textures/noise-copy.png");

    loader.events().on_progress(|progress| {
        log::info!(
            "Loading: {}/{} ({:.0}%)",
            progress.loaded,
            progress.requested,
            progress.ratio() * 100.0
        );
    });
    loader.events().on_error(|request, error| {
        log::error!("Failed to load '{}': {error}", request.identifier);
    });

    let materials = loader
        .request_with_options(
            [
                ResourceRequest::new("materials/brick.json", "material"),
                ResourceRequest::new("materials/stone.json", "material"),
            ],
            &RequestOptions::new().with("quality", "high"),
        )
        .await?;

    for material in &materials {
        if let Some(material) = material.downcast_ref::<Material>() {
            log::info!("Material '{}' uses {:?}", material.name, material.textures);
        }
    }

    let copy = loader.load::<Texture>("textures/noise-copy.png", "texture").await?;
    log::info!(
        "'textures/noise-copy.png' resolved to '{}' ({} bytes, hash {})",
        copy.path,
        copy.size,
        copy.hash
    );

    let missing = loader
        .request_one(ResourceRequest::new("materials/missing.json", "material"))
        .await;
    if let Err(error) = missing {
        log::warn!("Expected failure: {error}");
    }

    log::info!("Final progress: {:?}", loader.progress());
    Ok(())
}
