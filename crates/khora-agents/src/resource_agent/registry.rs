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

//! A registry of resource handlers, keyed by resource type.

use super::handler::{HandlerResult, LoadContext, ResourceHandler};
use async_trait::async_trait;
use khora_core::resource::{ResourceRequest, ResourceType, UntypedHandle};
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;

/// Internal trait for driving any handler without knowing its types.
#[async_trait]
pub(crate) trait ErasedHandler: Send + Sync {
    async fn load(&self, ctx: &LoadContext) -> HandlerResult<Box<dyn Any + Send>>;

    async fn open(&self, raw: Box<dyn Any + Send>, ctx: &LoadContext)
        -> HandlerResult<UntypedHandle>;

    fn clone_resource(&self, resource: &UntypedHandle, request: &ResourceRequest) -> UntypedHandle;
}

/// Adapts a typed `ResourceHandler` to `ErasedHandler`.
struct HandlerWrapper<H>(H);

#[async_trait]
impl<H: ResourceHandler> ErasedHandler for HandlerWrapper<H> {
    async fn load(&self, ctx: &LoadContext) -> HandlerResult<Box<dyn Any + Send>> {
        let raw: Box<dyn Any + Send> = Box::new(self.0.load(ctx).await?);
        Ok(raw)
    }

    async fn open(
        &self,
        raw: Box<dyn Any + Send>,
        ctx: &LoadContext,
    ) -> HandlerResult<UntypedHandle> {
        let raw = raw.downcast::<H::Raw>().map_err(|_| {
            format!(
                "handler expected raw data of type {}",
                type_name::<H::Raw>()
            )
        })?;
        let resource = self.0.open(*raw, ctx).await?;
        Ok(UntypedHandle::new(resource))
    }

    fn clone_resource(&self, resource: &UntypedHandle, request: &ResourceRequest) -> UntypedHandle {
        match resource.typed::<H::Output>() {
            Some(typed) => self.0.clone_resource(&typed, request).into(),
            None => resource.clone(),
        }
    }
}

/// The handlers known to a loader.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: HashMap<ResourceType, Arc<dyn ErasedHandler>>,
}

impl HandlerRegistry {
    /// Registers `handler` for `resource_type`. Returns `true` if it replaced one.
    pub(crate) fn register<H: ResourceHandler>(
        &mut self,
        resource_type: ResourceType,
        handler: H,
    ) -> bool {
        self.handlers
            .insert(resource_type, Arc::new(HandlerWrapper(handler)))
            .is_some()
    }

    pub(crate) fn unregister(&mut self, resource_type: &str) -> bool {
        self.handlers.remove(resource_type).is_some()
    }

    pub(crate) fn is_registered(&self, resource_type: &str) -> bool {
        self.handlers.contains_key(resource_type)
    }

    pub(crate) fn get(&self, resource_type: &str) -> Option<Arc<dyn ErasedHandler>> {
        self.handlers.get(resource_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khora_core::resource::ResourceHandle;

    struct Numbers;

    #[async_trait]
    impl ResourceHandler for Numbers {
        type Raw = u32;
        type Output = u32;

        async fn load(&self, _ctx: &LoadContext) -> HandlerResult<u32> {
            Ok(1)
        }

        async fn open(&self, raw: u32, _ctx: &LoadContext) -> HandlerResult<u32> {
            Ok(raw)
        }

        fn clone_resource(&self, resource: &ResourceHandle<u32>, _: &ResourceRequest) -> ResourceHandle<u32> {
            ResourceHandle::new(**resource + 100)
        }
    }

    #[test]
    fn register_replaces_and_unregister_removes() {
        let mut registry = HandlerRegistry::default();
        assert!(!registry.register("number".into(), Numbers));
        assert!(registry.register("number".into(), Numbers));
        assert!(registry.is_registered("number"));
        assert!(registry.get("text").is_none());

        assert!(registry.unregister("number"));
        assert!(!registry.unregister("number"));
        assert!(!registry.is_registered("number"));
    }

    #[test]
    fn clone_resource_goes_through_the_typed_handler() {
        let mut registry = HandlerRegistry::default();
        registry.register("number".into(), Numbers);
        let handler = registry.get("number").expect("registered");
        let request = ResourceRequest::new("seven", "number");

        let cloned = handler.clone_resource(&UntypedHandle::new(7u32), &request);
        assert_eq!(cloned.downcast_ref::<u32>(), Some(&107));

        let foreign = UntypedHandle::new("not a number");
        let shared = handler.clone_resource(&foreign, &request);
        assert!(UntypedHandle::ptr_eq(&shared, &foreign));
    }
}
