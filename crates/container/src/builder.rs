//! 容器构建器
//!
//! 以流式接口预先收集配置、描述、别名与扩展点登记, `build()` 时
//! 一次性写入容器。

use crate::container::{Container, ContainerConfig};
use crate::description_registry::DescriptionPostProcessor;
use ioc_common::{
    ComponentDescription, DependencyExtractor, DestructionHook, PostConstructionHook,
    RegistryResult,
};
use ioc_interception::Interceptor;
use std::sync::Arc;
use tracing::info;

/// 容器构建器
#[derive(Default)]
pub struct ContainerBuilder {
    config: ContainerConfig,
    extractor: Option<Arc<dyn DependencyExtractor>>,
    descriptions: Vec<ComponentDescription>,
    aliases: Vec<(String, String)>,
    post_processors: Vec<Arc<dyn DescriptionPostProcessor>>,
    post_hooks: Vec<Arc<dyn PostConstructionHook>>,
    destruction_hooks: Vec<Arc<dyn DestructionHook>>,
    interceptors: Vec<(String, Vec<Arc<dyn Interceptor>>)>,
}

impl ContainerBuilder {
    /// 创建构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置容器配置
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置依赖提取器
    pub fn with_extractor(mut self, extractor: Arc<dyn DependencyExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// 添加组件描述
    pub fn register_description(mut self, description: ComponentDescription) -> Self {
        self.descriptions.push(description);
        self
    }

    /// 添加别名 `alias -> name`
    pub fn register_alias(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases.push((name.into(), alias.into()));
        self
    }

    /// 添加描述后置处理器
    pub fn add_description_post_processor(
        mut self,
        processor: Arc<dyn DescriptionPostProcessor>,
    ) -> Self {
        self.post_processors.push(processor);
        self
    }

    /// 添加构造后钩子
    pub fn add_post_construction_hook(mut self, hook: Arc<dyn PostConstructionHook>) -> Self {
        self.post_hooks.push(hook);
        self
    }

    /// 添加销毁前钩子
    pub fn add_destruction_hook(mut self, hook: Arc<dyn DestructionHook>) -> Self {
        self.destruction_hooks.push(hook);
        self
    }

    /// 为组件登记构造拦截器
    pub fn attach_interceptors(
        mut self,
        name: impl Into<String>,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Self {
        self.interceptors.push((name.into(), interceptors));
        self
    }

    /// 构建容器
    ///
    /// 只写入注册信息, 不做任何实例化; 实例化由
    /// [`Container::prepare`] 或首次 `get` 触发。
    pub fn build(self) -> RegistryResult<Container> {
        let container = match self.extractor {
            Some(extractor) => Container::with_extractor(self.config, extractor),
            None => Container::new(self.config),
        };

        let description_count = self.descriptions.len();
        for description in self.descriptions {
            container.register_description(description)?;
        }
        for (name, alias) in self.aliases {
            container.register_alias(&name, &alias)?;
        }
        for processor in self.post_processors {
            container.add_description_post_processor(processor);
        }
        for hook in self.post_hooks {
            container.add_post_construction_hook(hook);
        }
        for hook in self.destruction_hooks {
            container.add_destruction_hook(hook);
        }
        for (name, interceptors) in self.interceptors {
            container.attach_interceptors(&name, interceptors);
        }

        info!("构建容器完成，注册了 {} 个组件描述", description_count);
        Ok(container)
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("descriptions", &self.descriptions.len())
            .field("aliases", &self.aliases.len())
            .finish()
    }
}
