//! # IoC Container
//!
//! 托管组件容器的核心: 组件注册表、依赖解析器、实例缓存与容器
//! 组合根。外部协作者向注册表喂入 `(名称, 组件描述)` 流与
//! `(名称, 别名)` 对, 然后通过 `prepare()` / `get(name)` /
//! `refresh()` / `close()` 驱动容器生命周期。
//!
//! ## 核心组件
//!
//! - [`AliasRegistry`] - 规范名与别名的双向映射
//! - [`DescriptionRegistry`] - 组件描述存储与父子合并
//! - [`DependencyResolver`] - 拓扑初始化顺序与声明级环检测
//! - [`InstanceCache`] - 按作用域存放实例, 单例至多构造一次
//! - [`Container`] - 组合根, 驱动构造管线与生命周期钩子
//! - [`ContainerBuilder`] - 流式预配置
//!
//! ## 数据流
//!
//! 描述进入注册表, 解析器给出初始化顺序, 容器按序实例化并借助
//! 实例缓存避免重建单例; 登记了拦截器的组件在构造后节点被拦截链
//! 包装, 对代理的调用先穿过链再抵达真实对象。

pub mod alias_registry;
pub mod builder;
pub mod container;
pub mod dependency_graph;
pub mod description_registry;
pub mod instance_cache;

pub use alias_registry::*;
pub use builder::*;
pub use container::*;
pub use dependency_graph::*;
pub use description_registry::*;
pub use instance_cache::*;
