//! # IoC Interception
//!
//! 拦截链与连接点模型。一次对目标对象的调用被具体化为一个
//! [`Invocation`], 依次穿过有序的拦截器列表, 每个拦截器可以检查或
//! 改写参数、短路返回, 或调用 [`Invocation::proceed`] 继续向内推进,
//! 最终抵达真实目标。
//!
//! ## 核心组件
//!
//! - [`Invocation`] - 具体化的一次调用（方法调用或对象构造）
//! - [`Interceptor`] - 拦截器 trait
//! - [`InterceptionChain`] - 可调用的代理, 独立于容器使用
//!
//! ## 设计原则
//!
//! - 扁平的调用模型: 单一 `Invocation` 结构加种类标签, 不做深层接口
//!   继承
//! - 链机制自身不吞异常: 错误原样向外传播, 仅在代理边界补充位置信息

pub mod chain;
pub mod interceptor;
pub mod invocation;

pub use chain::*;
pub use interceptor::*;
pub use invocation::*;
