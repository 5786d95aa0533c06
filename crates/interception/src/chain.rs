//! 拦截链代理

use crate::interceptor::Interceptor;
use crate::invocation::{CallDescriptor, CallValue, Invocation, InvocationKind, TargetFn};
use ioc_common::{InterceptionError, InterceptionResult};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 拦截链代理
///
/// 围绕一个真实目标构建有序的拦截器管线。每次调用代理都会创建一个
/// 新的 [`Invocation`] 并从第 0 个拦截器开始推进。链机制自身不捕获
/// 错误: 目标或拦截器的失败按由内向外的顺序穿过所有外层拦截器,
/// 仅在代理边界补充位置信息。
pub struct InterceptionChain {
    kind: InvocationKind,
    target_name: String,
    target: TargetFn,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptionChain {
    /// 构建拦截链代理
    ///
    /// 拦截器按排序值稳定排序, 排序值相同时保持注册顺序。
    pub fn build(
        kind: InvocationKind,
        target_name: impl Into<String>,
        target: TargetFn,
        mut interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Self {
        interceptors.sort_by_key(|interceptor| interceptor.order());
        let target_name = target_name.into();
        debug!(
            "构建拦截链: 目标 {}, {} 个拦截器",
            target_name,
            interceptors.len()
        );
        Self {
            kind,
            target_name,
            target,
            interceptors,
        }
    }

    /// 目标名称
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// 链上拦截器数量
    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// 调用代理
    ///
    /// 创建一次 [`Invocation`] 并推进整条链; 失败时包装为
    /// [`InterceptionError::InvocationFailure`], 保留最内层的出错位置。
    pub fn invoke(
        &self,
        method: Option<&str>,
        arguments: Vec<CallValue>,
    ) -> InterceptionResult<CallValue> {
        let descriptor = CallDescriptor {
            kind: self.kind,
            target: self.target_name.clone(),
            method: method.map(str::to_string),
        };
        let mut invocation =
            Invocation::new(descriptor, arguments, &self.interceptors, &self.target);
        invocation
            .proceed()
            .map_err(|source| InterceptionError::InvocationFailure {
                target: self.target_name.clone(),
                position: invocation.innermost_position(),
                source,
            })
    }
}

impl fmt::Debug for InterceptionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionChain")
            .field("kind", &self.kind)
            .field("target_name", &self.target_name)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}
