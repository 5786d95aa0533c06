//! 具体化的调用模型

use crate::interceptor::Interceptor;
use ioc_common::{BoxError, InterceptionError};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 调用参数值
///
/// 参数列表就地可变: 拦截器对参数的改写对后续拦截器和真实目标
/// 可见。
pub type CallValue = Box<dyn Any + Send>;

/// 调用结果
pub type CallResult = Result<CallValue, BoxError>;

/// 真实目标函数类型
///
/// 接收静态调用描述与（可能已被改写的）参数列表。
pub type TargetFn = Arc<dyn Fn(&CallDescriptor, &mut Vec<CallValue>) -> CallResult + Send + Sync>;

/// 调用种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    /// 方法调用连接点: 目标对象已存在, 拦截发生在方法体周围
    Method,
    /// 构造连接点: 拦截发生在对象创建周围, `proceed()` 产出新实例
    Construction,
}

/// 静态调用描述
///
/// 一次调用中不变的部分: 种类、目标名称与方法标识。
#[derive(Debug, Clone)]
pub struct CallDescriptor {
    /// 调用种类
    pub kind: InvocationKind,
    /// 目标名称
    pub target: String,
    /// 方法标识, 构造连接点为空
    pub method: Option<String>,
}

/// 具体化的一次调用
///
/// 每次调用创建一个, 链完全回卷后即废弃。游标记录当前推进到的
/// 拦截器位置; 真实目标执行过后再次 `proceed()` 是防御性错误。
pub struct Invocation<'a> {
    descriptor: CallDescriptor,
    arguments: Vec<CallValue>,
    interceptors: &'a [Arc<dyn Interceptor>],
    target: &'a TargetFn,
    cursor: usize,
    target_invoked: bool,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        descriptor: CallDescriptor,
        arguments: Vec<CallValue>,
        interceptors: &'a [Arc<dyn Interceptor>],
        target: &'a TargetFn,
    ) -> Self {
        Self {
            descriptor,
            arguments,
            interceptors,
            target,
            cursor: 0,
            target_invoked: false,
        }
    }

    /// 静态调用描述
    pub fn descriptor(&self) -> &CallDescriptor {
        &self.descriptor
    }

    /// 调用种类
    pub fn kind(&self) -> InvocationKind {
        self.descriptor.kind
    }

    /// 目标名称
    pub fn target_name(&self) -> &str {
        &self.descriptor.target
    }

    /// 方法标识
    pub fn method(&self) -> Option<&str> {
        self.descriptor.method.as_deref()
    }

    /// 只读访问参数列表
    pub fn arguments(&self) -> &[CallValue] {
        &self.arguments
    }

    /// 可变访问参数列表, 改写对后续拦截器与真实目标可见
    pub fn arguments_mut(&mut self) -> &mut Vec<CallValue> {
        &mut self.arguments
    }

    /// 推进到链中的下一个拦截器, 越过末尾时调用真实目标
    ///
    /// 返回值沿链向外回流, 任何一层都可以替换它。真实目标已经执行
    /// 过之后再次调用会得到 [`InterceptionError::InvocationExhausted`]。
    pub fn proceed(&mut self) -> CallResult {
        if self.target_invoked {
            return Err(Box::new(InterceptionError::InvocationExhausted {
                target: self.descriptor.target.clone(),
            }));
        }
        if self.cursor < self.interceptors.len() {
            let interceptor = self.interceptors[self.cursor].clone();
            self.cursor += 1;
            interceptor.invoke(self)
        } else {
            self.target_invoked = true;
            (self.target)(&self.descriptor, &mut self.arguments)
        }
    }

    /// 诊断用: 失败发生时链推进到的最深位置
    pub fn innermost_position(&self) -> String {
        if self.target_invoked {
            "target".to_string()
        } else if self.cursor == 0 {
            "chain".to_string()
        } else {
            let index = self.cursor - 1;
            format!("interceptor[{}:{}]", index, self.interceptors[index].name())
        }
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("descriptor", &self.descriptor)
            .field("cursor", &self.cursor)
            .field("interceptors", &self.interceptors.len())
            .field("target_invoked", &self.target_invoked)
            .finish()
    }
}
