//! 错误类型定义

use crate::BoxError;
use thiserror::Error;

/// 注册表错误类型
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("别名冲突: {alias} -> {name}, 原因: {reason}")]
    AliasConflict {
        name: String,
        alias: String,
        reason: String,
    },

    #[error("别名不存在: {alias}")]
    AliasNotFound { alias: String },

    #[error("组件描述不存在: {name}")]
    DescriptionNotFound { name: String },

    #[error("组件描述重复注册: {name}")]
    DuplicateComponent { name: String },

    #[error("组件描述继承链存在环: {chain}")]
    ParentCycle { chain: String },
}

/// 依赖解析错误类型
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("组件未定义: {name}")]
    NoSuchComponent { name: String },

    #[error("抽象描述不可实例化: {name}")]
    CannotInstantiateAbstract { name: String },

    #[error("声明级循环依赖: {cycle}")]
    CircularDeclaration { cycle: String },

    #[error("实例化循环依赖: {stack}")]
    CircularInstantiation { stack: String },

    #[error("组件构造失败: {name}, 原因: {source}")]
    ConstructionFailure { name: String, source: BoxError },

    #[error("组件类型不匹配: {name}")]
    TypeMismatch { name: String },

    #[error("依赖解析深度超限: {name}, 上限 {limit}")]
    DepthExceeded { name: String, limit: usize },

    #[error("容器状态不允许该操作: {state}")]
    ContainerUnavailable { state: String },

    #[error("注册表错误: {source}")]
    Registry {
        #[from]
        source: RegistryError,
    },
}

/// 延迟引用错误类型
#[derive(Error, Debug)]
pub enum DeferredError {
    #[error("延迟引用尚未填充: {target}")]
    Unfilled { target: String },

    #[error("延迟引用重复填充: {target}")]
    AlreadyFilled { target: String },

    #[error("延迟引用类型不匹配: {target}")]
    TypeMismatch { target: String },
}

/// 拦截链错误类型
#[derive(Error, Debug)]
pub enum InterceptionError {
    #[error("拦截链调用失败: 目标 {target}, 位置 {position}, 原因: {source}")]
    InvocationFailure {
        target: String,
        position: String,
        source: BoxError,
    },

    #[error("调用已走完拦截链, 不允许再次 proceed: 目标 {target}")]
    InvocationExhausted { target: String },

    #[error("拦截链返回了非预期的结果类型: 目标 {target}")]
    UnexpectedResult { target: String },
}

/// 结果类型别名
pub type RegistryResult<T> = Result<T, RegistryError>;
pub type ResolutionResult<T> = Result<T, ResolutionError>;
pub type DeferredResult<T> = Result<T, DeferredError>;
pub type InterceptionResult<T> = Result<T, InterceptionError>;
