//! 组件作用域与容器生命周期类型

use serde::{Deserialize, Serialize};
use std::fmt;

/// 组件作用域
///
/// 决定组件实例的生存期与共享策略。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// 单例 - 容器生命周期内共享同一个实例
    Singleton,
    /// 原型 - 每次请求都创建新实例, 实例归调用方所有
    Prototype,
    /// 自定义作用域 - 由外部协作者赋予语义
    Custom(String),
}

impl Default for Scope {
    fn default() -> Self {
        Self::Singleton
    }
}

impl Scope {
    /// 是否为单例作用域
    pub fn is_singleton(&self) -> bool {
        matches!(self, Self::Singleton)
    }

    /// 是否为原型作用域
    pub fn is_prototype(&self) -> bool {
        matches!(self, Self::Prototype)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => write!(f, "singleton"),
            Self::Prototype => write!(f, "prototype"),
            Self::Custom(name) => write!(f, "custom({name})"),
        }
    }
}

/// 组件角色
///
/// 仅用于工具与诊断展示, 对运行时行为没有影响。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// 应用组件 - 用户定义的主体组件
    Application,
    /// 支撑组件 - 某个更大配置单元的组成部分
    Support,
    /// 基础设施组件 - 完全的后台角色, 与终端用户无关
    Infrastructure,
}

impl Default for Role {
    fn default() -> Self {
        Self::Application
    }
}

/// 容器状态
///
/// 状态迁移是单向的; 从 `Ready` 重新进入 `Preparing`（刷新）是
/// 唯一允许的回环, 且必须先拆除上一代单例。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// 未初始化 - 仅允许注册
    Uninitialized,
    /// 准备中 - 描述已冻结, 正在构建急切单例
    Preparing,
    /// 就绪 - 对外提供解析服务
    Ready,
    /// 已关闭 - 单例已按依赖逆序释放
    Closed,
}

impl Default for ContainerState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl ContainerState {
    /// 是否允许开始准备（首次准备或刷新）
    pub fn can_prepare(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Ready)
    }

    /// 是否允许对外解析组件
    pub fn can_serve(&self) -> bool {
        matches!(self, Self::Preparing | Self::Ready)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Preparing => write!(f, "preparing"),
            Self::Ready => write!(f, "ready"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
