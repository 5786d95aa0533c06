//! 容器生命周期钩子
//!
//! 钩子在容器明确定义的生命周期节点上运行: 构造后钩子按注册顺序,
//! 销毁前钩子在关闭时按注册逆序。

use crate::{BoxError, ComponentInstance};

/// 构造后钩子 trait
///
/// 在组件构造、属性注入与初始化回调完成之后、实例被缓存/返回之前
/// 调用。钩子可以原样返回实例, 也可以替换或包装它; 返回的实例才是
/// 真正进入缓存的对象。拦截链的织入就挂在这个节点上。
pub trait PostConstructionHook: Send + Sync {
    /// 钩子名称, 用于日志与错误定位
    fn name(&self) -> &str;

    /// 组件构造后处理
    fn after_construction(
        &self,
        component: &str,
        instance: ComponentInstance,
    ) -> Result<ComponentInstance, BoxError>;
}

/// 销毁前钩子 trait
pub trait DestructionHook: Send + Sync {
    /// 钩子名称, 用于日志与错误定位
    fn name(&self) -> &str;

    /// 在组件实例释放之前调用; 失败只记录日志, 不中断拆除流程
    fn before_destruction(&self, component: &str, instance: &ComponentInstance);
}
