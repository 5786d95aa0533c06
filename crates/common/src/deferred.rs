//! 延迟依赖引用
//!
//! 属性注入允许的循环依赖通过延迟引用打破: 依赖槽位在构造期间
//! 合法为空, 目标组件完成构造后被填充恰好一次。

use crate::errors::{DeferredError, DeferredResult};
use crate::ComponentInstance;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 延迟依赖引用
///
/// 在填充之前访问是错误, 不是未定义行为; 重复填充同样是错误。
#[derive(Clone)]
pub struct DeferredRef {
    target: String,
    cell: Arc<OnceCell<ComponentInstance>>,
}

impl DeferredRef {
    /// 创建指向目标组件的空引用
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// 目标组件名称
    pub fn target(&self) -> &str {
        &self.target
    }

    /// 引用是否已被填充
    pub fn is_filled(&self) -> bool {
        self.cell.get().is_some()
    }

    /// 取出已填充的实例
    pub fn get(&self) -> DeferredResult<ComponentInstance> {
        self.cell
            .get()
            .cloned()
            .ok_or_else(|| DeferredError::Unfilled {
                target: self.target.clone(),
            })
    }

    /// 取出已填充的实例并下转型为具体组件类型
    pub fn component<T: Any + Send + Sync>(&self) -> DeferredResult<Arc<T>> {
        self.get()?
            .downcast::<T>()
            .map_err(|_| DeferredError::TypeMismatch {
                target: self.target.clone(),
            })
    }

    /// 填充引用, 只允许一次
    pub fn fill(&self, instance: ComponentInstance) -> DeferredResult<()> {
        self.cell
            .set(instance)
            .map_err(|_| DeferredError::AlreadyFilled {
                target: self.target.clone(),
            })
    }
}

impl fmt::Debug for DeferredRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredRef")
            .field("target", &self.target)
            .field("filled", &self.is_filled())
            .finish()
    }
}
