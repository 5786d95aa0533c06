//! 组件描述注册表
//!
//! 规范名到组件描述的映射, 记录注册顺序, 支持覆盖模式与冻结标志,
//! 并缓存父子合并的结果。

use ioc_common::{ComponentDescription, RegistryError, RegistryResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// 描述后置处理器 trait
///
/// 在容器准备期间、所有描述注册完毕且冻结之前调用一次, 可以改写
/// 注册表内容。按注册顺序执行。
pub trait DescriptionPostProcessor: Send + Sync {
    /// 处理器名称, 用于日志与错误定位
    fn name(&self) -> &str;

    /// 改写注册表
    fn post_process(&self, registry: &DescriptionRegistry) -> RegistryResult<()>;
}

/// 组件描述注册表
///
/// 准备阶段之后写少读多; 冻结后的修改不被禁止, 但会记录警告,
/// 语义上属于不安全操作。
pub struct DescriptionRegistry {
    descriptions: RwLock<HashMap<String, Arc<ComponentDescription>>>,
    registration_order: RwLock<Vec<String>>,
    merged: RwLock<HashMap<String, Arc<ComponentDescription>>>,
    allow_override: bool,
    frozen: AtomicBool,
}

impl DescriptionRegistry {
    /// 创建描述注册表
    pub fn new(allow_override: bool) -> Self {
        Self {
            descriptions: RwLock::new(HashMap::new()),
            registration_order: RwLock::new(Vec::new()),
            merged: RwLock::new(HashMap::new()),
            allow_override,
            frozen: AtomicBool::new(false),
        }
    }

    /// 注册组件描述
    ///
    /// 同名描述已存在时, 覆盖模式关闭则报
    /// [`RegistryError::DuplicateComponent`]; 开启则替换旧描述并记录
    /// 警告。替换会作废合并缓存。
    pub fn put(&self, description: ComponentDescription) -> RegistryResult<()> {
        let name = description.name.clone();
        if self.is_frozen() {
            warn!("注册表已冻结, 仍在注册组件描述: {}", name);
        }

        let mut descriptions = self.descriptions.write();
        if descriptions.contains_key(&name) {
            if !self.allow_override {
                return Err(RegistryError::DuplicateComponent { name });
            }
            warn!("组件描述被覆盖: {}", name);
            descriptions.insert(name.clone(), Arc::new(description));
            self.merged.write().clear();
        } else {
            debug!("注册组件描述: {}", name);
            descriptions.insert(name.clone(), Arc::new(description));
            self.registration_order.write().push(name);
        }
        Ok(())
    }

    /// 取出组件描述
    pub fn get(&self, name: &str) -> RegistryResult<Arc<ComponentDescription>> {
        self.descriptions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::DescriptionNotFound {
                name: name.to_string(),
            })
    }

    /// 移除组件描述
    pub fn remove(&self, name: &str) -> RegistryResult<Arc<ComponentDescription>> {
        let removed = self.descriptions.write().remove(name).ok_or_else(|| {
            RegistryError::DescriptionNotFound {
                name: name.to_string(),
            }
        })?;
        self.registration_order.write().retain(|n| n != name);
        self.merged.write().clear();
        debug!("移除组件描述: {}", name);
        Ok(removed)
    }

    /// 是否存在给定名称的描述
    pub fn contains(&self, name: &str) -> bool {
        self.descriptions.read().contains_key(name)
    }

    /// 按注册顺序列出所有描述名称
    pub fn names(&self) -> Vec<String> {
        self.registration_order.read().clone()
    }

    /// 描述数量
    pub fn count(&self) -> usize {
        self.descriptions.read().len()
    }

    /// 冻结注册表
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
        debug!("组件描述注册表已冻结, 共 {} 个描述", self.count());
    }

    /// 注册表是否已冻结
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// 解除冻结（刷新时使用）
    pub fn unfreeze(&self) {
        self.frozen.store(false, Ordering::SeqCst);
    }

    /// 取出父子合并之后的完整描述
    ///
    /// 沿父链自顶向下折叠, 结果被缓存; 父链成环报
    /// [`RegistryError::ParentCycle`]。
    pub fn merged(&self, name: &str) -> RegistryResult<Arc<ComponentDescription>> {
        if let Some(found) = self.merged.read().get(name) {
            return Ok(found.clone());
        }
        let mut visiting = Vec::new();
        let computed = Arc::new(self.compute_merged(name, &mut visiting)?);
        self.merged
            .write()
            .insert(name.to_string(), computed.clone());
        Ok(computed)
    }

    fn compute_merged(
        &self,
        name: &str,
        visiting: &mut Vec<String>,
    ) -> RegistryResult<ComponentDescription> {
        if visiting.iter().any(|n| n == name) {
            let mut chain = visiting.clone();
            chain.push(name.to_string());
            return Err(RegistryError::ParentCycle {
                chain: chain.join(" -> "),
            });
        }

        let description = self.get(name)?;
        match description.parent.clone() {
            None => Ok((*description).clone()),
            Some(parent) => {
                visiting.push(name.to_string());
                let merged_parent = self.compute_merged(&parent, visiting)?;
                visiting.pop();
                Ok(description.merged_with(&merged_parent))
            }
        }
    }
}

impl std::fmt::Debug for DescriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptionRegistry")
            .field("count", &self.count())
            .field("allow_override", &self.allow_override)
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
