//! 别名注册表
//!
//! 规范名与别名集合的双向映射。别名始终直接指向规范名, 解析最多走
//! 一跳; 注册时做环检测与遮蔽检测, 使链式别名无法形成。

use ioc_common::{RegistryError, RegistryResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

/// 别名注册表
///
/// 准备阶段之后写少读多; 写操作由写锁串行化, 读操作面向稳定快照。
#[derive(Debug, Default)]
pub struct AliasRegistry {
    aliases: RwLock<HashMap<String, String>>,
    allow_override: bool,
}

impl AliasRegistry {
    /// 创建别名注册表
    pub fn new(allow_override: bool) -> Self {
        Self {
            aliases: RwLock::new(HashMap::new()),
            allow_override,
        }
    }

    /// 注册别名 `alias -> name`
    ///
    /// 目标在注册时即折算为规范名, 因此映射值永远是规范名。重复注册
    /// 同一对绑定是无操作; 把别名改绑到其他名称在覆盖模式关闭时报
    /// [`RegistryError::AliasConflict`], 开启时记录警告并替换。
    pub fn register(&self, name: &str, alias: &str) -> RegistryResult<()> {
        if alias == name {
            return Err(RegistryError::AliasConflict {
                name: name.to_string(),
                alias: alias.to_string(),
                reason: "别名与规范名相同".to_string(),
            });
        }

        let mut aliases = self.aliases.write();

        // 目标折算为规范名, 保持一跳解析
        let canonical = aliases.get(name).cloned().unwrap_or_else(|| name.to_string());
        if canonical == alias {
            return Err(RegistryError::AliasConflict {
                name: name.to_string(),
                alias: alias.to_string(),
                reason: "注册后将形成别名环".to_string(),
            });
        }

        // 已是其他别名的目标的名称不允许再注册为别名
        if aliases.values().any(|target| target == alias) {
            return Err(RegistryError::AliasConflict {
                name: name.to_string(),
                alias: alias.to_string(),
                reason: "该名称已是其他别名的目标".to_string(),
            });
        }

        if let Some(existing) = aliases.get(alias) {
            if existing == &canonical {
                return Ok(());
            }
            if !self.allow_override {
                return Err(RegistryError::AliasConflict {
                    name: name.to_string(),
                    alias: alias.to_string(),
                    reason: format!("别名已绑定到 {existing}"),
                });
            }
            warn!("别名被改绑: {} -> {} (原 {})", alias, canonical, existing);
        } else {
            debug!("注册别名: {} -> {}", alias, canonical);
        }

        aliases.insert(alias.to_string(), canonical);
        Ok(())
    }

    /// 移除别名
    pub fn remove(&self, alias: &str) -> RegistryResult<()> {
        if self.aliases.write().remove(alias).is_none() {
            return Err(RegistryError::AliasNotFound {
                alias: alias.to_string(),
            });
        }
        debug!("移除别名: {}", alias);
        Ok(())
    }

    /// 解析名称或别名为规范名, 最多走一跳
    pub fn resolve(&self, name_or_alias: &str) -> String {
        self.aliases
            .read()
            .get(name_or_alias)
            .cloned()
            .unwrap_or_else(|| name_or_alias.to_string())
    }

    /// 给定名称是否是别名
    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.read().contains_key(name)
    }

    /// 枚举指向给定规范名的所有别名
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        self.aliases
            .read()
            .iter()
            .filter(|(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.clone())
            .collect()
    }

    /// 已注册的别名数量
    pub fn count(&self) -> usize {
        self.aliases.read().len()
    }
}
