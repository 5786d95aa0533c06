//! 依赖图与初始化顺序解析
//!
//! 对描述注册表做深度优先拓扑排序, 三色标记检测声明级循环依赖,
//! 并给出确定性的急切实例化顺序。

use crate::alias_registry::AliasRegistry;
use crate::description_registry::DescriptionRegistry;
use ioc_common::{DependencyExtractor, DependencyKind, ResolutionError, ResolutionResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 节点着色: 未入表的节点即未访问
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// 正在访问（在当前 DFS 栈上）
    InProgress,
    /// 访问完毕
    Done,
}

/// 依赖顺序解析器
///
/// 依赖边来自注入的提取能力; 解析器不关心边是如何被发现的。
pub struct DependencyResolver {
    extractor: Arc<dyn DependencyExtractor>,
}

impl DependencyResolver {
    /// 以给定提取器创建解析器
    pub fn new(extractor: Arc<dyn DependencyExtractor>) -> Self {
        Self { extractor }
    }

    /// 计算给定根集合的拓扑初始化顺序
    ///
    /// 对每个依赖 `p` 与依赖者 `d`, 结果中 `p` 一定先于 `d`。相互独立
    /// 的组件按原始注册顺序排列, 同样的输入重复调用产生同样的输出。
    /// 顺序依赖与构造参数依赖指向栈上节点时报
    /// [`ResolutionError::CircularDeclaration`] 并带出完整环路; 属性
    /// 依赖成环不在声明期失败, 留待实例化期以延迟引用化解。依赖
    /// 名单指向未注册的名称报 [`ResolutionError::NoSuchComponent`]。
    pub fn order(
        &self,
        roots: &[String],
        registry: &DescriptionRegistry,
        aliases: &AliasRegistry,
    ) -> ResolutionResult<Vec<String>> {
        let mut marks: HashMap<String, Mark> = HashMap::new();
        let mut path: Vec<String> = Vec::new();
        let mut ordered: Vec<String> = Vec::new();

        for name in roots {
            let canonical = aliases.resolve(name);
            if marks.get(&canonical) != Some(&Mark::Done) {
                self.visit(&canonical, registry, aliases, &mut marks, &mut path, &mut ordered)?;
            }
        }
        Ok(ordered)
    }

    fn visit(
        &self,
        canonical: &str,
        registry: &DescriptionRegistry,
        aliases: &AliasRegistry,
        marks: &mut HashMap<String, Mark>,
        path: &mut Vec<String>,
        ordered: &mut Vec<String>,
    ) -> ResolutionResult<()> {
        if !registry.contains(canonical) {
            return Err(ResolutionError::NoSuchComponent {
                name: canonical.to_string(),
            });
        }

        marks.insert(canonical.to_string(), Mark::InProgress);
        path.push(canonical.to_string());

        let merged = registry.merged(canonical)?;
        for request in self.extractor.extract(&merged) {
            let child = aliases.resolve(&request.name);
            match marks.get(&child) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    // 属性依赖允许成环, 其余种类在声明期即失败
                    if request.kind != DependencyKind::Property {
                        let start = path.iter().position(|n| n == &child).unwrap_or(0);
                        let mut cycle: Vec<String> = path[start..].to_vec();
                        cycle.push(child);
                        return Err(ResolutionError::CircularDeclaration {
                            cycle: cycle.join(" -> "),
                        });
                    }
                }
                None => {
                    self.visit(&child, registry, aliases, marks, path, ordered)?;
                }
            }
        }

        path.pop();
        marks.insert(canonical.to_string(), Mark::Done);
        ordered.push(canonical.to_string());
        Ok(())
    }

    /// 计算急切实例化顺序
    ///
    /// 以注册顺序中所有非抽象描述为根做全量排序（顺带完成声明校验）,
    /// 输出只保留急切的单例; 懒加载组件参与排序与环检测, 但不出现在
    /// 输出里, 留待首次请求时按需解析。
    pub fn eager_order(
        &self,
        registry: &DescriptionRegistry,
        aliases: &AliasRegistry,
    ) -> ResolutionResult<Vec<String>> {
        let mut roots = Vec::new();
        for name in registry.names() {
            let merged = registry.merged(&name)?;
            if !merged.is_abstract {
                roots.push(name);
            }
        }

        let full = self.order(&roots, registry, aliases)?;
        let mut eager = Vec::new();
        for name in full {
            let merged = registry.merged(&name)?;
            if !merged.is_abstract && !merged.is_lazy() && merged.is_singleton() {
                eager.push(name);
            }
        }
        debug!("急切实例化顺序: {:?}", eager);
        Ok(eager)
    }
}

impl std::fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver").finish()
    }
}
