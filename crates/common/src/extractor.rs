//! 依赖提取能力
//!
//! 解析器不关心依赖是如何被发现的; 它只消费本模块定义的提取能力,
//! 由提取器从组件描述中产出有序的依赖请求列表。

use crate::description::ComponentDescription;
use crate::recipe::{ArgumentSpec, Recipe};

/// 依赖种类
///
/// 种类决定实例化期循环依赖是否可以通过延迟引用化解:
/// 只有属性依赖可以延迟, 顺序依赖与构造参数依赖遇环即失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// 初始化顺序依赖（dependsOn）
    Ordering,
    /// 构造参数依赖（配方引用）
    Constructor,
    /// 属性注入依赖
    Property,
}

/// 依赖请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequest {
    /// 被依赖的组件名称（可以是别名）
    pub name: String,
    /// 依赖种类
    pub kind: DependencyKind,
}

impl DependencyRequest {
    /// 创建依赖请求
    pub fn new(name: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// 依赖提取能力 trait
pub trait DependencyExtractor: Send + Sync {
    /// 从合并后的组件描述中提取有序的依赖请求列表
    fn extract(&self, description: &ComponentDescription) -> Vec<DependencyRequest>;
}

/// 默认依赖提取器
///
/// 依次产出: dependsOn 名单、配方声明的构造参数引用（含实例工厂的
/// 工厂组件）、属性规格中的组件引用。同名同种类的请求只保留首个。
#[derive(Debug, Default)]
pub struct RecipeDependencyExtractor;

impl RecipeDependencyExtractor {
    /// 创建默认提取器
    pub fn new() -> Self {
        Self
    }
}

impl DependencyExtractor for RecipeDependencyExtractor {
    fn extract(&self, description: &ComponentDescription) -> Vec<DependencyRequest> {
        let mut requests: Vec<DependencyRequest> = Vec::new();
        let mut push = |requests: &mut Vec<DependencyRequest>, req: DependencyRequest| {
            if !requests.contains(&req) {
                requests.push(req);
            }
        };

        for name in &description.depends_on {
            push(
                &mut requests,
                DependencyRequest::new(name, DependencyKind::Ordering),
            );
        }

        if let Some(recipe) = &description.recipe {
            if let Recipe::InstanceFactory {
                factory_component, ..
            } = recipe
            {
                push(
                    &mut requests,
                    DependencyRequest::new(factory_component, DependencyKind::Constructor),
                );
            }
            for argument in recipe.arguments() {
                if let ArgumentSpec::Reference(name) = argument {
                    push(
                        &mut requests,
                        DependencyRequest::new(name, DependencyKind::Constructor),
                    );
                }
            }
        }

        for property in &description.properties {
            if let ArgumentSpec::Reference(name) = &property.value {
                push(
                    &mut requests,
                    DependencyRequest::new(name, DependencyKind::Property),
                );
            }
        }

        requests
    }
}
