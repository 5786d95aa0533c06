//! 组件描述模型
//!
//! 描述一个受管组件的全部声明信息: 作用域、懒加载标志、依赖名单、
//! 工厂配方、属性规格与诊断元数据。描述支持父子继承, 子描述未设置
//! 的字段回落到父描述。

use crate::lifecycle::{Role, Scope};
use crate::recipe::{ArgumentSpec, PropertyApplier, PropertySpec, Recipe};
use crate::{BoxError, ComponentInstance};
use std::fmt;
use std::sync::Arc;

/// 组件来源信息（用于诊断展示）
#[derive(Debug, Clone)]
pub struct ComponentOrigin {
    /// 来源描述, 例如配置文件路径或产生描述的协作者名称
    pub source: String,
    /// 注册时间
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

impl ComponentOrigin {
    /// 以当前时间创建来源信息
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            registered_at: chrono::Utc::now(),
        }
    }
}

/// 生命周期回调函数类型（初始化/销毁）
pub type LifecycleCallback = Arc<dyn Fn(&ComponentInstance) -> Result<(), BoxError> + Send + Sync>;

/// 组件描述
///
/// 注册表冻结之前可变; 冻结之后按约定不可变（晚期修改不被禁止,
/// 只是不安全）。`scope` 与 `lazy` 为 `Option`, 未设置的字段在父子
/// 合并时继承父描述的取值。
#[derive(Clone)]
pub struct ComponentDescription {
    /// 规范名称, 注册表内唯一
    pub name: String,
    /// 父描述名称, 用于描述继承
    pub parent: Option<String>,
    /// 作用域, 未设置时继承或回落为单例
    pub scope: Option<Scope>,
    /// 懒加载标志, 未设置时继承或回落为急切
    pub lazy: Option<bool>,
    /// 必须先完成初始化的组件名单, 独立于构造参数依赖
    pub depends_on: Vec<String>,
    /// 工厂配方; 抽象模板可以没有配方
    pub recipe: Option<Recipe>,
    /// 属性注入规格
    pub properties: Vec<PropertySpec>,
    /// 属性注入函数, 声明了属性时必须提供
    pub property_applier: Option<PropertyApplier>,
    /// 初始化回调, 在属性注入之后、构造后钩子之前执行
    pub init: Option<LifecycleCallback>,
    /// 销毁回调, 在容器关闭时按创建逆序执行
    pub destroy: Option<LifecycleCallback>,
    /// 抽象标志, 抽象描述仅作为模板, 不可直接实例化
    pub is_abstract: bool,
    /// 组件角色, 仅用于工具展示
    pub role: Role,
    /// 人类可读的描述文本
    pub description: Option<String>,
    /// 来源信息
    pub origin: Option<ComponentOrigin>,
}

impl ComponentDescription {
    /// 创建空白描述
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            scope: None,
            lazy: None,
            depends_on: Vec::new(),
            recipe: None,
            properties: Vec::new(),
            property_applier: None,
            init: None,
            destroy: None,
            is_abstract: false,
            role: Role::default(),
            description: None,
            origin: None,
        }
    }

    /// 设置父描述名称
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// 设置懒加载标志
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = Some(lazy);
        self
    }

    /// 追加一个初始化顺序依赖
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// 设置初始化顺序依赖名单
    pub fn with_depends_on(mut self, names: Vec<String>) -> Self {
        self.depends_on = names;
        self
    }

    /// 设置工厂配方
    pub fn with_recipe(mut self, recipe: Recipe) -> Self {
        self.recipe = Some(recipe);
        self
    }

    /// 追加一个属性注入规格
    pub fn with_property(mut self, name: impl Into<String>, value: ArgumentSpec) -> Self {
        self.properties.push(PropertySpec::new(name, value));
        self
    }

    /// 设置属性注入函数
    pub fn with_property_applier(mut self, applier: PropertyApplier) -> Self {
        self.property_applier = Some(applier);
        self
    }

    /// 设置初始化回调
    pub fn with_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&ComponentInstance) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }

    /// 设置销毁回调
    pub fn with_destroy<F>(mut self, destroy: F) -> Self
    where
        F: Fn(&ComponentInstance) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.destroy = Some(Arc::new(destroy));
        self
    }

    /// 标记为抽象模板
    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    /// 设置组件角色
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// 设置描述文本
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 设置来源信息
    pub fn with_origin(mut self, origin: ComponentOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// 生效的作用域（未设置时为单例）
    pub fn scope(&self) -> Scope {
        self.scope.clone().unwrap_or_default()
    }

    /// 生效的懒加载标志（未设置时为急切）
    pub fn is_lazy(&self) -> bool {
        self.lazy.unwrap_or(false)
    }

    /// 生效的作用域是否为单例
    pub fn is_singleton(&self) -> bool {
        self.scope().is_singleton()
    }

    /// 与父描述合并, 产出子描述视角下的完整描述
    ///
    /// 子描述已设置的字段保持不变; 未设置的字段取父描述的值。
    /// `depends_on` 名单拼接（父在前）而不是替换; 同名属性以子描述
    /// 为准。抽象标志不继承。合并是幂等的: 对结果再次应用同一父
    /// 描述不会产生变化。
    pub fn merged_with(&self, parent: &ComponentDescription) -> ComponentDescription {
        let mut merged = self.clone();

        if merged.scope.is_none() {
            merged.scope = parent.scope.clone();
        }
        if merged.lazy.is_none() {
            merged.lazy = parent.lazy;
        }
        if merged.recipe.is_none() {
            merged.recipe = parent.recipe.clone();
        }
        if merged.property_applier.is_none() {
            merged.property_applier = parent.property_applier.clone();
        }
        if merged.init.is_none() {
            merged.init = parent.init.clone();
        }
        if merged.destroy.is_none() {
            merged.destroy = parent.destroy.clone();
        }

        let mut depends_on = parent.depends_on.clone();
        for name in &self.depends_on {
            if !depends_on.contains(name) {
                depends_on.push(name.clone());
            }
        }
        merged.depends_on = depends_on;

        let mut properties = parent.properties.clone();
        for prop in &self.properties {
            if let Some(existing) = properties.iter_mut().find(|p| p.name == prop.name) {
                *existing = prop.clone();
            } else {
                properties.push(prop.clone());
            }
        }
        merged.properties = properties;

        merged
    }
}

impl fmt::Debug for ComponentDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescription")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("scope", &self.scope)
            .field("lazy", &self.lazy)
            .field("depends_on", &self.depends_on)
            .field("recipe", &self.recipe)
            .field("properties", &self.properties)
            .field("is_abstract", &self.is_abstract)
            .field("role", &self.role)
            .field("description", &self.description)
            .field("origin", &self.origin)
            .finish()
    }
}
