//! 工厂配方
//!
//! 配方描述"如何产出一个组件实例", 以带标签的变体表达四种产出方式,
//! 各自携带自己的参数绑定; 不依赖运行时类型检查。

use crate::deferred::DeferredRef;
use crate::{BoxError, ComponentInstance};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 构造参数绑定
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentSpec {
    /// 字面值参数, 原样传递给工厂
    Value(serde_json::Value),
    /// 引用另一个受管组件（可以是别名）
    Reference(String),
}

impl ArgumentSpec {
    /// 便捷构造: 字面值
    pub fn value(value: impl Into<serde_json::Value>) -> Self {
        Self::Value(value.into())
    }

    /// 便捷构造: 组件引用
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }
}

/// 属性注入规格
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    /// 属性名
    pub name: String,
    /// 属性值绑定
    pub value: ArgumentSpec,
}

impl PropertySpec {
    /// 创建属性规格
    pub fn new(name: impl Into<String>, value: ArgumentSpec) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// 已解析的依赖值
#[derive(Clone)]
pub enum ResolvedValue {
    /// 字面值
    Literal(serde_json::Value),
    /// 已构造完成的组件实例
    Instance(ComponentInstance),
    /// 延迟引用, 目标组件仍在构造中
    Deferred(DeferredRef),
}

impl fmt::Debug for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Self::Instance(_) => f.debug_tuple("Instance").field(&"<instance>").finish(),
            Self::Deferred(d) => f.debug_tuple("Deferred").field(d).finish(),
        }
    }
}

/// 已解析的参数列表
///
/// 按配方声明的顺序排列, 提供带类型检查的取值方法。
#[derive(Debug, Default)]
pub struct ResolvedArguments {
    values: Vec<ResolvedValue>,
}

impl ResolvedArguments {
    /// 从已解析值构建参数列表
    pub fn new(values: Vec<ResolvedValue>) -> Self {
        Self { values }
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 按位置取原始值
    pub fn get(&self, index: usize) -> Option<&ResolvedValue> {
        self.values.get(index)
    }

    /// 按位置取组件实例
    pub fn instance(&self, index: usize) -> Result<ComponentInstance, BoxError> {
        match self.values.get(index) {
            Some(ResolvedValue::Instance(instance)) => Ok(instance.clone()),
            Some(other) => Err(format!("参数 {index} 不是组件实例: {other:?}").into()),
            None => Err(format!("参数 {index} 不存在").into()),
        }
    }

    /// 按位置取组件实例并下转型为具体类型
    pub fn component<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, BoxError> {
        self.instance(index)?
            .downcast::<T>()
            .map_err(|_| format!("参数 {index} 类型不匹配").into())
    }

    /// 按位置取字面值
    pub fn literal(&self, index: usize) -> Result<&serde_json::Value, BoxError> {
        match self.values.get(index) {
            Some(ResolvedValue::Literal(value)) => Ok(value),
            Some(other) => Err(format!("参数 {index} 不是字面值: {other:?}").into()),
            None => Err(format!("参数 {index} 不存在").into()),
        }
    }

    /// 按位置取字面值并反序列化为目标类型
    pub fn literal_as<T: DeserializeOwned>(&self, index: usize) -> Result<T, BoxError> {
        let value = self.literal(index)?.clone();
        serde_json::from_value(value).map_err(|e| format!("参数 {index} 反序列化失败: {e}").into())
    }

    /// 按位置取延迟引用
    pub fn deferred(&self, index: usize) -> Result<DeferredRef, BoxError> {
        match self.values.get(index) {
            Some(ResolvedValue::Deferred(cell)) => Ok(cell.clone()),
            Some(other) => Err(format!("参数 {index} 不是延迟引用: {other:?}").into()),
            None => Err(format!("参数 {index} 不存在").into()),
        }
    }
}

/// 工厂函数类型: 以已解析参数产出组件实例
pub type FactoryFn =
    Arc<dyn Fn(ResolvedArguments) -> Result<ComponentInstance, BoxError> + Send + Sync>;

/// 实例工厂函数类型: 在工厂组件实例上产出组件实例
pub type InstanceFactoryFn = Arc<
    dyn Fn(&ComponentInstance, ResolvedArguments) -> Result<ComponentInstance, BoxError>
        + Send
        + Sync,
>;

/// 供给函数类型: 无参产出组件实例
pub type SupplierFn = Arc<dyn Fn() -> Result<ComponentInstance, BoxError> + Send + Sync>;

/// 属性注入函数类型: (实例, 属性名, 已解析值)
///
/// 声明了属性规格的描述必须同时提供注入函数, 容器对实例内部
/// 结构保持无知。
pub type PropertyApplier =
    Arc<dyn Fn(&ComponentInstance, &str, ResolvedValue) -> Result<(), BoxError> + Send + Sync>;

/// 工厂配方
///
/// 带标签的变体覆盖四种产出方式, 每个变体携带自己的参数绑定。
#[derive(Clone)]
pub enum Recipe {
    /// 构造函数调用
    Constructor {
        /// 构造闭包
        construct: FactoryFn,
        /// 构造参数绑定
        arguments: Vec<ArgumentSpec>,
    },
    /// 静态工厂调用
    StaticFactory {
        /// 工厂闭包
        factory: FactoryFn,
        /// 工厂参数绑定
        arguments: Vec<ArgumentSpec>,
    },
    /// 实例工厂调用: 先解析工厂组件, 再在其实例上调用
    InstanceFactory {
        /// 工厂组件名称
        factory_component: String,
        /// 调用闭包, 第一个参数是工厂组件实例
        invoke: InstanceFactoryFn,
        /// 调用参数绑定
        arguments: Vec<ArgumentSpec>,
    },
    /// 外部供给函数, 不经过参数绑定
    Supplied {
        /// 供给闭包
        supplier: SupplierFn,
    },
}

impl Recipe {
    /// 便捷构造: 构造函数配方
    pub fn constructor<F>(construct: F, arguments: Vec<ArgumentSpec>) -> Self
    where
        F: Fn(ResolvedArguments) -> Result<ComponentInstance, BoxError> + Send + Sync + 'static,
    {
        Self::Constructor {
            construct: Arc::new(construct),
            arguments,
        }
    }

    /// 便捷构造: 静态工厂配方
    pub fn static_factory<F>(factory: F, arguments: Vec<ArgumentSpec>) -> Self
    where
        F: Fn(ResolvedArguments) -> Result<ComponentInstance, BoxError> + Send + Sync + 'static,
    {
        Self::StaticFactory {
            factory: Arc::new(factory),
            arguments,
        }
    }

    /// 便捷构造: 实例工厂配方
    pub fn instance_factory<F>(
        factory_component: impl Into<String>,
        invoke: F,
        arguments: Vec<ArgumentSpec>,
    ) -> Self
    where
        F: Fn(&ComponentInstance, ResolvedArguments) -> Result<ComponentInstance, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self::InstanceFactory {
            factory_component: factory_component.into(),
            invoke: Arc::new(invoke),
            arguments,
        }
    }

    /// 便捷构造: 供给函数配方
    pub fn supplied<F>(supplier: F) -> Self
    where
        F: Fn() -> Result<ComponentInstance, BoxError> + Send + Sync + 'static,
    {
        Self::Supplied {
            supplier: Arc::new(supplier),
        }
    }

    /// 配方的参数绑定列表
    pub fn arguments(&self) -> &[ArgumentSpec] {
        match self {
            Self::Constructor { arguments, .. }
            | Self::StaticFactory { arguments, .. }
            | Self::InstanceFactory { arguments, .. } => arguments,
            Self::Supplied { .. } => &[],
        }
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructor { arguments, .. } => f
                .debug_struct("Constructor")
                .field("arguments", arguments)
                .finish(),
            Self::StaticFactory { arguments, .. } => f
                .debug_struct("StaticFactory")
                .field("arguments", arguments)
                .finish(),
            Self::InstanceFactory {
                factory_component,
                arguments,
                ..
            } => f
                .debug_struct("InstanceFactory")
                .field("factory_component", factory_component)
                .field("arguments", arguments)
                .finish(),
            Self::Supplied { .. } => f.debug_struct("Supplied").finish(),
        }
    }
}
