//! 容器组合根
//!
//! 编排描述注册表、依赖解析器与实例缓存来回答 `get(name)`, 驱动
//! "构造中"守卫检测实例化循环（区别于声明循环）, 并在明确定义的
//! 生命周期节点上运行钩子与拦截织入。

use crate::alias_registry::AliasRegistry;
use crate::dependency_graph::DependencyResolver;
use crate::description_registry::{DescriptionPostProcessor, DescriptionRegistry};
use crate::instance_cache::InstanceCache;
use ioc_common::{
    ArgumentSpec, ComponentDescription, ComponentInstance, ContainerState, DeferredRef,
    DependencyExtractor, DependencyKind, DestructionHook, PostConstructionHook, Recipe,
    RecipeDependencyExtractor, RegistryError, RegistryResult, ResolutionError, ResolutionResult,
    ResolvedArguments, ResolvedValue, Scope,
};
use ioc_interception::{CallValue, InterceptionChain, Interceptor, InvocationKind, TargetFn};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 容器配置
///
/// 所有策略通过该显式配置对象传入, 容器不依赖任何进程级全局状态。
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// 是否允许描述与别名的覆盖注册
    pub allow_override: bool,
    /// 最大解析深度, 防御配置错误导致的无界递归
    pub max_resolution_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_override: false,
            max_resolution_depth: 100,
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default)]
pub struct ContainerStats {
    /// 已注册的描述数量
    pub registered_descriptions: usize,
    /// 已发布的单例数量
    pub active_singletons: usize,
    /// 成功完成的解析次数
    pub completed_resolutions: u64,
    /// 失败的解析次数
    pub failed_resolutions: u64,
}

/// 解析上下文
///
/// 记录当前解析请求路径上"正在构造"的组件名称, 用于实例化循环
/// 检测; 每次对外的 `get` 调用各自持有一份。
#[derive(Debug, Default)]
struct ResolveContext {
    path: Vec<String>,
}

/// 依赖注入容器
///
/// 并发调用者可以同时调用 [`Container::get`]; 唯一的阻塞点是实例
/// 缓存中的单例构造标记。
pub struct Container {
    id: Uuid,
    config: ContainerConfig,
    descriptions: DescriptionRegistry,
    aliases: AliasRegistry,
    cache: InstanceCache,
    resolver: DependencyResolver,
    extractor: Arc<dyn DependencyExtractor>,
    state: RwLock<ContainerState>,
    post_processors: RwLock<Vec<Arc<dyn DescriptionPostProcessor>>>,
    post_hooks: RwLock<Vec<Arc<dyn PostConstructionHook>>>,
    destruction_hooks: RwLock<Vec<Arc<dyn DestructionHook>>>,
    interceptors: RwLock<HashMap<String, Vec<Arc<dyn Interceptor>>>>,
    pending_fills: Mutex<HashMap<String, Vec<DeferredRef>>>,
    creation_order: Mutex<Vec<String>>,
    generation: AtomicU64,
    prepared_at: Mutex<Option<chrono::DateTime<chrono::Utc>>>,
    completed_resolutions: AtomicU64,
    failed_resolutions: AtomicU64,
}

impl Container {
    /// 以默认依赖提取器创建容器
    pub fn new(config: ContainerConfig) -> Self {
        Self::with_extractor(config, Arc::new(RecipeDependencyExtractor::new()))
    }

    /// 以指定依赖提取器创建容器
    pub fn with_extractor(config: ContainerConfig, extractor: Arc<dyn DependencyExtractor>) -> Self {
        let id = Uuid::new_v4();
        info!("创建容器: {}", id);
        Self {
            id,
            descriptions: DescriptionRegistry::new(config.allow_override),
            aliases: AliasRegistry::new(config.allow_override),
            cache: InstanceCache::new(),
            resolver: DependencyResolver::new(extractor.clone()),
            extractor,
            config,
            state: RwLock::new(ContainerState::Uninitialized),
            post_processors: RwLock::new(Vec::new()),
            post_hooks: RwLock::new(Vec::new()),
            destruction_hooks: RwLock::new(Vec::new()),
            interceptors: RwLock::new(HashMap::new()),
            pending_fills: Mutex::new(HashMap::new()),
            creation_order: Mutex::new(Vec::new()),
            generation: AtomicU64::new(0),
            prepared_at: Mutex::new(None),
            completed_resolutions: AtomicU64::new(0),
            failed_resolutions: AtomicU64::new(0),
        }
    }

    /// 容器标识
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 当前状态
    pub fn state(&self) -> ContainerState {
        *self.state.read()
    }

    /// 当前代次, 每次成功准备递增
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// 最近一次成功准备的时间
    pub fn prepared_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        *self.prepared_at.lock()
    }

    // --- 注册表操作 ---

    /// 注册组件描述
    ///
    /// 覆盖模式下替换已有描述会同时丢弃旧描述缓存的单例。
    pub fn register_description(&self, description: ComponentDescription) -> RegistryResult<()> {
        let name = description.name.clone();
        if self.aliases.is_alias(&name) {
            return Err(RegistryError::AliasConflict {
                name: self.aliases.resolve(&name),
                alias: name,
                reason: "组件名被已注册的别名遮蔽".to_string(),
            });
        }
        let replacing = self.descriptions.contains(&name);
        self.descriptions.put(description)?;
        if replacing && self.cache.evict(&name).is_some() {
            warn!("描述被替换, 丢弃已缓存的单例: {}", name);
            self.creation_order.lock().retain(|n| n != &name);
        }
        Ok(())
    }

    /// 移除组件描述
    pub fn remove_description(&self, name: &str) -> RegistryResult<()> {
        self.descriptions.remove(name)?;
        if self.cache.evict(name).is_some() {
            warn!("描述被移除, 丢弃已缓存的单例: {}", name);
            self.creation_order.lock().retain(|n| n != name);
        }
        Ok(())
    }

    /// 是否存在给定名称的描述
    pub fn contains_description(&self, name: &str) -> bool {
        self.descriptions.contains(name)
    }

    /// 按注册顺序列出所有描述名称
    pub fn description_names(&self) -> Vec<String> {
        self.descriptions.names()
    }

    /// 描述数量
    pub fn description_count(&self) -> usize {
        self.descriptions.count()
    }

    /// 名称是否已被占用（规范名或别名）
    pub fn is_name_in_use(&self, name: &str) -> bool {
        self.aliases.is_alias(name) || self.descriptions.contains(name)
    }

    /// 注册别名 `alias -> name`
    pub fn register_alias(&self, name: &str, alias: &str) -> RegistryResult<()> {
        if self.descriptions.contains(alias) {
            return Err(RegistryError::AliasConflict {
                name: name.to_string(),
                alias: alias.to_string(),
                reason: "别名遮蔽了已注册的组件名".to_string(),
            });
        }
        self.aliases.register(name, alias)
    }

    /// 移除别名
    pub fn remove_alias(&self, alias: &str) -> RegistryResult<()> {
        self.aliases.remove(alias)
    }

    /// 解析名称或别名为规范名
    pub fn resolve_name(&self, name_or_alias: &str) -> String {
        self.aliases.resolve(name_or_alias)
    }

    /// 给定名称是否是别名
    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.is_alias(name)
    }

    /// 枚举指向给定规范名的所有别名
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        self.aliases.aliases_of(name)
    }

    // --- 扩展点登记 ---

    /// 登记描述后置处理器, 按登记顺序在准备期执行
    pub fn add_description_post_processor(&self, processor: Arc<dyn DescriptionPostProcessor>) {
        self.post_processors.write().push(processor);
    }

    /// 登记构造后钩子, 按登记顺序执行
    pub fn add_post_construction_hook(&self, hook: Arc<dyn PostConstructionHook>) {
        self.post_hooks.write().push(hook);
    }

    /// 登记销毁前钩子, 关闭时按登记逆序执行
    pub fn add_destruction_hook(&self, hook: Arc<dyn DestructionHook>) {
        self.destruction_hooks.write().push(hook);
    }

    /// 为组件登记构造拦截器, 在构造后钩子节点织入
    ///
    /// 重复登记会替换该组件原有的拦截器列表。
    pub fn attach_interceptors(&self, name: &str, interceptors: Vec<Arc<dyn Interceptor>>) {
        let canonical = self.resolve_name(name);
        debug!(
            "登记构造拦截器: {} ({} 个)",
            canonical,
            interceptors.len()
        );
        self.interceptors.write().insert(canonical, interceptors);
    }

    // --- 生命周期 ---

    /// 准备容器: 冻结描述, 按拓扑顺序急切实例化单例
    ///
    /// 从 `Ready` 再次调用视为刷新, 先拆除上一代单例再重建, 未被
    /// 替换的描述全部保留。准备失败时拆除本代已建出的单例并回到
    /// `Uninitialized`, 修正配置后可以重试。
    pub fn prepare(&self) -> ResolutionResult<()> {
        let previous = self.state();
        if !previous.can_prepare() {
            return Err(ResolutionError::ContainerUnavailable {
                state: previous.to_string(),
            });
        }
        if previous == ContainerState::Ready {
            info!("容器刷新: 拆除上一代单例");
            self.teardown_generation();
            self.descriptions.unfreeze();
        }
        *self.state.write() = ContainerState::Preparing;

        match self.prepare_inner() {
            Ok(()) => {
                *self.state.write() = ContainerState::Ready;
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                *self.prepared_at.lock() = Some(chrono::Utc::now());
                info!("容器就绪: id={}, 代次={}", self.id, generation);
                Ok(())
            }
            Err(err) => {
                warn!("容器准备失败, 拆除本代单例: {}", err);
                self.teardown_generation();
                self.descriptions.unfreeze();
                *self.state.write() = ContainerState::Uninitialized;
                Err(err)
            }
        }
    }

    fn prepare_inner(&self) -> ResolutionResult<()> {
        let processors = self.post_processors.read().clone();
        for processor in processors {
            debug!("执行描述后置处理器: {}", processor.name());
            processor.post_process(&self.descriptions)?;
        }
        self.descriptions.freeze();

        let eager = self.resolver.eager_order(&self.descriptions, &self.aliases)?;
        info!("开始急切实例化 {} 个单例", eager.len());
        for name in &eager {
            self.get(name)?;
        }
        Ok(())
    }

    /// 刷新容器: 拆除上一代单例后重建
    pub fn refresh(&self) -> ResolutionResult<()> {
        info!("刷新容器: {}", self.id);
        self.prepare()
    }

    /// 关闭容器, 按创建逆序释放全部单例
    pub fn close(&self) {
        {
            let mut state = self.state.write();
            if *state == ContainerState::Closed {
                return;
            }
            *state = ContainerState::Closed;
        }
        self.teardown_generation();
        info!("容器已关闭: {}", self.id);
    }

    fn teardown_generation(&self) {
        let names: Vec<String> = {
            let mut order = self.creation_order.lock();
            let names = order.clone();
            order.clear();
            names
        };
        let hooks = self.destruction_hooks.read().clone();
        for name in names.iter().rev() {
            if let Some(instance) = self.cache.evict(name) {
                for hook in hooks.iter().rev() {
                    hook.before_destruction(name, &instance);
                }
                if let Ok(merged) = self.descriptions.merged(name) {
                    if let Some(destroy) = &merged.destroy {
                        if let Err(err) = destroy(&instance) {
                            warn!("销毁回调失败: {}, 原因: {}", name, err);
                        }
                    }
                }
                debug!("释放单例: {}", name);
            }
        }
        self.cache.clear();
        self.pending_fills.lock().clear();
    }

    // --- 解析 ---

    /// 解析组件实例
    ///
    /// 别名折算为规范名; 单例命中缓存直接返回, 否则按需递归实现
    /// 依赖、调用配方并走完构造管线。实例化循环与构造失败只中止
    /// 本次调用, 不污染实例缓存。
    pub fn get(&self, name: &str) -> ResolutionResult<ComponentInstance> {
        let state = self.state();
        if !state.can_serve() {
            self.failed_resolutions.fetch_add(1, Ordering::Relaxed);
            return Err(ResolutionError::ContainerUnavailable {
                state: state.to_string(),
            });
        }
        let canonical = self.resolve_name(name);
        let mut ctx = ResolveContext::default();
        match self.realize(&canonical, &mut ctx) {
            Ok(instance) => {
                self.completed_resolutions.fetch_add(1, Ordering::Relaxed);
                Ok(instance)
            }
            Err(err) => {
                self.failed_resolutions.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// 解析组件实例并下转型为具体类型
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> ResolutionResult<Arc<T>> {
        self.get(name)?
            .downcast::<T>()
            .map_err(|_| ResolutionError::TypeMismatch {
                name: name.to_string(),
            })
    }

    /// 容器统计快照
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            registered_descriptions: self.descriptions.count(),
            active_singletons: self.cache.active_count(),
            completed_resolutions: self.completed_resolutions.load(Ordering::Relaxed),
            failed_resolutions: self.failed_resolutions.load(Ordering::Relaxed),
        }
    }

    fn realize(
        &self,
        canonical: &str,
        ctx: &mut ResolveContext,
    ) -> ResolutionResult<ComponentInstance> {
        if ctx.path.len() >= self.config.max_resolution_depth {
            return Err(ResolutionError::DepthExceeded {
                name: canonical.to_string(),
                limit: self.config.max_resolution_depth,
            });
        }

        let merged = match self.descriptions.merged(canonical) {
            Ok(merged) => merged,
            Err(RegistryError::DescriptionNotFound { name }) => {
                return Err(ResolutionError::NoSuchComponent { name });
            }
            Err(other) => return Err(other.into()),
        };
        if merged.is_abstract {
            return Err(ResolutionError::CannotInstantiateAbstract {
                name: canonical.to_string(),
            });
        }

        let scope = merged.scope();
        if let Scope::Custom(custom) = &scope {
            debug!("自定义作用域 {} 按原型处理: {}", custom, canonical);
        }
        self.cache
            .get_or_create(canonical, &scope, || self.build(canonical, &merged, ctx))
    }

    fn build(
        &self,
        name: &str,
        merged: &ComponentDescription,
        ctx: &mut ResolveContext,
    ) -> ResolutionResult<ComponentInstance> {
        ctx.path.push(name.to_string());
        let result = self.build_inner(name, merged, ctx);
        ctx.path.pop();
        if result.is_err() {
            self.pending_fills.lock().remove(name);
        }
        result
    }

    fn build_inner(
        &self,
        name: &str,
        merged: &ComponentDescription,
        ctx: &mut ResolveContext,
    ) -> ResolutionResult<ComponentInstance> {
        debug!("构造组件: {}", name);

        // 顺序依赖先行完成; 构造参数环在这里提前失败, 属性环留待
        // 属性注入阶段以延迟引用化解
        for request in self.extractor.extract(merged) {
            let dep = self.resolve_name(&request.name);
            let on_path = ctx.path.iter().any(|n| n == &dep);
            match request.kind {
                DependencyKind::Ordering => {
                    if on_path {
                        return Err(self.instantiation_cycle(ctx, &dep, request.kind));
                    }
                    self.realize(&dep, ctx)?;
                }
                DependencyKind::Constructor => {
                    if on_path {
                        return Err(self.instantiation_cycle(ctx, &dep, request.kind));
                    }
                }
                DependencyKind::Property => {}
            }
        }

        let recipe =
            merged
                .recipe
                .as_ref()
                .ok_or_else(|| ResolutionError::ConstructionFailure {
                    name: name.to_string(),
                    source: "组件描述缺少工厂配方".into(),
                })?;
        let raw = self.invoke_recipe(name, recipe, ctx)?;
        self.apply_properties(name, merged, &raw, ctx)?;

        if let Some(init) = &merged.init {
            init(&raw).map_err(|source| ResolutionError::ConstructionFailure {
                name: name.to_string(),
                source,
            })?;
        }

        // 构造后钩子按登记顺序执行, 钩子返回的实例取代原实例
        let hooks = self.post_hooks.read().clone();
        let mut instance = raw;
        for hook in hooks {
            instance = hook
                .after_construction(name, instance)
                .map_err(|source| ResolutionError::ConstructionFailure {
                    name: name.to_string(),
                    source,
                })?;
        }

        // 构造拦截链织入, 最后一个拦截器返回的实例才是真正入缓存的对象
        let attached = self.interceptors.read().get(name).cloned();
        if let Some(interceptors) = attached {
            if !interceptors.is_empty() {
                instance = self.weave_construction(name, instance, interceptors)?;
            }
        }

        if merged.is_singleton() {
            self.creation_order.lock().push(name.to_string());
        }

        // 回填指向本组件的延迟引用
        if let Some(cells) = self.pending_fills.lock().remove(name) {
            for cell in cells {
                if let Err(err) = cell.fill(instance.clone()) {
                    warn!("延迟引用回填失败: {}", err);
                }
            }
        }

        Ok(instance)
    }

    fn instantiation_cycle(
        &self,
        ctx: &ResolveContext,
        offender: &str,
        kind: DependencyKind,
    ) -> ResolutionError {
        let mut stack = ctx.path.clone();
        stack.push(offender.to_string());
        ResolutionError::CircularInstantiation {
            stack: format!("{} ({:?} 依赖不可延迟)", stack.join(" -> "), kind),
        }
    }

    fn invoke_recipe(
        &self,
        name: &str,
        recipe: &Recipe,
        ctx: &mut ResolveContext,
    ) -> ResolutionResult<ComponentInstance> {
        let produced = match recipe {
            Recipe::Constructor {
                construct,
                arguments,
            } => {
                let args = self.realize_arguments(arguments, ctx)?;
                construct(args)
            }
            Recipe::StaticFactory { factory, arguments } => {
                let args = self.realize_arguments(arguments, ctx)?;
                factory(args)
            }
            Recipe::InstanceFactory {
                factory_component,
                invoke,
                arguments,
            } => {
                let owner_name = self.resolve_name(factory_component);
                if ctx.path.iter().any(|n| n == &owner_name) {
                    return Err(self.instantiation_cycle(
                        ctx,
                        &owner_name,
                        DependencyKind::Constructor,
                    ));
                }
                let owner = self.realize(&owner_name, ctx)?;
                let args = self.realize_arguments(arguments, ctx)?;
                invoke(&owner, args)
            }
            Recipe::Supplied { supplier } => supplier(),
        };
        produced.map_err(|source| ResolutionError::ConstructionFailure {
            name: name.to_string(),
            source,
        })
    }

    fn realize_arguments(
        &self,
        specs: &[ArgumentSpec],
        ctx: &mut ResolveContext,
    ) -> ResolutionResult<ResolvedArguments> {
        let mut values = Vec::with_capacity(specs.len());
        for spec in specs {
            let value = match spec {
                ArgumentSpec::Value(literal) => ResolvedValue::Literal(literal.clone()),
                ArgumentSpec::Reference(reference) => {
                    let dep = self.resolve_name(reference);
                    if ctx.path.iter().any(|n| n == &dep) {
                        return Err(self.instantiation_cycle(
                            ctx,
                            &dep,
                            DependencyKind::Constructor,
                        ));
                    }
                    ResolvedValue::Instance(self.realize(&dep, ctx)?)
                }
            };
            values.push(value);
        }
        Ok(ResolvedArguments::new(values))
    }

    fn apply_properties(
        &self,
        name: &str,
        merged: &ComponentDescription,
        instance: &ComponentInstance,
        ctx: &mut ResolveContext,
    ) -> ResolutionResult<()> {
        if merged.properties.is_empty() {
            return Ok(());
        }
        let applier =
            merged
                .property_applier
                .as_ref()
                .ok_or_else(|| ResolutionError::ConstructionFailure {
                    name: name.to_string(),
                    source: "声明了属性规格但缺少属性注入函数".into(),
                })?;

        for property in &merged.properties {
            let value = match &property.value {
                ArgumentSpec::Value(literal) => ResolvedValue::Literal(literal.clone()),
                ArgumentSpec::Reference(reference) => {
                    let dep = self.resolve_name(reference);
                    if ctx.path.iter().any(|n| n == &dep) {
                        // 属性环以延迟引用化解, 目标构造完成后回填
                        let cell = DeferredRef::new(&dep);
                        self.pending_fills
                            .lock()
                            .entry(dep.clone())
                            .or_default()
                            .push(cell.clone());
                        debug!("属性循环引用延迟填充: {} -> {}", name, dep);
                        ResolvedValue::Deferred(cell)
                    } else {
                        ResolvedValue::Instance(self.realize(&dep, ctx)?)
                    }
                }
            };
            applier(instance, &property.name, value).map_err(|source| {
                ResolutionError::ConstructionFailure {
                    name: name.to_string(),
                    source,
                }
            })?;
        }
        Ok(())
    }

    fn weave_construction(
        &self,
        name: &str,
        raw: ComponentInstance,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> ResolutionResult<ComponentInstance> {
        debug!("织入构造拦截链: {} ({} 个拦截器)", name, interceptors.len());
        let produced = raw.clone();
        let target: TargetFn =
            Arc::new(move |_descriptor, _arguments| Ok(Box::new(produced.clone()) as CallValue));
        let chain = InterceptionChain::build(InvocationKind::Construction, name, target, interceptors);
        let value =
            chain
                .invoke(None, Vec::new())
                .map_err(|err| ResolutionError::ConstructionFailure {
                    name: name.to_string(),
                    source: Box::new(err),
                })?;
        match value.downcast::<ComponentInstance>() {
            Ok(instance) => Ok(*instance),
            Err(_) => Err(ResolutionError::ConstructionFailure {
                name: name.to_string(),
                source: "构造拦截器返回了非组件实例".into(),
            }),
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("descriptions", &self.descriptions.count())
            .field("active_singletons", &self.cache.active_count())
            .finish()
    }
}
