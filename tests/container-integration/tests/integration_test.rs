//! Centralized integration tests for the container core (migrated)

use ioc_common::{
    ArgumentSpec, BoxError, ComponentDescription, ComponentInstance, DestructionHook,
    PostConstructionHook, Recipe, RegistryError, RegistryResult, ResolutionError, ResolvedValue,
    Scope,
};
use ioc_container::{
    Container, ContainerBuilder, ContainerConfig, DescriptionPostProcessor, DescriptionRegistry,
};
use ioc_interception::{CallValue, FnInterceptor, Interceptor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// 计数工厂的简单组件描述
fn counting_supplied(name: &str, calls: Arc<AtomicUsize>) -> ComponentDescription {
    let label = name.to_string();
    ComponentDescription::new(name).with_recipe(Recipe::supplied(move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(label.clone()) as ComponentInstance)
    }))
}

/// 测试组件: 仓储
#[derive(Debug)]
struct Repository {
    dsn: String,
}

/// 测试组件: 服务, 通过构造参数持有仓储
#[derive(Debug)]
struct Service {
    repository: Arc<Repository>,
}

fn repository_description() -> ComponentDescription {
    ComponentDescription::new("repository").with_recipe(Recipe::supplied(|| {
        Ok(Arc::new(Repository {
            dsn: "postgres://localhost/app".to_string(),
        }) as ComponentInstance)
    }))
}

fn service_description() -> ComponentDescription {
    ComponentDescription::new("service").with_recipe(Recipe::constructor(
        |args| {
            let repository = args.component::<Repository>(0)?;
            Ok(Arc::new(Service { repository }) as ComponentInstance)
        },
        vec![ArgumentSpec::reference("repository")],
    ))
}

#[test]
fn singleton_resolution_returns_identical_instance() {
    init_tracing();
    let container = Container::new(ContainerConfig::default());
    container.register_description(repository_description()).unwrap();
    container.register_description(service_description()).unwrap();
    container.prepare().unwrap();

    let first = container.get("service").unwrap();
    let second = container.get("service").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let service = container.get_as::<Service>("service").unwrap();
    assert_eq!(service.repository.dsn, "postgres://localhost/app");
}

#[test]
fn prototype_resolution_returns_fresh_instances() {
    let calls = Arc::new(AtomicUsize::new(0));
    let container = Container::new(ContainerConfig::default());
    container
        .register_description(
            counting_supplied("proto", calls.clone()).with_scope(Scope::Prototype),
        )
        .unwrap();
    container.prepare().unwrap();

    let first = container.get("proto").unwrap();
    let second = container.get("proto").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn concurrent_singleton_gets_construct_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let container = Arc::new(Container::new(ContainerConfig::default()));
    {
        let calls = calls.clone();
        container
            .register_description(
                ComponentDescription::new("shared")
                    .with_lazy(true)
                    .with_recipe(Recipe::supplied(move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        Ok(Arc::new(42_u64) as ComponentInstance)
                    })),
            )
            .unwrap();
    }
    container.prepare().unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let container = container.clone();
        handles.push(thread::spawn(move || container.get("shared").unwrap()));
    }
    let instances: Vec<ComponentInstance> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for instance in &instances[1..] {
        assert!(Arc::ptr_eq(&instances[0], instance));
    }
}

#[test]
fn alias_resolves_to_canonical_component() {
    let container = Container::new(ContainerConfig::default());
    container.register_description(repository_description()).unwrap();
    container.register_alias("repository", "repo").unwrap();
    container.prepare().unwrap();

    assert_eq!(container.resolve_name("repo"), "repository");
    assert!(container.is_alias("repo"));
    assert!(container.is_name_in_use("repo"));
    assert_eq!(container.aliases_of("repository"), vec!["repo"]);

    let by_alias = container.get("repo").unwrap();
    let by_name = container.get("repository").unwrap();
    assert!(Arc::ptr_eq(&by_alias, &by_name));
}

#[test]
fn alias_shadowing_conflicts_are_rejected() {
    let container = Container::new(ContainerConfig::default());
    container.register_description(repository_description()).unwrap();
    container.register_alias("repository", "repo").unwrap();

    // 别名不能再注册为组件名
    let err = container
        .register_description(ComponentDescription::new("repo"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::AliasConflict { .. }));

    // 组件名不能再注册为别名
    let err = container.register_alias("other", "repository").unwrap_err();
    assert!(matches!(err, RegistryError::AliasConflict { .. }));
}

#[test]
fn duplicate_description_requires_override_mode() {
    let calls = Arc::new(AtomicUsize::new(0));
    let strict = Container::new(ContainerConfig::default());
    strict
        .register_description(counting_supplied("svc", calls.clone()))
        .unwrap();
    let err = strict
        .register_description(counting_supplied("svc", calls.clone()))
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateComponent { .. }));
}

#[test]
fn override_mode_replaces_description_and_evicts_singleton() {
    let container = Container::new(ContainerConfig {
        allow_override: true,
        ..ContainerConfig::default()
    });
    container
        .register_description(
            ComponentDescription::new("svc")
                .with_recipe(Recipe::supplied(|| Ok(Arc::new(1_u64) as ComponentInstance))),
        )
        .unwrap();
    container.prepare().unwrap();
    assert_eq!(*container.get_as::<u64>("svc").unwrap(), 1);

    container
        .register_description(
            ComponentDescription::new("svc")
                .with_recipe(Recipe::supplied(|| Ok(Arc::new(2_u64) as ComponentInstance))),
        )
        .unwrap();
    // 替换后的描述立即生效, 旧单例被丢弃
    assert_eq!(*container.get_as::<u64>("svc").unwrap(), 2);
}

#[test]
fn depends_on_orders_eager_instantiation() {
    let log = Arc::new(Mutex::new(Vec::<String>::new()));
    let make = |name: &str, log: Arc<Mutex<Vec<String>>>| {
        let label = name.to_string();
        ComponentDescription::new(name).with_recipe(Recipe::supplied(move || {
            log.lock().unwrap().push(label.clone());
            Ok(Arc::new(()) as ComponentInstance)
        }))
    };

    let container = Container::new(ContainerConfig::default());
    container
        .register_description(make("a", log.clone()).with_dependency("b"))
        .unwrap();
    container.register_description(make("b", log.clone())).unwrap();
    container.prepare().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["b", "a"]);
}

#[test]
fn abstract_template_is_not_instantiable_but_children_inherit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let container = Container::new(ContainerConfig::default());
    container
        .register_description(
            ComponentDescription::new("template")
                .with_abstract(true)
                .with_scope(Scope::Prototype),
        )
        .unwrap();
    container
        .register_description(counting_supplied("worker", calls.clone()).with_parent("template"))
        .unwrap();
    container.prepare().unwrap();

    let err = container.get("template").unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::CannotInstantiateAbstract { .. }
    ));

    // 子描述继承了原型作用域
    let first = container.get("worker").unwrap();
    let second = container.get("worker").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// 测试组件: 互相引用的节点, 伙伴经属性注入
#[derive(Debug)]
struct Node {
    label: String,
    partner: Mutex<Option<ResolvedValue>>,
}

impl Node {
    fn partner_label(&self) -> String {
        match self.partner.lock().unwrap().as_ref() {
            Some(ResolvedValue::Instance(instance)) => instance
                .clone()
                .downcast::<Node>()
                .map(|n| n.label.clone())
                .unwrap_or_default(),
            Some(ResolvedValue::Deferred(cell)) => cell
                .component::<Node>()
                .map(|n| n.label.clone())
                .unwrap_or_default(),
            _ => String::new(),
        }
    }
}

fn node_description(name: &str, partner: &str) -> ComponentDescription {
    let label = name.to_string();
    ComponentDescription::new(name)
        .with_recipe(Recipe::supplied(move || {
            Ok(Arc::new(Node {
                label: label.clone(),
                partner: Mutex::new(None),
            }) as ComponentInstance)
        }))
        .with_property("partner", ArgumentSpec::reference(partner))
        .with_property_applier(Arc::new(|instance, _property, value| {
            let node = instance
                .clone()
                .downcast::<Node>()
                .map_err(|_| BoxError::from("不是 Node 实例"))?;
            *node.partner.lock().unwrap() = Some(value);
            Ok(())
        }))
}

#[test]
fn property_reference_cycle_resolves_through_deferred_refs() {
    init_tracing();
    let container = Container::new(ContainerConfig::default());
    container.register_description(node_description("a", "b")).unwrap();
    container.register_description(node_description("b", "a")).unwrap();
    container.prepare().unwrap();

    let a = container.get_as::<Node>("a").unwrap();
    let b = container.get_as::<Node>("b").unwrap();
    assert_eq!(a.partner_label(), "b");
    assert_eq!(b.partner_label(), "a");
}

#[test]
fn constructor_cycle_discovered_at_instantiation_is_fatal() {
    let ctor_ref = |name: &str, dep: &str| {
        ComponentDescription::new(name)
            .with_lazy(true)
            .with_recipe(Recipe::constructor(
                |args| {
                    let _dep = args.instance(0)?;
                    Ok(Arc::new(()) as ComponentInstance)
                },
                vec![ArgumentSpec::reference(dep)],
            ))
    };

    let container = Container::new(ContainerConfig::default());
    container
        .register_description(
            ComponentDescription::new("boot")
                .with_recipe(Recipe::supplied(|| Ok(Arc::new(()) as ComponentInstance))),
        )
        .unwrap();
    container.prepare().unwrap();

    // 热注册绕过了准备期的声明校验, 环在实例化期暴露
    container.register_description(ctor_ref("x", "y")).unwrap();
    container.register_description(ctor_ref("y", "x")).unwrap();

    let err = container.get("x").unwrap_err();
    match err {
        ResolutionError::CircularInstantiation { stack } => {
            assert!(stack.contains('x') && stack.contains('y'), "构造栈: {stack}");
        }
        other => panic!("意外的错误: {other}"),
    }
}

#[test]
fn declared_constructor_cycle_fails_prepare() {
    let ctor_ref = |name: &str, dep: &str| {
        ComponentDescription::new(name).with_recipe(Recipe::constructor(
            |args| {
                let _dep = args.instance(0)?;
                Ok(Arc::new(()) as ComponentInstance)
            },
            vec![ArgumentSpec::reference(dep)],
        ))
    };

    let container = Container::new(ContainerConfig::default());
    container.register_description(ctor_ref("a", "b")).unwrap();
    container.register_description(ctor_ref("b", "a")).unwrap();

    let err = container.prepare().unwrap_err();
    match err {
        ResolutionError::CircularDeclaration { cycle } => {
            assert!(cycle.contains('a') && cycle.contains('b'), "环路: {cycle}");
        }
        other => panic!("意外的错误: {other}"),
    }
    // 准备失败后仍可修正并重试
    container.remove_description("b").unwrap();
    container
        .register_description(
            ComponentDescription::new("b")
                .with_recipe(Recipe::supplied(|| Ok(Arc::new(()) as ComponentInstance))),
        )
        .unwrap();
    container.prepare().unwrap();
}

#[test]
fn failed_construction_is_retryable() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let container = Container::new(ContainerConfig::default());
    {
        let attempts = attempts.clone();
        container
            .register_description(
                ComponentDescription::new("flaky")
                    .with_lazy(true)
                    .with_recipe(Recipe::supplied(move || {
                        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err("数据库不可用".into())
                        } else {
                            Ok(Arc::new(7_u64) as ComponentInstance)
                        }
                    })),
            )
            .unwrap();
    }
    container.prepare().unwrap();

    let err = container.get("flaky").unwrap_err();
    assert!(matches!(err, ResolutionError::ConstructionFailure { .. }));
    assert_eq!(container.stats().active_singletons, 0);

    // 失败不会被缓存, 重试成功
    assert_eq!(*container.get_as::<u64>("flaky").unwrap(), 7);
}

#[test]
fn instance_factory_recipe_builds_through_owner_component() {
    /// 测试组件: 连接工厂
    #[derive(Debug)]
    struct ConnectionFactory {
        prefix: String,
    }
    /// 测试组件: 连接
    #[derive(Debug)]
    struct Connection {
        url: String,
    }

    let container = Container::new(ContainerConfig::default());
    container
        .register_description(
            ComponentDescription::new("conn-factory").with_recipe(Recipe::supplied(|| {
                Ok(Arc::new(ConnectionFactory {
                    prefix: "db://".to_string(),
                }) as ComponentInstance)
            })),
        )
        .unwrap();
    container
        .register_description(
            ComponentDescription::new("connection").with_recipe(Recipe::instance_factory(
                "conn-factory",
                |owner, args| {
                    let factory = owner
                        .clone()
                        .downcast::<ConnectionFactory>()
                        .map_err(|_| BoxError::from("不是 ConnectionFactory 实例"))?;
                    let host: String = args.literal_as(0)?;
                    Ok(Arc::new(Connection {
                        url: format!("{}{}", factory.prefix, host),
                    }) as ComponentInstance)
                },
                vec![ArgumentSpec::value("localhost")],
            )),
        )
        .unwrap();
    container.prepare().unwrap();

    let connection = container.get_as::<Connection>("connection").unwrap();
    assert_eq!(connection.url, "db://localhost");
}

#[test]
fn literal_arguments_and_properties_are_injected() -> anyhow::Result<()> {
    /// 测试组件: 配置化监听器
    #[derive(Debug)]
    struct Listener {
        port: u16,
        label: Mutex<String>,
    }

    let container = Container::new(ContainerConfig::default());
    container.register_description(
        ComponentDescription::new("listener")
            .with_recipe(Recipe::static_factory(
                |args| {
                    let port: u16 = args.literal_as(0)?;
                    Ok(Arc::new(Listener {
                        port,
                        label: Mutex::new(String::new()),
                    }) as ComponentInstance)
                },
                vec![ArgumentSpec::Value(serde_json::json!(8080))],
            ))
            .with_property("label", ArgumentSpec::value("边缘节点"))
            .with_property_applier(Arc::new(|instance, property, value| {
                let listener = instance
                    .clone()
                    .downcast::<Listener>()
                    .map_err(|_| BoxError::from("不是 Listener 实例"))?;
                match (property, value) {
                    ("label", ResolvedValue::Literal(v)) => {
                        *listener.label.lock().unwrap() =
                            v.as_str().unwrap_or_default().to_string();
                        Ok(())
                    }
                    (other, _) => Err(format!("未知属性: {other}").into()),
                }
            })),
    )?;
    container.prepare()?;

    let listener = container.get_as::<Listener>("listener")?;
    assert_eq!(listener.port, 8080);
    assert_eq!(*listener.label.lock().unwrap(), "边缘节点");
    Ok(())
}

/// 构造后钩子: 把指定组件包进审计外壳
#[derive(Debug)]
struct Audited {
    inner: ComponentInstance,
}

struct AuditHook;

impl PostConstructionHook for AuditHook {
    fn name(&self) -> &str {
        "audit"
    }

    fn after_construction(
        &self,
        component: &str,
        instance: ComponentInstance,
    ) -> Result<ComponentInstance, BoxError> {
        if component == "plain" {
            Ok(Arc::new(Audited { inner: instance }))
        } else {
            Ok(instance)
        }
    }
}

#[test]
fn post_construction_hook_may_substitute_instance() {
    let container = Container::new(ContainerConfig::default());
    container.add_post_construction_hook(Arc::new(AuditHook));
    container
        .register_description(
            ComponentDescription::new("plain")
                .with_recipe(Recipe::supplied(|| Ok(Arc::new(7_u64) as ComponentInstance))),
        )
        .unwrap();
    container.prepare().unwrap();

    let audited = container.get_as::<Audited>("plain").unwrap();
    assert_eq!(*audited.inner.clone().downcast::<u64>().unwrap(), 7);
}

#[test]
fn construction_interceptors_observe_and_substitute() {
    /// 测试组件: 引擎
    #[derive(Debug)]
    struct Engine {
        horsepower: u32,
    }

    let log = Arc::new(Mutex::new(Vec::<String>::new()));
    let observing: Arc<dyn Interceptor> = {
        let log = log.clone();
        Arc::new(FnInterceptor::new("observe", move |invocation| {
            log.lock().unwrap().push("before".to_string());
            let result = invocation.proceed();
            log.lock().unwrap().push("after".to_string());
            result
        }))
    };
    let substituting: Arc<dyn Interceptor> = Arc::new(FnInterceptor::new(
        "substitute",
        |invocation| {
            let _raw = invocation.proceed()?;
            Ok(Box::new(Arc::new(Engine { horsepower: 0 }) as ComponentInstance) as CallValue)
        },
    ));

    let container = Container::new(ContainerConfig::default());
    container
        .register_description(
            ComponentDescription::new("engine").with_recipe(Recipe::supplied(|| {
                Ok(Arc::new(Engine { horsepower: 200 }) as ComponentInstance)
            })),
        )
        .unwrap();
    container.attach_interceptors("engine", vec![observing, substituting]);
    container.prepare().unwrap();

    // 最后一个拦截器返回的实例才是入缓存的对象
    let engine = container.get_as::<Engine>("engine").unwrap();
    assert_eq!(engine.horsepower, 0);
    assert_eq!(*log.lock().unwrap(), vec!["before", "after"]);

    let again = container.get_as::<Engine>("engine").unwrap();
    assert!(Arc::ptr_eq(&engine, &again));
}

/// 描述后置处理器: 把 svc 改写为原型作用域
struct ScopeRewriter;

impl DescriptionPostProcessor for ScopeRewriter {
    fn name(&self) -> &str {
        "scope-rewriter"
    }

    fn post_process(&self, registry: &DescriptionRegistry) -> RegistryResult<()> {
        let description = registry.remove("svc")?;
        registry.put((*description).clone().with_scope(Scope::Prototype))?;
        Ok(())
    }
}

#[test]
fn description_post_processors_run_before_instantiation() {
    let container = ContainerBuilder::new()
        .register_description(
            ComponentDescription::new("svc")
                .with_recipe(Recipe::supplied(|| Ok(Arc::new(0_u64) as ComponentInstance))),
        )
        .add_description_post_processor(Arc::new(ScopeRewriter))
        .build()
        .unwrap();
    container.prepare().unwrap();

    let first = container.get("svc").unwrap();
    let second = container.get("svc").unwrap();
    assert!(!Arc::ptr_eq(&first, &second), "改写后的作用域应为原型");
}

/// 销毁前钩子: 记录拆除顺序
struct TeardownRecorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl DestructionHook for TeardownRecorder {
    fn name(&self) -> &str {
        "teardown-recorder"
    }

    fn before_destruction(&self, component: &str, _instance: &ComponentInstance) {
        self.log.lock().unwrap().push(format!("hook:{component}"));
    }
}

#[test]
fn close_releases_singletons_in_reverse_creation_order() {
    let log = Arc::new(Mutex::new(Vec::<String>::new()));
    let make = |name: &str, log: Arc<Mutex<Vec<String>>>| {
        let label = name.to_string();
        ComponentDescription::new(name)
            .with_recipe(Recipe::supplied(|| Ok(Arc::new(()) as ComponentInstance)))
            .with_destroy(move |_instance| {
                log.lock().unwrap().push(format!("destroy:{label}"));
                Ok(())
            })
    };

    let container = Container::new(ContainerConfig::default());
    container.add_destruction_hook(Arc::new(TeardownRecorder { log: log.clone() }));
    container.register_description(make("repo", log.clone())).unwrap();
    container
        .register_description(make("service", log.clone()).with_dependency("repo"))
        .unwrap();
    container.prepare().unwrap();
    container.close();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "hook:service",
            "destroy:service",
            "hook:repo",
            "destroy:repo"
        ]
    );
}

#[test]
fn refresh_rebuilds_singletons_and_keeps_descriptions() {
    let calls = Arc::new(AtomicUsize::new(0));
    let container = Container::new(ContainerConfig::default());
    container
        .register_description(counting_supplied("svc", calls.clone()))
        .unwrap();
    container.prepare().unwrap();
    let first = container.get("svc").unwrap();

    container.refresh().unwrap();
    let second = container.get("svc").unwrap();

    assert!(!Arc::ptr_eq(&first, &second), "刷新后应重建单例");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(container.generation(), 2);
    assert_eq!(container.description_count(), 1);
}

#[test]
fn registry_surface_reports_names_and_counts() -> anyhow::Result<()> {
    let container = Container::new(ContainerConfig::default());
    container.register_description(repository_description())?;
    container.register_description(service_description())?;

    assert_eq!(container.description_count(), 2);
    assert_eq!(container.description_names(), vec!["repository", "service"]);
    assert!(container.contains_description("repository"));
    assert!(!container.contains_description("ghost"));
    assert!(container.is_name_in_use("service"));

    container.remove_description("service")?;
    assert!(!container.contains_description("service"));
    assert!(matches!(
        container.remove_description("service"),
        Err(RegistryError::DescriptionNotFound { .. })
    ));

    let err = container.get("service").unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::ContainerUnavailable { .. } | ResolutionError::NoSuchComponent { .. }
    ));
    Ok(())
}

#[test]
fn missing_component_is_distinguishable() {
    let container = Container::new(ContainerConfig::default());
    container.register_description(repository_description()).unwrap();
    container.prepare().unwrap();

    assert!(matches!(
        container.get("ghost"),
        Err(ResolutionError::NoSuchComponent { .. })
    ));
}

#[test]
fn lazy_components_are_built_on_first_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let container = Container::new(ContainerConfig::default());
    container
        .register_description(counting_supplied("lazy-svc", calls.clone()).with_lazy(true))
        .unwrap();
    container.prepare().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0, "懒加载组件不应被急切实例化");
    container.get("lazy-svc").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
