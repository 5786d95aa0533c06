//! 实例缓存
//!
//! 按作用域存放已构造的实例。单例作用域以"每名称构造标记"保证
//! 至多构造一次: 首个调用者持标记执行工厂, 并发调用者阻塞到标记
//! 清除, 然后拿到缓存实例或重放原始失败。原型作用域每次直通工厂,
//! 不缓存也不阻塞。不同名称的构造互不串行。

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ioc_common::{ComponentInstance, ResolutionError, ResolutionResult, Scope};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::{debug, warn};

/// 构造失败通知, 供全部等待者重放原始失败
#[derive(Debug)]
struct ConstructionNotice {
    component: String,
    message: String,
}

/// 构造标记状态
enum MarkerState {
    /// 构造进行中
    Building,
    /// 构造成功
    Done(ComponentInstance),
    /// 构造失败
    Failed(Arc<ConstructionNotice>),
}

/// 每名称构造标记
struct ConstructionMarker {
    state: Mutex<MarkerState>,
    cond: Condvar,
}

impl ConstructionMarker {
    fn new() -> Self {
        Self {
            state: Mutex::new(MarkerState::Building),
            cond: Condvar::new(),
        }
    }

    fn complete(&self, result: Result<ComponentInstance, Arc<ConstructionNotice>>) {
        let mut state = self.state.lock();
        *state = match result {
            Ok(instance) => MarkerState::Done(instance),
            Err(notice) => MarkerState::Failed(notice),
        };
        self.cond.notify_all();
    }

    fn wait(&self) -> Result<ComponentInstance, Arc<ConstructionNotice>> {
        let mut state = self.state.lock();
        while matches!(*state, MarkerState::Building) {
            self.cond.wait(&mut state);
        }
        match &*state {
            MarkerState::Done(instance) => Ok(instance.clone()),
            MarkerState::Failed(notice) => Err(notice.clone()),
            MarkerState::Building => unreachable!("等待结束时状态仍为构造中"),
        }
    }
}

/// 单例槽位
enum SingletonSlot {
    /// 构造进行中, 持有标记供等待者阻塞
    InProgress(Arc<ConstructionMarker>),
    /// 已发布的实例
    Ready(ComponentInstance),
}

/// 认领守卫
///
/// 认领者若在发布前离开（包括工厂内部展开）, 槽位被清除并唤醒
/// 等待者, 避免留下永远清不掉的标记。
struct ClaimGuard<'a> {
    cache: &'a InstanceCache,
    name: &'a str,
    marker: Arc<ConstructionMarker>,
    armed: bool,
}

impl ClaimGuard<'_> {
    fn publish(mut self, instance: ComponentInstance) {
        self.armed = false;
        self.cache
            .singletons
            .insert(self.name.to_string(), SingletonSlot::Ready(instance.clone()));
        self.marker.complete(Ok(instance));
        debug!("发布单例实例: {}", self.name);
    }

    fn abandon(mut self, message: String) {
        self.armed = false;
        self.cache.singletons.remove(self.name);
        self.marker.complete(Err(Arc::new(ConstructionNotice {
            component: self.name.to_string(),
            message,
        })));
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("单例构造中止, 清除构造标记: {}", self.name);
            self.cache.singletons.remove(self.name);
            self.marker.complete(Err(Arc::new(ConstructionNotice {
                component: self.name.to_string(),
                message: "构造过程被中止".to_string(),
            })));
        }
    }
}

/// 实例缓存
#[derive(Default)]
pub struct InstanceCache {
    singletons: DashMap<String, SingletonSlot>,
}

impl InstanceCache {
    /// 创建空缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出或构造实例
    ///
    /// 单例作用域走"检查-构造-发布"协议; 其余作用域直通工厂。失败的
    /// 构造不会被缓存, 修正配置后重试可以成功。
    pub fn get_or_create<F>(
        &self,
        name: &str,
        scope: &Scope,
        factory: F,
    ) -> ResolutionResult<ComponentInstance>
    where
        F: FnOnce() -> ResolutionResult<ComponentInstance>,
    {
        if !scope.is_singleton() {
            return factory();
        }

        enum Step {
            Hit(ComponentInstance),
            Wait(Arc<ConstructionMarker>),
            Claimed(Arc<ConstructionMarker>),
        }

        // 槽位判定持有分片锁, 工厂执行在锁外进行
        let step = match self.singletons.entry(name.to_string()) {
            Entry::Occupied(slot) => match slot.get() {
                SingletonSlot::Ready(instance) => Step::Hit(instance.clone()),
                SingletonSlot::InProgress(marker) => Step::Wait(marker.clone()),
            },
            Entry::Vacant(vacant) => {
                let marker = Arc::new(ConstructionMarker::new());
                vacant.insert(SingletonSlot::InProgress(marker.clone()));
                Step::Claimed(marker)
            }
        };

        match step {
            Step::Hit(instance) => Ok(instance),
            Step::Wait(marker) => match marker.wait() {
                Ok(instance) => Ok(instance),
                Err(notice) => Err(ResolutionError::ConstructionFailure {
                    name: notice.component.clone(),
                    source: notice.message.clone().into(),
                }),
            },
            Step::Claimed(marker) => {
                let guard = ClaimGuard {
                    cache: self,
                    name,
                    marker,
                    armed: true,
                };
                match factory() {
                    Ok(instance) => {
                        guard.publish(instance.clone());
                        Ok(instance)
                    }
                    Err(err) => {
                        guard.abandon(err.to_string());
                        Err(err)
                    }
                }
            }
        }
    }

    /// 逐出已发布的单例, 返回被逐出的实例
    ///
    /// 只在拆除或显式替换描述时使用; 构造中的槽位不受影响。
    pub fn evict(&self, name: &str) -> Option<ComponentInstance> {
        let removed = self
            .singletons
            .remove_if(name, |_, slot| matches!(slot, SingletonSlot::Ready(_)));
        match removed {
            Some((_, SingletonSlot::Ready(instance))) => Some(instance),
            _ => None,
        }
    }

    /// 非阻塞探测: 是否存在已发布的实例
    pub fn contains_instance(&self, name: &str) -> bool {
        self.singletons
            .get(name)
            .map(|slot| matches!(slot.value(), SingletonSlot::Ready(_)))
            .unwrap_or(false)
    }

    /// 已发布的单例数量
    pub fn active_count(&self) -> usize {
        self.singletons
            .iter()
            .filter(|entry| matches!(entry.value(), SingletonSlot::Ready(_)))
            .count()
    }

    /// 清空缓存（拆除时使用）
    pub fn clear(&self) {
        self.singletons.clear();
    }
}

impl std::fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCache")
            .field("active", &self.active_count())
            .finish()
    }
}
