// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Hook dispatcher for running every plugin attached to a hook kind.

use super::client::HookClient;
use super::config::{FailurePolicy, PluginsConfig};
use super::handlers::LifecycleHook;
use super::kind::{HookKind, HookOutcome, PostCreate, PostDelete, PreCreate, PreDelete};
use super::registry::{HookPriority, HookRegistry, RegisteredHook, RegistryError};
use crate::error::PluginResult;
use std::sync::Arc;
use std::time::Instant;

/// Result of dispatching one stack event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Hook kind that was dispatched.
    pub kind: &'static str,
    pub stack: String,
    /// One entry per hook that ran, in execution order.
    pub invocations: Vec<HookInvocation>,
    /// First hook that vetoed the operation.
    pub vetoed_by: Option<String>,
    /// Total dispatch time in microseconds.
    pub total_time_us: u64,
}

impl DispatchReport {
    /// Whether the operation must be aborted.
    pub fn aborted(&self) -> bool {
        self.vetoed_by.is_some()
    }

    pub fn veto_count(&self) -> usize {
        self.invocations.iter().filter(|i| i.vetoed).count()
    }
}

/// Record of a single hook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInvocation {
    pub hook_id: String,
    pub vetoed: bool,
    /// Execution time in microseconds.
    pub execution_time_us: u64,
}

/// Dispatcher for the hooks of kind `K`.
///
/// Hooks run one after another in priority order (lower values first). A pre
/// hook veto stops the chain when `stop_on_veto` is set; otherwise every hook
/// runs and any veto aborts. Post hooks never veto, so all of them run.
pub struct HookDispatcher<K: HookKind> {
    registry: Arc<HookRegistry<K>>,
    stop_on_veto: bool,
}

impl<K: HookKind> HookDispatcher<K> {
    pub fn new(registry: Arc<HookRegistry<K>>) -> Self {
        Self {
            registry,
            stop_on_veto: true,
        }
    }

    pub fn with_stop_on_veto(mut self, stop_on_veto: bool) -> Self {
        self.stop_on_veto = stop_on_veto;
        self
    }

    /// Build a dispatcher over lazily connected clients for the configured
    /// plugins of this kind.
    pub fn from_config(config: &PluginsConfig) -> PluginResult<Self> {
        let registry = Arc::new(HookRegistry::new());
        for plugin in config.plugins_for(K::ID) {
            let client = HookClient::<K>::connect_lazy(
                &plugin.endpoint_config(&config.endpoint_defaults),
            )?
            .with_policy(config.failure_policy)
            .with_name(plugin.name.clone());
            registry.register_hook(
                RegisteredHook::new(plugin.name.clone(), client)
                    .with_priority(HookPriority(plugin.priority)),
            )?;
        }
        Ok(Self::new(registry).with_stop_on_veto(config.stop_on_veto))
    }

    /// Run every active hook for `stack`.
    pub async fn dispatch(&self, stack: &str) -> DispatchReport {
        let start = Instant::now();
        let hooks = self.registry.active_hooks();

        tracing::debug!(
            kind = K::NAME,
            stack = %stack,
            hook_count = hooks.len(),
            "Dispatching stack event to hooks"
        );

        let mut invocations = Vec::with_capacity(hooks.len());
        let mut vetoed_by = None;

        for hook in hooks {
            let hook_start = Instant::now();
            let vetoed = hook.hook.execute(stack).await.vetoes();

            invocations.push(HookInvocation {
                hook_id: hook.id.clone(),
                vetoed,
                execution_time_us: hook_start.elapsed().as_micros() as u64,
            });

            if vetoed {
                tracing::info!(kind = K::NAME, stack = %stack, hook_id = %hook.id, "Hook vetoed operation");
                if vetoed_by.is_none() {
                    vetoed_by = Some(hook.id.clone());
                }
                if self.stop_on_veto {
                    break;
                }
            }
        }

        let total_time_us = start.elapsed().as_micros() as u64;

        tracing::debug!(
            kind = K::NAME,
            stack = %stack,
            total_time_us = total_time_us,
            aborted = vetoed_by.is_some(),
            "Stack event dispatch completed"
        );

        DispatchReport {
            kind: K::NAME,
            stack: stack.to_string(),
            invocations,
            vetoed_by,
            total_time_us,
        }
    }

    pub fn register(&self, hook: RegisteredHook<K>) -> Result<(), RegistryError> {
        self.registry.register_hook(hook)
    }

    pub fn registry(&self) -> &Arc<HookRegistry<K>> {
        &self.registry
    }

    pub fn stop_on_veto(&self) -> bool {
        self.stop_on_veto
    }
}

/// One dispatcher per hook kind, as used by the stack create and delete
/// commands.
pub struct LifecycleHooks {
    pub pre_create: HookDispatcher<PreCreate>,
    pub post_create: HookDispatcher<PostCreate>,
    pub pre_delete: HookDispatcher<PreDelete>,
    pub post_delete: HookDispatcher<PostDelete>,
    failure_policy: FailurePolicy,
}

impl Default for LifecycleHooks {
    fn default() -> Self {
        Self {
            pre_create: HookDispatcher::new(Arc::default()),
            post_create: HookDispatcher::new(Arc::default()),
            pre_delete: HookDispatcher::new(Arc::default()),
            post_delete: HookDispatcher::new(Arc::default()),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl LifecycleHooks {
    /// Connect lazily to every enabled plugin in `config`.
    pub fn from_config(config: &PluginsConfig) -> PluginResult<Self> {
        config.validate()?;
        let hooks = Self {
            pre_create: HookDispatcher::from_config(config)?,
            post_create: HookDispatcher::from_config(config)?,
            pre_delete: HookDispatcher::from_config(config)?,
            post_delete: HookDispatcher::from_config(config)?,
            failure_policy: config.failure_policy,
        };
        tracing::info!(
            pre_create = hooks.pre_create.registry().len(),
            post_create = hooks.post_create.registry().len(),
            pre_delete = hooks.pre_delete.registry().len(),
            post_delete = hooks.post_delete.registry().len(),
            policy = ?hooks.failure_policy,
            "Lifecycle hooks configured"
        );
        Ok(hooks)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Returns `false` when a PreCreate hook vetoed the create.
    pub async fn before_create(&self, stack: &str) -> bool {
        !self.pre_create.dispatch(stack).await.aborted()
    }

    pub async fn after_create(&self, stack: &str) {
        self.post_create.dispatch(stack).await;
    }

    /// Returns `false` when a PreDelete hook vetoed the delete.
    pub async fn before_delete(&self, stack: &str) -> bool {
        !self.pre_delete.dispatch(stack).await.aborted()
    }

    pub async fn after_delete(&self, stack: &str) {
        self.post_delete.dispatch(stack).await;
    }
}

#[cfg(test)]
mod tests {
    use super::super::config::PluginDefinition;
    use super::super::handlers::{from_fn, LoggingHook};
    use super::super::kind::HookKindId;
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording_hook(
        id: &'static str,
        priority: i32,
        veto: bool,
        order: Arc<Mutex<Vec<&'static str>>>,
    ) -> RegisteredHook<PreCreate> {
        RegisteredHook::new(
            id,
            from_fn::<PreCreate, _>(id, move |_| {
                order.lock().push(id);
                veto
            }),
        )
        .with_priority(HookPriority(priority))
    }

    #[tokio::test]
    async fn test_dispatch_no_hooks() {
        let dispatcher = HookDispatcher::<PreCreate>::new(Arc::default());
        let report = dispatcher.dispatch("stack").await;
        assert!(report.invocations.is_empty());
        assert!(!report.aborted());
        assert_eq!(report.kind, "PreCreate");
    }

    #[tokio::test]
    async fn test_dispatch_priority_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = HookDispatcher::<PreCreate>::new(Arc::default());
        for (id, priority) in [("hook3", 30), ("hook1", 10), ("hook2", 20)] {
            dispatcher
                .register(recording_hook(id, priority, false, order.clone()))
                .unwrap();
        }

        let report = dispatcher.dispatch("stack").await;
        assert_eq!(order.lock().as_slice(), &["hook1", "hook2", "hook3"]);
        assert!(!report.aborted());
    }

    #[tokio::test]
    async fn test_first_veto_stops_chain() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = HookDispatcher::<PreCreate>::new(Arc::default());
        dispatcher.register(recording_hook("guard", 10, true, order.clone())).unwrap();
        dispatcher.register(recording_hook("never", 20, false, order.clone())).unwrap();

        let report = dispatcher.dispatch("prod-stack-1").await;
        assert!(report.aborted());
        assert_eq!(report.vetoed_by.as_deref(), Some("guard"));
        assert_eq!(order.lock().as_slice(), &["guard"]);
    }

    #[tokio::test]
    async fn test_all_hooks_run_without_stop_on_veto() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let dispatcher =
            HookDispatcher::<PreCreate>::new(Arc::default()).with_stop_on_veto(false);
        dispatcher.register(recording_hook("first", 10, true, order.clone())).unwrap();
        dispatcher.register(recording_hook("second", 20, true, order.clone())).unwrap();
        dispatcher.register(recording_hook("third", 30, false, order.clone())).unwrap();

        let report = dispatcher.dispatch("stack").await;
        assert_eq!(order.lock().len(), 3);
        assert_eq!(report.vetoed_by.as_deref(), Some("first"));
        assert_eq!(report.veto_count(), 2);
    }

    #[tokio::test]
    async fn test_post_hooks_all_run() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = HookDispatcher::<PostDelete>::new(Arc::default());
        for id in ["a", "b"] {
            let count = count.clone();
            dispatcher
                .register(RegisteredHook::new(
                    id,
                    from_fn::<PostDelete, _>(id, move |_| {
                        count.fetch_add(1, Ordering::SeqCst);
                    }),
                ))
                .unwrap();
        }
        dispatcher
            .register(RegisteredHook::new("log", LoggingHook::new("log")))
            .unwrap();

        let report = dispatcher.dispatch("prod-stack-1").await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(report.invocations.len(), 3);
        assert!(!report.aborted());
    }

    #[tokio::test]
    async fn test_lifecycle_hooks_from_config_fail_open() {
        let config = PluginsConfig {
            plugins: vec![
                PluginDefinition::new("gone", HookKindId::PreCreate, "http://127.0.0.1:1"),
                PluginDefinition::new("gone-too", HookKindId::PostDelete, "http://127.0.0.1:1"),
            ],
            ..Default::default()
        };

        let hooks = LifecycleHooks::from_config(&config).unwrap();
        assert_eq!(hooks.pre_create.registry().len(), 1);
        assert!(hooks.pre_delete.registry().is_empty());

        // Unreachable plugin under the default policy lets the create proceed.
        assert!(hooks.before_create("prod-stack-1").await);
        assert!(hooks.before_delete("prod-stack-1").await);
        hooks.after_delete("prod-stack-1").await;
    }

    #[tokio::test]
    async fn test_lifecycle_hooks_from_config_fail_closed() {
        let config = PluginsConfig {
            plugins: vec![PluginDefinition::new(
                "gone",
                HookKindId::PreDelete,
                "http://127.0.0.1:1",
            )],
            failure_policy: FailurePolicy::FailClosed,
            ..Default::default()
        };

        let hooks = LifecycleHooks::from_config(&config).unwrap();
        assert!(!hooks.before_delete("prod-stack-1").await);
        assert!(hooks.before_create("prod-stack-1").await);
    }
}
