// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Hook handler traits and implementations.

use super::kind::HookKind;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

/// A lifecycle hook for stacks of kind `K`.
///
/// Implemented by plugin authors on the serving side and by
/// [`HookClient`](super::HookClient) on the calling side, so a host can hold
/// local and remote hooks behind the same trait object.
///
/// # Example
///
/// ```rust,ignore
/// use furnace_plugins::hooks::{LifecycleHook, PreCreate};
///
/// struct DenyProduction;
///
/// #[async_trait::async_trait]
/// impl LifecycleHook<PreCreate> for DenyProduction {
///     async fn execute(&self, stack: &str) -> bool {
///         stack.starts_with("prod-")
///     }
/// }
/// ```
#[async_trait]
pub trait LifecycleHook<K: HookKind>: Send + Sync + 'static {
    /// Run the hook for `stack`.
    async fn execute(&self, stack: &str) -> K::Outcome;

    /// Hook name for logs.
    fn name(&self) -> &str {
        K::NAME
    }
}

/// Shared, type-erased hook.
pub type SharedHook<K> = Arc<dyn LifecycleHook<K>>;

#[async_trait]
impl<K: HookKind> LifecycleHook<K> for SharedHook<K> {
    async fn execute(&self, stack: &str) -> K::Outcome {
        (**self).execute(stack).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Hook with a blocking implementation.
pub trait SyncLifecycleHook<K: HookKind>: Send + Sync + 'static {
    fn execute_blocking(&self, stack: &str) -> K::Outcome;

    fn name(&self) -> &str {
        K::NAME
    }
}

/// Runs a [`SyncLifecycleHook`] on the blocking thread pool.
pub struct SyncHook<H> {
    inner: Arc<H>,
}

impl<H> SyncHook<H> {
    pub fn new(hook: H) -> Self {
        Self {
            inner: Arc::new(hook),
        }
    }
}

#[async_trait]
impl<K: HookKind, H: SyncLifecycleHook<K>> LifecycleHook<K> for SyncHook<H> {
    async fn execute(&self, stack: &str) -> K::Outcome {
        let inner = Arc::clone(&self.inner);
        let stack = stack.to_owned();
        match tokio::task::spawn_blocking(move || inner.execute_blocking(&stack)).await {
            Ok(outcome) => outcome,
            // Re-raise so the serving side sees the hook's own panic.
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            // Blocking tasks are only cancelled when the runtime shuts down.
            Err(err) => panic!("blocking hook task cancelled: {}", err),
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Hook that invokes a closure.
pub struct FnHook<K, F> {
    name: String,
    callback: F,
    _kind: PhantomData<fn() -> K>,
}

impl<K, F> FnHook<K, F>
where
    K: HookKind,
    F: Fn(&str) -> K::Outcome + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
            _kind: PhantomData,
        }
    }
}

/// Build a hook from a closure.
pub fn from_fn<K, F>(name: impl Into<String>, callback: F) -> FnHook<K, F>
where
    K: HookKind,
    F: Fn(&str) -> K::Outcome + Send + Sync + 'static,
{
    FnHook::new(name, callback)
}

#[async_trait]
impl<K, F> LifecycleHook<K> for FnHook<K, F>
where
    K: HookKind,
    F: Fn(&str) -> K::Outcome + Send + Sync + 'static,
{
    async fn execute(&self, stack: &str) -> K::Outcome {
        (self.callback)(stack)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Logs every call and lets the operation proceed.
pub struct LoggingHook {
    name: String,
}

impl LoggingHook {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl<K> LifecycleHook<K> for LoggingHook
where
    K: HookKind,
    K::Outcome: Default,
{
    async fn execute(&self, stack: &str) -> K::Outcome {
        tracing::info!(
            hook = %self.name,
            kind = K::NAME,
            stack = %stack,
            "Hook event received"
        );
        K::Outcome::default()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::super::kind::{PostCreate, PreCreate, PreDelete};
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DenyProd;

    impl SyncLifecycleHook<PreDelete> for DenyProd {
        fn execute_blocking(&self, stack: &str) -> bool {
            stack.starts_with("prod-")
        }
    }

    #[tokio::test]
    async fn test_fn_hook() {
        let hook = from_fn::<PreCreate, _>("prod-guard", |stack| stack == "prod-stack-1");
        assert!(hook.execute("prod-stack-1").await);
        assert!(!hook.execute("dev-stack").await);
        assert_eq!(LifecycleHook::<PreCreate>::name(&hook), "prod-guard");
    }

    #[tokio::test]
    async fn test_sync_hook_runs_blocking_impl() {
        let hook = SyncHook::new(DenyProd);
        assert!(LifecycleHook::<PreDelete>::execute(&hook, "prod-db").await);
        assert!(!LifecycleHook::<PreDelete>::execute(&hook, "staging-db").await);
        assert_eq!(LifecycleHook::<PreDelete>::name(&hook), "PreDelete");
    }

    #[tokio::test]
    async fn test_logging_hook_proceeds() {
        let hook = LoggingHook::new("log");
        assert!(!LifecycleHook::<PreCreate>::execute(&hook, "anything").await);
        LifecycleHook::<PostCreate>::execute(&hook, "anything").await;
    }

    #[tokio::test]
    async fn test_shared_hook_delegates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let shared: SharedHook<PostCreate> = Arc::new(from_fn::<PostCreate, _>("count", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        shared.execute("stack").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(shared.name(), "count");
    }
}
