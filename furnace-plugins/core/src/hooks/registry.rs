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

//! Hook registry for the plugins attached to one hook kind.

use super::handlers::{LifecycleHook, SharedHook};
use super::kind::HookKind;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

/// Priority level for hook execution.
/// Lower values execute first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookPriority(pub i32);

impl Default for HookPriority {
    fn default() -> Self {
        HookPriority::NORMAL
    }
}

impl HookPriority {
    /// Highest priority (executes first).
    pub const HIGHEST: HookPriority = HookPriority(i32::MIN);
    pub const HIGH: HookPriority = HookPriority(50);
    /// Default for registered hooks and configured plugins.
    pub const NORMAL: HookPriority = HookPriority(100);
    pub const LOW: HookPriority = HookPriority(150);
    /// Lowest priority (executes last).
    pub const LOWEST: HookPriority = HookPriority(i32::MAX);
}

/// A registered hook with its metadata.
pub struct RegisteredHook<K: HookKind> {
    /// Unique identifier for this registration.
    pub id: String,
    pub hook: SharedHook<K>,
    pub priority: HookPriority,
    pub enabled: bool,
}

impl<K: HookKind> RegisteredHook<K> {
    pub fn new(id: impl Into<String>, hook: impl LifecycleHook<K>) -> Self {
        Self::from_shared(id, Arc::new(hook))
    }

    pub fn from_shared(id: impl Into<String>, hook: SharedHook<K>) -> Self {
        Self {
            id: id.into(),
            hook,
            priority: HookPriority::default(),
            enabled: true,
        }
    }

    pub fn with_priority(mut self, priority: HookPriority) -> Self {
        self.priority = priority;
        self
    }
}

impl<K: HookKind> Clone for RegisteredHook<K> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            hook: Arc::clone(&self.hook),
            priority: self.priority,
            enabled: self.enabled,
        }
    }
}

/// Hooks attached to kind `K`, kept sorted by priority.
///
/// Hooks with equal priority keep their registration order.
pub struct HookRegistry<K: HookKind> {
    hooks: RwLock<Vec<RegisteredHook<K>>>,
}

impl<K: HookKind> Default for HookRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HookKind> HookRegistry<K> {
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Register a hook.
    pub fn register_hook(&self, hook: RegisteredHook<K>) -> Result<(), RegistryError> {
        let mut hooks = self.hooks.write();
        if hooks.iter().any(|h| h.id == hook.id) {
            return Err(RegistryError::HookAlreadyExists(hook.id));
        }
        tracing::debug!(kind = K::NAME, hook_id = %hook.id, priority = hook.priority.0, "Hook registered");
        hooks.push(hook);
        // Stable sort keeps registration order within a priority
        hooks.sort_by_key(|h| h.priority);
        Ok(())
    }

    /// Unregister a hook by ID.
    pub fn unregister_hook(&self, id: &str) -> Result<RegisteredHook<K>, RegistryError> {
        let mut hooks = self.hooks.write();
        let index = hooks
            .iter()
            .position(|h| h.id == id)
            .ok_or_else(|| RegistryError::HookNotFound(id.to_string()))?;
        Ok(hooks.remove(index))
    }

    /// Enabled hooks in execution order.
    pub fn active_hooks(&self) -> Vec<RegisteredHook<K>> {
        self.hooks
            .read()
            .iter()
            .filter(|h| h.enabled)
            .cloned()
            .collect()
    }

    pub fn enable_hook(&self, id: &str) -> Result<(), RegistryError> {
        self.set_hook_enabled(id, true)
    }

    pub fn disable_hook(&self, id: &str) -> Result<(), RegistryError> {
        self.set_hook_enabled(id, false)
    }

    fn set_hook_enabled(&self, id: &str, enabled: bool) -> Result<(), RegistryError> {
        let mut hooks = self.hooks.write();
        let hook = hooks
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| RegistryError::HookNotFound(id.to_string()))?;
        hook.enabled = enabled;
        Ok(())
    }

    pub fn hook_ids(&self) -> Vec<String> {
        self.hooks.read().iter().map(|h| h.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }
}

/// Errors that can occur in the hook registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Hook already exists: {0}")]
    HookAlreadyExists(String),

    #[error("Hook not found: {0}")]
    HookNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::super::handlers::{from_fn, LoggingHook};
    use super::super::kind::{PostCreate, PreCreate};
    use super::*;

    #[test]
    fn test_register_and_order() {
        let registry = HookRegistry::<PreCreate>::new();
        registry
            .register_hook(
                RegisteredHook::new("late", from_fn::<PreCreate, _>("late", |_| false))
                    .with_priority(HookPriority::LOW),
            )
            .unwrap();
        registry
            .register_hook(
                RegisteredHook::new("early", from_fn::<PreCreate, _>("early", |_| false))
                    .with_priority(HookPriority::HIGH),
            )
            .unwrap();
        registry
            .register_hook(
                RegisteredHook::new("early-too", from_fn::<PreCreate, _>("e2", |_| false))
                    .with_priority(HookPriority::HIGH),
            )
            .unwrap();

        assert_eq!(registry.hook_ids(), vec!["early", "early-too", "late"]);
    }

    #[test]
    fn test_duplicate_hook_rejected() {
        let registry = HookRegistry::<PostCreate>::new();
        registry
            .register_hook(RegisteredHook::new("log", LoggingHook::new("log")))
            .unwrap();
        let result = registry.register_hook(RegisteredHook::new("log", LoggingHook::new("log")));
        assert!(matches!(result, Err(RegistryError::HookAlreadyExists(_))));
    }

    #[test]
    fn test_enable_disable_unregister() {
        let registry = HookRegistry::<PostCreate>::new();
        registry
            .register_hook(RegisteredHook::new("log", LoggingHook::new("log")))
            .unwrap();

        registry.disable_hook("log").unwrap();
        assert!(registry.active_hooks().is_empty());
        registry.enable_hook("log").unwrap();
        assert_eq!(registry.active_hooks().len(), 1);

        let removed = registry.unregister_hook("log").unwrap();
        assert_eq!(removed.id, "log");
        assert!(registry.is_empty());
        assert!(matches!(
            registry.unregister_hook("log"),
            Err(RegistryError::HookNotFound(_))
        ));
    }

    #[test]
    fn test_priority_bounds_and_default() {
        let registry = HookRegistry::<PreCreate>::new();
        for (id, priority) in [
            ("normal", HookPriority::default()),
            ("last", HookPriority::LOWEST),
            ("first", HookPriority::HIGHEST),
            ("configured", HookPriority(100)),
        ] {
            registry
                .register_hook(
                    RegisteredHook::new(id, from_fn::<PreCreate, _>(id, |_| false))
                        .with_priority(priority),
                )
                .unwrap();
        }

        assert_eq!(HookPriority::default(), HookPriority::NORMAL);
        assert_eq!(registry.hook_ids(), vec!["first", "normal", "configured", "last"]);
    }
}
