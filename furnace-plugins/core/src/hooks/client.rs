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

//! Client side of a hook: a local [`LifecycleHook`] backed by a remote plugin.

use super::config::{EndpointConfig, FailurePolicy};
use super::handlers::LifecycleHook;
use super::kind::{HookKind, HookOutcome};
use crate::error::PluginResult;
use crate::proto::Stack;
use async_trait::async_trait;
use std::fmt;
use std::marker::PhantomData;
use std::time::Instant;
use tonic::transport::Channel;
use tonic::Status;

/// Remote hook of kind `K`.
///
/// [`LifecycleHook::execute`] never fails: when the call does not complete
/// (connection refused, timeout, error status from the plugin) the outcome
/// comes from the client's [`FailurePolicy`]. With the default
/// [`FailurePolicy::FailOpen`] a pre hook then reports `false`, i.e. the
/// operation proceeds exactly as if the plugin had approved it. Use
/// [`HookClient::try_execute`] to see the error.
pub struct HookClient<K> {
    channel: Channel,
    policy: FailurePolicy,
    name: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HookKind> HookClient<K> {
    /// Wrap an established channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            policy: FailurePolicy::default(),
            name: K::NAME.to_string(),
            _kind: PhantomData,
        }
    }

    /// Connect to a plugin endpoint, failing if it cannot be reached.
    pub async fn connect(config: &EndpointConfig) -> PluginResult<Self> {
        let channel = config.endpoint()?.connect().await?;
        Ok(Self::new(channel).with_name(config.uri.clone()))
    }

    /// Create a client that connects on first use.
    pub fn connect_lazy(config: &EndpointConfig) -> PluginResult<Self> {
        let channel = config.endpoint()?.connect_lazy();
        Ok(Self::new(channel).with_name(config.uri.clone()))
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Name used in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Issue the remote call and report transport errors.
    pub async fn try_execute(&self, stack: &str) -> Result<K::Outcome, Status> {
        let reply = K::call(self.channel.clone(), Stack::new(stack)).await?;
        Ok(K::Outcome::from_reply(reply))
    }
}

#[async_trait]
impl<K: HookKind> LifecycleHook<K> for HookClient<K> {
    async fn execute(&self, stack: &str) -> K::Outcome {
        let start = Instant::now();
        match self.try_execute(stack).await {
            Ok(outcome) => {
                tracing::debug!(
                    kind = K::NAME,
                    plugin = %self.name,
                    stack = %stack,
                    outcome = ?outcome,
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "Hook call completed"
                );
                outcome
            }
            Err(status) => {
                let outcome = K::Outcome::on_call_failure(self.policy);
                tracing::warn!(
                    kind = K::NAME,
                    plugin = %self.name,
                    stack = %stack,
                    code = ?status.code(),
                    error = %status.message(),
                    policy = ?self.policy,
                    outcome = ?outcome,
                    "Hook call failed, applying failure policy"
                );
                outcome
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<K> Clone for HookClient<K> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            policy: self.policy,
            name: self.name.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: HookKind> fmt::Debug for HookClient<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookClient")
            .field("kind", &K::NAME)
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::kind::{PostCreate, PreDelete};
    use super::*;

    fn unreachable_endpoint() -> EndpointConfig {
        // Port 1 is privileged and never served in the test environment.
        EndpointConfig::new("http://127.0.0.1:1")
            .with_connect_timeout(std::time::Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_pre_hook_fails_open_by_default() {
        let client = HookClient::<PreDelete>::connect_lazy(&unreachable_endpoint()).unwrap();
        assert_eq!(client.policy(), FailurePolicy::FailOpen);
        assert!(client.try_execute("prod-stack-1").await.is_err());
        assert!(!client.execute("prod-stack-1").await);
    }

    #[tokio::test]
    async fn test_pre_hook_fails_closed_when_configured() {
        let client = HookClient::<PreDelete>::connect_lazy(&unreachable_endpoint())
            .unwrap()
            .with_policy(FailurePolicy::FailClosed);
        assert!(client.execute("prod-stack-1").await);
    }

    #[tokio::test]
    async fn test_post_hook_swallows_transport_error() {
        let client = HookClient::<PostCreate>::connect_lazy(&unreachable_endpoint()).unwrap();
        client.execute("prod-stack-1").await;
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_uri() {
        let result = HookClient::<PostCreate>::connect_lazy(&EndpointConfig::new("::not a uri::"));
        assert!(result.is_err());
    }
}
