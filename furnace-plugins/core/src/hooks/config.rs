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

//! Hook plugin configuration.

use super::kind::HookKindId;
use super::registry::HookPriority;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tonic::transport::Endpoint;

/// What a client reports when the remote call fails.
///
/// Only pre hooks are affected; post hooks have nothing to report either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Treat the failure as "proceed". A dead or misbehaving plugin cannot
    /// block an operation, and its failure is only visible in the logs.
    #[default]
    FailOpen,
    /// Treat the failure as a veto.
    FailClosed,
}

impl std::str::FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_open" | "open" => Ok(FailurePolicy::FailOpen),
            "fail_closed" | "closed" => Ok(FailurePolicy::FailClosed),
            _ => Err(ConfigError::InvalidFailurePolicy(s.to_string())),
        }
    }
}

/// Transport settings shared by every plugin connection.
///
/// Both timeouts are unset by default, in which case calls wait as long as
/// the transport does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDefaults {
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,

    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,
}

/// Address and transport settings of one plugin endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Endpoint URI, e.g. `http://127.0.0.1:50051`.
    pub uri: String,
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

impl EndpointConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            connect_timeout: None,
            request_timeout: None,
        }
    }

    /// Apply shared defaults.
    pub fn with_defaults(mut self, defaults: &EndpointDefaults) -> Self {
        self.connect_timeout = defaults.connect_timeout_ms.map(Duration::from_millis);
        self.request_timeout = defaults.request_timeout_ms.map(Duration::from_millis);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the tonic endpoint.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        let mut endpoint = Endpoint::from_shared(self.uri.clone()).map_err(|e| {
            ConfigError::InvalidEndpoint {
                endpoint: self.uri.clone(),
                reason: e.to_string(),
            }
        })?;
        if let Some(timeout) = self.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        if let Some(timeout) = self.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }
        Ok(endpoint)
    }
}

/// Configuration for the hook plugins a host talks to.
///
/// # Example TOML Configuration
///
/// ```toml
/// failure_policy = "fail_open"
/// stop_on_veto = true
///
/// [endpoint_defaults]
/// connect_timeout_ms = 5000
///
/// [[plugins]]
/// name = "audit"
/// kind = "PreCreate"
/// endpoint = "http://127.0.0.1:50051"
/// priority = 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Plugin endpoints.
    #[serde(default)]
    pub plugins: Vec<PluginDefinition>,

    /// Outcome of a pre hook whose call failed.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Stop dispatching pre hooks at the first veto.
    #[serde(default = "default_stop_on_veto")]
    pub stop_on_veto: bool,

    #[serde(default)]
    pub endpoint_defaults: EndpointDefaults,
}

fn default_stop_on_veto() -> bool {
    true
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            failure_policy: FailurePolicy::default(),
            stop_on_veto: default_stop_on_veto(),
            endpoint_defaults: EndpointDefaults::default(),
        }
    }
}

pub const ENV_FAILURE_POLICY: &str = "FURNACE_HOOKS_FAILURE_POLICY";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "FURNACE_HOOKS_CONNECT_TIMEOUT_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "FURNACE_HOOKS_REQUEST_TIMEOUT_MS";

impl PluginsConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load from a TOML file, or JSON when the extension is `.json`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    /// Defaults overridden by environment variables.
    ///
    /// Supported environment variables:
    /// - FURNACE_HOOKS_FAILURE_POLICY: `fail_open` or `fail_closed`
    /// - FURNACE_HOOKS_CONNECT_TIMEOUT_MS: connection timeout
    /// - FURNACE_HOOKS_REQUEST_TIMEOUT_MS: per-request timeout
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Load with priority: env > file > defaults.
    ///
    /// A named file must exist; defaults are used only when no file is given.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading hook configuration");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    fn merge_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(policy) = std::env::var(ENV_FAILURE_POLICY) {
            self.failure_policy = policy.parse()?;
        }
        if let Some(ms) = env_millis(ENV_CONNECT_TIMEOUT_MS)? {
            self.endpoint_defaults.connect_timeout_ms = Some(ms);
        }
        if let Some(ms) = env_millis(ENV_REQUEST_TIMEOUT_MS)? {
            self.endpoint_defaults.request_timeout_ms = Some(ms);
        }
        Ok(())
    }

    /// Enabled plugins of one kind, lowest priority first.
    pub fn plugins_for(&self, kind: HookKindId) -> Vec<&PluginDefinition> {
        let mut plugins: Vec<_> = self
            .plugins
            .iter()
            .filter(|p| p.enabled && p.kind == kind)
            .collect();
        plugins.sort_by_key(|p| p.priority);
        plugins
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, plugin) in self.plugins.iter().enumerate() {
            plugin.validate().map_err(|e| ConfigError::InvalidPlugin {
                index,
                reason: e.to_string(),
            })?;
            if !seen.insert(plugin.name.as_str()) {
                return Err(ConfigError::DuplicatePlugin(plugin.name.clone()));
            }
        }
        Ok(())
    }
}

fn env_millis(var: &str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// One plugin endpoint serving one hook kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDefinition {
    /// Unique plugin name, used as the hook id when dispatching.
    pub name: String,

    /// Hook kind served at the endpoint.
    pub kind: HookKindId,

    /// Endpoint URI.
    pub endpoint: String,

    /// Lower values run first.
    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_priority() -> i32 {
    HookPriority::NORMAL.0
}

fn default_enabled() -> bool {
    true
}

impl PluginDefinition {
    pub fn new(name: impl Into<String>, kind: HookKindId, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            endpoint: endpoint.into(),
            priority: default_priority(),
            enabled: default_enabled(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn endpoint_config(&self, defaults: &EndpointDefaults) -> EndpointConfig {
        EndpointConfig::new(self.endpoint.clone()).with_defaults(defaults)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyPluginName);
        }
        if self.endpoint.is_empty() {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: String::new(),
                reason: "endpoint cannot be empty".to_string(),
            });
        }
        EndpointConfig::new(self.endpoint.clone()).endpoint()?;
        Ok(())
    }
}

/// Errors that can occur while loading hook configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid plugin at index {index}: {reason}")]
    InvalidPlugin { index: usize, reason: String },

    #[error("Duplicate plugin name: {0}")]
    DuplicatePlugin(String),

    #[error("Plugin name cannot be empty")]
    EmptyPluginName,

    #[error("Invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Invalid failure policy: {0}")]
    InvalidFailurePolicy(String),

    #[error("Invalid value for {var}: {value}")]
    InvalidEnvValue { var: String, value: String },
}
