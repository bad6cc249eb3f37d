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

//! Stack lifecycle hooks.
//!
//! Four hook kinds intercept the lifecycle of a stack:
//!
//! - **PreCreate**: before creation, `true` aborts the create
//! - **PostCreate**: after creation
//! - **PreDelete**: before deletion, `true` aborts the delete
//! - **PostDelete**: after deletion
//!
//! # Architecture
//!
//! All four share one shape, a stack name in and an outcome out, so the
//! adapters are generic over the kind:
//! - [`LifecycleHook<K>`]: the contract, implemented locally by plugins and
//!   remotely by [`HookClient<K>`]
//! - [`HookService<K, H>`]: serves a local hook as the kind's gRPC service
//! - [`HookDispatcher<K>`]: runs every plugin registered for a kind, lowest
//!   priority first, stopping at the first veto
//!
//! A pre hook whose remote call fails reports the client's
//! [`FailurePolicy`], fail-open (proceed) unless configured otherwise.
//!
//! # Example
//!
//! ```rust,ignore
//! use furnace_plugins::hooks::{HookClient, LifecycleHook, PreCreate};
//!
//! let client = HookClient::<PreCreate>::new(channel);
//! if client.execute("prod-stack-1").await {
//!     // abort the create
//! }
//! ```

mod client;
mod config;
mod dispatcher;
mod handlers;
mod kind;
mod registry;
mod server;

pub use client::HookClient;
pub use config::{
    ConfigError, EndpointConfig, EndpointDefaults, FailurePolicy, PluginDefinition,
    PluginsConfig, ENV_CONNECT_TIMEOUT_MS, ENV_FAILURE_POLICY, ENV_REQUEST_TIMEOUT_MS,
};
pub use dispatcher::{DispatchReport, HookDispatcher, HookInvocation, LifecycleHooks};
pub use handlers::{
    from_fn, FnHook, LifecycleHook, LoggingHook, SharedHook, SyncHook, SyncLifecycleHook,
};
pub use kind::{
    HookKind, HookKindId, HookOutcome, PostCreate, PostDelete, PreCreate, PreDelete, Reply,
};
pub use registry::{HookPriority, HookRegistry, RegisteredHook, RegistryError};
pub use server::HookService;
