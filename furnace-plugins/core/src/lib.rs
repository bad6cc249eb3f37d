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

//! Furnace Plugin System
//!
//! Out-of-process plugins that intercept the creation and deletion of
//! Furnace stacks.
//!
//! # Architecture
//!
//! A plugin is a separate process serving one or more lifecycle hooks over
//! gRPC. Furnace holds a [`HookClient`](hooks::HookClient) per plugin and
//! calls it around stack operations:
//! - `PreCreate` / `PreDelete` may veto the operation
//! - `PostCreate` / `PostDelete` are notified afterwards
//!
//! Launching plugin processes and establishing the connection is up to the
//! host; this crate starts from a ready channel or endpoint address.
//!
//! # Example
//!
//! Plugin side:
//!
//! ```rust,ignore
//! use furnace_plugins::hooks::{from_fn, LoggingHook, PostCreate, PreCreate};
//! use furnace_plugins::PluginServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     PluginServer::new()
//!         .with_hook::<PreCreate, _>(from_fn("guard", |stack| stack.starts_with("prod-")))?
//!         .with_hook::<PostCreate, _>(LoggingHook::new("audit"))?
//!         .serve("127.0.0.1:50051".parse()?)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! Host side:
//!
//! ```rust,ignore
//! use furnace_plugins::hooks::{LifecycleHooks, PluginsConfig};
//!
//! let hooks = LifecycleHooks::from_config(&PluginsConfig::load(Some(path))?)?;
//! if !hooks.before_create("prod-stack-1").await {
//!     return Ok(()); // vetoed
//! }
//! ```

pub mod error;
pub mod hooks;
pub mod proto;
pub mod transport;

// Re-exports
pub use error::{PluginError, PluginResult};
pub use hooks::{
    FailurePolicy, HookClient, HookKind, LifecycleHook, LifecycleHooks, PostCreate, PostDelete,
    PreCreate, PreDelete,
};
pub use transport::{parse_listen_addr, PluginServer};
