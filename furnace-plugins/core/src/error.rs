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

//! Plugin error types

use crate::hooks::{ConfigError, RegistryError};
use thiserror::Error;

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors raised while wiring hooks to the transport.
///
/// Hook invocations themselves never return these: a failed call is resolved
/// by the client's [`FailurePolicy`](crate::hooks::FailurePolicy).
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Invalid listen address: {0}")]
    InvalidListenAddress(String),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    // Registration errors
    #[error("Hook already registered: {0}")]
    AlreadyRegistered(&'static str),

    #[error("No hooks registered")]
    NoHooksRegistered,

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
