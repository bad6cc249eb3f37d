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

//! Serving hooks from a plugin process.

use crate::error::{PluginError, PluginResult};
use crate::hooks::{HookKind, LifecycleHook};
use std::collections::BTreeSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::service::{Routes, RoutesBuilder};
use tonic::transport::Server;
use tracing::info;

/// Collects hook implementations and serves them over gRPC.
///
/// At most one hook per kind can be registered.
///
/// # Example
///
/// ```rust,ignore
/// use furnace_plugins::{hooks::{from_fn, PreCreate}, PluginServer};
///
/// PluginServer::new()
///     .with_hook::<PreCreate, _>(from_fn("guard", |stack| stack.starts_with("prod-")))?
///     .serve("127.0.0.1:50051".parse()?)
///     .await?;
/// ```
#[derive(Default)]
pub struct PluginServer {
    routes: RoutesBuilder,
    kinds: BTreeSet<&'static str>,
}

impl PluginServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` as the implementation of kind `K`.
    pub fn register<K, H>(&mut self, hook: Arc<H>) -> PluginResult<&mut Self>
    where
        K: HookKind,
        H: LifecycleHook<K>,
    {
        if !self.kinds.insert(K::NAME) {
            return Err(PluginError::AlreadyRegistered(K::NAME));
        }
        info!(kind = K::NAME, hook = %LifecycleHook::<K>::name(&*hook), "Registering hook");
        K::register(&mut self.routes, hook);
        Ok(self)
    }

    pub fn with_hook<K, H>(mut self, hook: H) -> PluginResult<Self>
    where
        K: HookKind,
        H: LifecycleHook<K>,
    {
        self.register::<K, H>(Arc::new(hook))?;
        Ok(self)
    }

    /// Registered kind names.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.iter().copied()
    }

    /// Hand the routes to an externally owned tonic server.
    pub fn into_routes(self) -> PluginResult<Routes> {
        if self.kinds.is_empty() {
            return Err(PluginError::NoHooksRegistered);
        }
        Ok(self.routes.routes())
    }

    pub async fn serve(self, addr: SocketAddr) -> PluginResult<()> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    pub async fn serve_with_shutdown<F>(self, addr: SocketAddr, signal: F) -> PluginResult<()>
    where
        F: Future<Output = ()>,
    {
        let kinds: Vec<_> = self.kinds().collect();
        let routes = self.into_routes()?;

        info!(%addr, ?kinds, "Starting hook plugin server");
        Server::builder()
            .add_routes(routes)
            .serve_with_shutdown(addr, signal)
            .await?;
        info!("Hook plugin server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener, e.g. one bound to port 0.
    pub async fn serve_with_incoming_shutdown<F>(
        self,
        listener: TcpListener,
        signal: F,
    ) -> PluginResult<()>
    where
        F: Future<Output = ()>,
    {
        let kinds: Vec<_> = self.kinds().collect();
        let routes = self.into_routes()?;

        info!(addr = ?listener.local_addr().ok(), ?kinds, "Starting hook plugin server");
        Server::builder()
            .add_routes(routes)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal)
            .await?;
        info!("Hook plugin server shutdown complete");
        Ok(())
    }
}

/// Parse a listen address such as `127.0.0.1:50051`.
pub fn parse_listen_addr(addr: &str) -> PluginResult<SocketAddr> {
    addr.parse()
        .map_err(|_| PluginError::InvalidListenAddress(addr.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{from_fn, LoggingHook, PostCreate, PreCreate};

    #[test]
    fn test_duplicate_kind_rejected() {
        let mut server = PluginServer::new();
        server
            .register::<PreCreate, _>(Arc::new(from_fn::<PreCreate, _>("a", |_| false)))
            .unwrap();
        let again = server.register::<PreCreate, _>(Arc::new(LoggingHook::new("b")));
        assert!(matches!(again, Err(PluginError::AlreadyRegistered("PreCreate"))));
    }

    #[test]
    fn test_kinds_listed() {
        let server = PluginServer::new()
            .with_hook::<PostCreate, _>(LoggingHook::new("log"))
            .unwrap()
            .with_hook::<PreCreate, _>(LoggingHook::new("log"))
            .unwrap();
        assert_eq!(server.kinds().collect::<Vec<_>>(), vec!["PostCreate", "PreCreate"]);
    }

    #[test]
    fn test_empty_server_has_no_routes() {
        assert!(matches!(
            PluginServer::new().into_routes(),
            Err(PluginError::NoHooksRegistered)
        ));
    }

    #[test]
    fn test_parse_listen_addr() {
        assert!(parse_listen_addr("127.0.0.1:50051").is_ok());
        assert!(matches!(
            parse_listen_addr("localhost"),
            Err(PluginError::InvalidListenAddress(_))
        ));
    }
}
