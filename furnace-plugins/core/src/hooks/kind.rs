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

//! Hook kinds and their outcomes.
//!
//! Every hook has the same shape: a stack name in, an outcome out. A kind is a
//! zero-sized marker that fixes the outcome type and binds the hook to its
//! generated gRPC service. The four kinds are stamped out by
//! `lifecycle_hook_kind!` so the client and server adapters stay generic.

use super::config::FailurePolicy;
use super::handlers::LifecycleHook;
use super::server::HookService;
use crate::proto::{self, Empty, Proceed, Stack};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tonic::service::RoutesBuilder;
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

/// Value produced by a hook and the reply message that carries it.
pub trait HookOutcome: Sized + Send + fmt::Debug + 'static {
    /// Wire message for this outcome.
    type Reply: prost::Message + Default + Send + 'static;

    fn into_reply(self) -> Self::Reply;

    fn from_reply(reply: Self::Reply) -> Self;

    /// Outcome to report when the remote call did not complete.
    fn on_call_failure(policy: FailurePolicy) -> Self;

    /// Whether this outcome aborts the operation.
    fn vetoes(&self) -> bool;
}

/// Pre-hook decision: `true` aborts the operation, `false` proceeds.
impl HookOutcome for bool {
    type Reply = Proceed;

    fn into_reply(self) -> Proceed {
        Proceed { failed: self }
    }

    fn from_reply(reply: Proceed) -> Self {
        reply.failed
    }

    fn on_call_failure(policy: FailurePolicy) -> Self {
        match policy {
            FailurePolicy::FailOpen => false,
            FailurePolicy::FailClosed => true,
        }
    }

    fn vetoes(&self) -> bool {
        *self
    }
}

/// Post hooks are observational and carry no value.
impl HookOutcome for () {
    type Reply = Empty;

    fn into_reply(self) -> Empty {
        Empty {}
    }

    fn from_reply(_reply: Empty) -> Self {}

    fn on_call_failure(_policy: FailurePolicy) -> Self {}

    fn vetoes(&self) -> bool {
        false
    }
}

/// Reply message of a hook kind.
pub type Reply<K> = <<K as HookKind>::Outcome as HookOutcome>::Reply;

/// A lifecycle hook kind.
#[async_trait]
pub trait HookKind: Send + Sync + Sized + 'static {
    type Outcome: HookOutcome;

    /// Kind name, also the gRPC service name.
    const NAME: &'static str;

    /// Matching runtime tag.
    const ID: HookKindId;

    /// Issue one unary `Execute` call on `channel`.
    async fn call(channel: Channel, request: Stack) -> Result<Reply<Self>, Status>;

    /// Expose `hook` as this kind's gRPC service.
    fn register<H: LifecycleHook<Self>>(routes: &mut RoutesBuilder, hook: Arc<H>);
}

/// Runtime tag for a hook kind, as used in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookKindId {
    PreCreate,
    PostCreate,
    PreDelete,
    PostDelete,
}

impl HookKindId {
    pub const ALL: [HookKindId; 4] = [
        HookKindId::PreCreate,
        HookKindId::PostCreate,
        HookKindId::PreDelete,
        HookKindId::PostDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookKindId::PreCreate => PreCreate::NAME,
            HookKindId::PostCreate => PostCreate::NAME,
            HookKindId::PreDelete => PreDelete::NAME,
            HookKindId::PostDelete => PostDelete::NAME,
        }
    }

    /// Pre hooks can veto the operation.
    pub fn is_pre(&self) -> bool {
        matches!(self, HookKindId::PreCreate | HookKindId::PreDelete)
    }
}

impl fmt::Display for HookKindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKindId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        HookKindId::ALL
            .into_iter()
            .find(|kind| kind.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| format!("unknown hook kind: {}", s))
    }
}

macro_rules! lifecycle_hook_kind {
    (
        $(#[$meta:meta])*
        $kind:ident => $outcome:ty,
        $client_mod:ident :: $client:ident,
        $server_mod:ident :: $server:ident,
        $service:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $kind;

        #[async_trait]
        impl HookKind for $kind {
            type Outcome = $outcome;

            const NAME: &'static str = stringify!($kind);
            const ID: HookKindId = HookKindId::$kind;

            async fn call(channel: Channel, request: Stack) -> Result<Reply<Self>, Status> {
                let mut client = proto::$client_mod::$client::new(channel);
                client.execute(request).await.map(Response::into_inner)
            }

            fn register<H: LifecycleHook<Self>>(routes: &mut RoutesBuilder, hook: Arc<H>) {
                routes.add_service(proto::$server_mod::$server::new(HookService::<Self, H>::new(
                    hook,
                )));
            }
        }

        #[tonic::async_trait]
        impl<H: LifecycleHook<$kind>> proto::$server_mod::$service for HookService<$kind, H> {
            async fn execute(&self, request: Request<Stack>) -> Result<Response<Reply<$kind>>, Status> {
                self.handle(request).await
            }
        }
    };
}

lifecycle_hook_kind! {
    /// Runs before a stack is created. Returning `true` aborts the create.
    PreCreate => bool,
    pre_create_client::PreCreateClient,
    pre_create_server::PreCreateServer,
    PreCreate
}

lifecycle_hook_kind! {
    /// Runs after a stack was created.
    PostCreate => (),
    post_create_client::PostCreateClient,
    post_create_server::PostCreateServer,
    PostCreate
}

lifecycle_hook_kind! {
    /// Runs before a stack is deleted. Returning `true` aborts the delete.
    PreDelete => bool,
    pre_delete_client::PreDeleteClient,
    pre_delete_server::PreDeleteServer,
    PreDelete
}

lifecycle_hook_kind! {
    /// Runs after a stack was deleted.
    PostDelete => (),
    post_delete_client::PostDeleteClient,
    post_delete_server::PostDeleteServer,
    PostDelete
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_hook_failure_outcome_follows_policy() {
        assert!(!bool::on_call_failure(FailurePolicy::FailOpen));
        assert!(bool::on_call_failure(FailurePolicy::FailClosed));
    }

    #[test]
    fn test_proceed_reply_mapping() {
        assert!(bool::from_reply(true.into_reply()));
        assert!(!bool::from_reply(Proceed { failed: false }));
        assert!(!().vetoes());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(PreCreate::NAME, "PreCreate");
        assert_eq!(PostDelete::ID, HookKindId::PostDelete);
        assert!(HookKindId::PreDelete.is_pre());
        assert!(!HookKindId::PostCreate.is_pre());
    }

    #[test]
    fn test_parse_kind_id() {
        assert_eq!("pre-create".parse::<HookKindId>(), Ok(HookKindId::PreCreate));
        assert_eq!("PostDelete".parse::<HookKindId>(), Ok(HookKindId::PostDelete));
        assert_eq!("post_create".parse::<HookKindId>(), Ok(HookKindId::PostCreate));
        assert!("create".parse::<HookKindId>().is_err());
    }
}
