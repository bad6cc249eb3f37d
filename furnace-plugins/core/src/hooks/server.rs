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

//! Server side of a hook: answers `Execute` with a local implementation.

use super::handlers::LifecycleHook;
use super::kind::{HookKind, HookOutcome, Reply};
use crate::proto::Stack;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tonic::{Request, Response, Status};

/// gRPC service adapter wrapping a local hook of kind `K`.
///
/// Each request calls the hook exactly once with the stack name unchanged.
/// The call runs on its own task; if the hook panics the request is answered
/// with `Status::internal` and the server keeps serving.
pub struct HookService<K, H> {
    hook: Arc<H>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HookKind, H: LifecycleHook<K>> HookService<K, H> {
    pub fn new(hook: Arc<H>) -> Self {
        Self {
            hook,
            _kind: PhantomData,
        }
    }

    pub(crate) async fn handle(&self, request: Request<Stack>) -> Result<Response<Reply<K>>, Status> {
        let stack = request.into_inner().name;
        let hook = Arc::clone(&self.hook);
        let start = Instant::now();

        tracing::debug!(
            kind = K::NAME,
            hook = %LifecycleHook::<K>::name(&*hook),
            stack = %stack,
            "Serving hook call"
        );

        let task = tokio::spawn(async move { LifecycleHook::<K>::execute(&*hook, &stack).await });
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    kind = K::NAME,
                    hook = %LifecycleHook::<K>::name(&*self.hook),
                    error = %err,
                    "Hook implementation failed"
                );
                return Err(Status::internal(format!("{} hook failed: {}", K::NAME, err)));
            }
        };

        tracing::debug!(
            kind = K::NAME,
            outcome = ?outcome,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Hook call served"
        );

        Ok(Response::new(outcome.into_reply()))
    }
}

impl<K, H> Clone for HookService<K, H> {
    fn clone(&self) -> Self {
        Self {
            hook: Arc::clone(&self.hook),
            _kind: PhantomData,
        }
    }
}
