//! Async invocation with a caller-side deadline.

use crate::error::{ProxyError, Result};
use crate::proxy::GatedResourceProxy;
use crate::resource::ProtectedResource;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use warden_audit_types::{Operation, ResourceKey, Role};

impl<R> GatedResourceProxy<R>
where
    R: ProtectedResource + 'static,
    R::Args: Send + 'static,
    R::Output: Send + 'static,
{
    /// Run [`invoke`](Self::invoke) on the blocking pool and wait at most
    /// `deadline` for it.
    ///
    /// Giving up does not cancel the call: initialization, the operation and
    /// its audit record still complete in the background.
    pub async fn invoke_with_deadline(
        self: &Arc<Self>,
        role: Role,
        operation: Operation,
        key: ResourceKey,
        args: R::Args,
        deadline: Duration,
    ) -> Result<R::Output> {
        let proxy = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || proxy.invoke(&role, &operation, &key, args));

        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(ProxyError::Join(join.to_string())),
            Err(_) => {
                warn!(proxy = %self.id, ?deadline, "Invocation deadline elapsed; call continues in background");
                Err(ProxyError::DeadlineElapsed { deadline })
            }
        }
    }

    /// [`invoke_with_deadline`](Self::invoke_with_deadline) with the
    /// proxy's configured deadline.
    pub async fn invoke_async(
        self: &Arc<Self>,
        role: Role,
        operation: Operation,
        key: ResourceKey,
        args: R::Args,
    ) -> Result<R::Output> {
        let deadline = self.deadline;
        self.invoke_with_deadline(role, operation, key, args, deadline).await
    }
}
