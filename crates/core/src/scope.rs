//! Capability-scoped execution of remote calls
//!
//! Every remote call the store issues passes through [`RemoteScope::run`].
//! The wrapper is transparent: it returns the operation's own result and only
//! attaches a tracing span naming the bucket and the operation.

use std::future::Future;

use tracing::Instrument;

use crate::error::Result;

/// Execution scope bound to one bucket
#[derive(Debug, Clone)]
pub struct RemoteScope {
    bucket: String,
}

impl RemoteScope {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Run one remote operation inside the scope
    pub async fn run<T, Fut>(&self, operation: &'static str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let span = tracing::debug_span!("remote_call", bucket = %self.bucket, operation);
        fut.instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_run_is_transparent() {
        let scope = RemoteScope::new("snapshots");
        assert_eq!(scope.bucket(), "snapshots");

        let value = scope.run("probe", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = scope
            .run::<(), _>("probe", async { Err(Error::NotFound("x".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
