//! External capability interface consumed by leaf agents

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Point-in-time copy of session state handed to a capability
pub type StateSnapshot = HashMap<String, Value>;

/// Failure surfaced by an external capability.
///
/// A capability either produces a single result value or fails with one of
/// these; partial or ambiguous results are not representable.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("missing field in response: {0}")]
    MissingField(&'static str),
}

/// A unit of external work invoked by a leaf agent.
///
/// Implementations receive the triggering request text and a snapshot of the
/// session state at invocation time. Retry policy, if any, belongs to the
/// implementation; the orchestration core never retries.
#[async_trait]
pub trait Capability: Send + Sync {
    async fn invoke(&self, request: &str, state: StateSnapshot) -> Result<Value, CapabilityError>;
}

/// Adapts a plain async function into a [`Capability`].
pub struct FnCapability<F>(F);

impl<F, Fut> FnCapability<F>
where
    F: Fn(String, StateSnapshot) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, CapabilityError>> + Send,
{
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

#[async_trait]
impl<F, Fut> Capability for FnCapability<F>
where
    F: Fn(String, StateSnapshot) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, CapabilityError>> + Send,
{
    async fn invoke(&self, request: &str, state: StateSnapshot) -> Result<Value, CapabilityError> {
        (self.0)(request.to_string(), state).await
    }
}
