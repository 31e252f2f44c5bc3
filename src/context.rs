//! Execution context threaded through the agent tree
//!
//! One context is constructed per run and shared unchanged across the whole
//! sub-tree; only `agent_name` changes as control moves between agents.

use std::fmt;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::event::Content;
use crate::session::SessionHandle;

/// Identifies one top-level invocation of an agent tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationId(Uuid);

impl InvocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-run bundle handed to every agent in the tree.
///
/// Cloning shares the session reference and the cancellation token.
#[derive(Clone)]
pub struct ExecutionContext {
    pub invocation_id: InvocationId,
    /// Name of the agent currently holding control
    pub agent_name: String,
    pub session: SessionHandle,
    pub user_message: Content,
    cancellation: CancellationToken,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("invocation_id", &self.invocation_id)
            .field("agent_name", &self.agent_name)
            .field("session", &self.session.key.to_string())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl ExecutionContext {
    /// Context with a fresh cancellation token
    pub fn new(session: SessionHandle, user_message: Content) -> Self {
        Self::with_cancellation(session, user_message, CancellationToken::new())
    }

    /// Context driven by an externally held cancellation token
    pub fn with_cancellation(
        session: SessionHandle,
        user_message: Content,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            invocation_id: InvocationId::new(),
            agent_name: String::new(),
            session,
            user_message,
            cancellation,
        }
    }

    /// Same run, with control handed to `name`
    pub fn for_agent(&self, name: &str) -> Self {
        let mut ctx = self.clone();
        ctx.agent_name = name.to_string();
        ctx
    }

    /// Text of the triggering user message; empty when the message carries
    /// no text part
    pub fn request_text(&self) -> &str {
        self.user_message.text().unwrap_or("")
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the run's cancellation signal is raised
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionService;

    fn test_context(text: &str) -> ExecutionContext {
        let service = SessionService::new();
        let session = service.create_session("app", "u", "s").unwrap();
        ExecutionContext::new(session, Content::user_text(text))
    }

    #[test]
    fn test_request_text() {
        let ctx = test_context("what is the time?");
        assert_eq!(ctx.request_text(), "what is the time?");
    }

    #[test]
    fn test_for_agent_shares_run() {
        let ctx = test_context("hi");
        let child = ctx.for_agent("worker");

        assert_eq!(child.agent_name, "worker");
        assert_eq!(child.invocation_id, ctx.invocation_id);

        ctx.cancellation().cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_fresh_context_is_not_cancelled() {
        let ctx = test_context("hi");
        assert!(!ctx.is_cancelled());
    }
}
