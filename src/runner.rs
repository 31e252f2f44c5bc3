//! Top-level driver - one execution context per run

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agent::{Agent, EventStream};
use crate::context::ExecutionContext;
use crate::error::AgentError;
use crate::event::{Content, Event};
use crate::session::SessionService;

/// Drives a root agent against sessions of one application.
///
/// The runner is a thin pass-through: it fetches the session, constructs
/// exactly one [`ExecutionContext`] per run, and forwards the root agent's
/// events without reordering or dropping any. Each forwarded event (and the
/// triggering user message) is appended to the session history as it passes
/// through.
pub struct Runner {
    app_name: String,
    agent: Arc<Agent>,
    sessions: Arc<SessionService>,
}

impl Runner {
    pub fn new(
        app_name: impl Into<String>,
        agent: Arc<Agent>,
        sessions: Arc<SessionService>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            agent,
            sessions,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn sessions(&self) -> &Arc<SessionService> {
        &self.sessions
    }

    /// Run the root agent for an existing session.
    ///
    /// Session creation is the caller's explicit, separate call; a missing
    /// triple fails with [`AgentError::SessionNotFound`] before anything
    /// executes.
    pub fn run(
        &self,
        user_id: &str,
        session_id: &str,
        message: Content,
    ) -> Result<EventStream, AgentError> {
        self.run_with_cancellation(user_id, session_id, message, CancellationToken::new())
    }

    /// Like [`Runner::run`], with an externally held cancellation token.
    /// Cancelling the token stops every agent in the tree at its next
    /// suspension point.
    pub fn run_with_cancellation(
        &self,
        user_id: &str,
        session_id: &str,
        message: Content,
        cancellation: CancellationToken,
    ) -> Result<EventStream, AgentError> {
        let session = self
            .sessions
            .get_session(&self.app_name, user_id, session_id)?;

        session.push_event(Event::user(message.clone()));

        let ctx = ExecutionContext::with_cancellation(session.clone(), message, cancellation);
        info!(
            invocation = %ctx.invocation_id,
            app = %self.app_name,
            user = %user_id,
            session = %session_id,
            agent = %self.agent.name(),
            "starting run",
        );

        let mut events = self.agent.run(ctx);
        let stream = async_stream::try_stream! {
            while let Some(item) = events.next().await {
                let event = item?;
                session.push_event(event.clone());
                yield event;
            }
        };

        Ok(Box::pin(stream))
    }
}
