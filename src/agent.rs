//! Agent variants and composition semantics
//!
//! The agent set is closed: leaves invoke one external capability, the two
//! composition operators chain or overlap their children, and the router
//! (in [`crate::router`]) picks one branch deterministically. Every variant
//! exposes the same capability: run within a context, produce a lazy event
//! stream.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::capability::Capability;
use crate::context::ExecutionContext;
use crate::error::{AgentError, ChildFailure};
use crate::event::Event;
use crate::router::RouterAgent;

/// Lazy, single-pass, finite sequence of events produced by one agent
/// invocation. Draining it to completion observes the full result; it is
/// not restartable.
pub type EventStream = BoxStream<'static, Result<Event, AgentError>>;

/// Render a capability result for event text: strings verbatim, everything
/// else as JSON.
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The polymorphic unit of execution.
///
/// The variant set is fixed and finite, so composition logic is a pure
/// function over the children; no open-ended dispatch is needed.
pub enum Agent {
    Leaf(LeafAgent),
    Sequential(SequentialAgent),
    Parallel(ParallelAgent),
    Router(RouterAgent),
}

impl Agent {
    pub fn name(&self) -> &str {
        match self {
            Agent::Leaf(a) => a.name(),
            Agent::Sequential(a) => a.name(),
            Agent::Parallel(a) => a.name(),
            Agent::Router(a) => a.name(),
        }
    }

    /// Run this agent within the given context.
    ///
    /// The returned stream is lazy: nothing executes until it is polled.
    /// The context is re-tagged with this agent's name; everything else in
    /// it is shared unchanged with the caller.
    pub fn run(&self, ctx: ExecutionContext) -> EventStream {
        let ctx = ctx.for_agent(self.name());
        match self {
            Agent::Leaf(a) => a.run(ctx),
            Agent::Sequential(a) => a.run(ctx),
            Agent::Parallel(a) => a.run(ctx),
            Agent::Router(a) => a.run(ctx),
        }
    }
}

impl From<LeafAgent> for Agent {
    fn from(agent: LeafAgent) -> Self {
        Agent::Leaf(agent)
    }
}

impl From<SequentialAgent> for Agent {
    fn from(agent: SequentialAgent) -> Self {
        Agent::Sequential(agent)
    }
}

impl From<ParallelAgent> for Agent {
    fn from(agent: ParallelAgent) -> Self {
        Agent::Parallel(agent)
    }
}

impl From<RouterAgent> for Agent {
    fn from(agent: RouterAgent) -> Self {
        Agent::Router(agent)
    }
}

/// Wraps exactly one external capability.
///
/// On success the result is written to `output_key` (when set) and a single
/// terminal event is emitted. On failure nothing is written and the stream
/// ends with the capability error.
pub struct LeafAgent {
    name: String,
    capability: Arc<dyn Capability>,
    output_key: Option<String>,
}

impl LeafAgent {
    pub fn new(name: impl Into<String>, capability: Arc<dyn Capability>) -> Self {
        Self {
            name: name.into(),
            capability,
            output_key: None,
        }
    }

    /// State key under which the result is written after the capability
    /// completes
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: ExecutionContext) -> EventStream {
        let name = self.name.clone();
        let capability = Arc::clone(&self.capability);
        let output_key = self.output_key.clone();

        Box::pin(async_stream::try_stream! {
            if ctx.is_cancelled() {
                Err(AgentError::Cancelled)?;
            }

            let request = ctx.request_text().to_string();
            let snapshot = ctx.session.snapshot();
            debug!(agent = %name, invocation = %ctx.invocation_id, "invoking capability");

            let invoked = tokio::select! {
                _ = ctx.cancelled() => Err(AgentError::Cancelled),
                result = capability.invoke(&request, snapshot) => {
                    result.map_err(|source| AgentError::Capability {
                        agent: name.clone(),
                        source,
                    })
                }
            };
            let result = invoked?;

            if let Some(key) = &output_key {
                ctx.session.state_set(key.clone(), result.clone());
            }

            yield Event::agent_text(&name, render_value(&result));
        })
    }
}

/// Ordered chain of children.
///
/// Each child's stream is fully drained, and its events re-emitted, before
/// the next child starts; child k+1 therefore observes every state write of
/// children 1..k. The first child error aborts the chain with no rollback of
/// state already written.
pub struct SequentialAgent {
    name: String,
    children: Vec<Arc<Agent>>,
}

impl SequentialAgent {
    pub fn new(name: impl Into<String>, children: Vec<Arc<Agent>>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: ExecutionContext) -> EventStream {
        let name = self.name.clone();
        let children = self.children.clone();

        Box::pin(async_stream::try_stream! {
            for child in children {
                if ctx.is_cancelled() {
                    Err(AgentError::Cancelled)?;
                }

                debug!(agent = %name, child = %child.name(), "starting child");
                let mut events = child.run(ctx.clone());
                while let Some(event) = events.next().await {
                    yield event?;
                }
            }
        })
    }
}

/// Concurrent group of children.
///
/// Children run on their own tasks so their executions overlap in time.
/// Per-child event order is preserved; cross-child interleaving is
/// unspecified. Children must write disjoint state keys - this is a caller
/// obligation, not an enforced invariant.
pub struct ParallelAgent {
    name: String,
    children: Vec<Arc<Agent>>,
}

impl ParallelAgent {
    pub fn new(name: impl Into<String>, children: Vec<Arc<Agent>>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: ExecutionContext) -> EventStream {
        let name = self.name.clone();
        let children = self.children.clone();

        Box::pin(async_stream::try_stream! {
            let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
            let mut tasks: JoinSet<Result<(), ChildFailure>> = JoinSet::new();

            for child in children {
                let ctx = ctx.clone();
                let event_tx = event_tx.clone();
                tasks.spawn(async move {
                    let child_name = child.name().to_string();
                    let mut events = child.run(ctx);
                    while let Some(item) = events.next().await {
                        match item {
                            Ok(event) => {
                                // Receiver gone means the consumer dropped the
                                // stream; stop producing.
                                if event_tx.send(event).is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                return Err(ChildFailure {
                                    child: child_name,
                                    message: err.to_string(),
                                });
                            }
                        }
                    }
                    Ok(())
                });
            }
            drop(event_tx);

            // Forward events as children produce them; the channel closes
            // once every sender is gone.
            let mut merged = UnboundedReceiverStream::new(event_rx);
            while let Some(event) = merged.next().await {
                yield event;
            }

            let mut failures = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(failure)) => failures.push(failure),
                    Err(join_err) => failures.push(ChildFailure {
                        child: name.clone(),
                        message: join_err.to_string(),
                    }),
                }
            }

            if !failures.is_empty() {
                if ctx.is_cancelled() {
                    Err(AgentError::Cancelled)?;
                }
                warn!(agent = %name, failed = failures.len(), "parallel children failed");
                Err(AgentError::Parallel { failures })?;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityError, FnCapability, StateSnapshot};
    use crate::event::Content;
    use crate::session::{SessionHandle, SessionService};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_session() -> SessionHandle {
        SessionService::new()
            .create_session("app", "user", "session")
            .unwrap()
    }

    fn test_ctx(session: &SessionHandle, text: &str) -> ExecutionContext {
        ExecutionContext::new(session.clone(), Content::user_text(text))
    }

    /// Leaf that resolves to a fixed value
    fn static_leaf(name: &str, value: Value) -> Arc<Agent> {
        let cap = FnCapability::new(move |_req, _state| {
            let value = value.clone();
            async move { Ok(value) }
        });
        Arc::new(Agent::Leaf(
            LeafAgent::new(name, Arc::new(cap)).with_output_key(name),
        ))
    }

    async fn drain(mut events: EventStream) -> (Vec<Event>, Option<AgentError>) {
        let mut collected = Vec::new();
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => collected.push(event),
                Err(err) => return (collected, Some(err)),
            }
        }
        (collected, None)
    }

    // === Leaf Tests ===

    #[tokio::test]
    async fn test_leaf_writes_output_key_and_emits_one_event() {
        let session = test_session();
        let agent = static_leaf("worker", json!("result-value"));

        let (events, err) = drain(agent.run(test_ctx(&session, "go"))).await;
        assert!(err.is_none());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].author, "worker");
        assert_eq!(events[0].text(), Some("result-value"));
        assert_eq!(session.state_get("worker"), Some(json!("result-value")));
    }

    #[tokio::test]
    async fn test_leaf_without_output_key_writes_nothing() {
        let session = test_session();
        let cap = FnCapability::new(|_req, _state| async { Ok(json!(7)) });
        let agent = Agent::Leaf(LeafAgent::new("calc", Arc::new(cap)));

        let (events, err) = drain(agent.run(test_ctx(&session, "go"))).await;
        assert!(err.is_none());
        assert_eq!(events[0].text(), Some("7"));
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_leaf_failure_aborts_with_no_state_write() {
        let session = test_session();
        let cap = FnCapability::new(|_req, _state| async {
            Err::<Value, _>(CapabilityError::Service("down".into()))
        });
        let agent = Agent::Leaf(LeafAgent::new("flaky", Arc::new(cap)).with_output_key("out"));

        let (events, err) = drain(agent.run(test_ctx(&session, "go"))).await;
        assert!(events.is_empty());
        assert!(matches!(err, Some(AgentError::Capability { agent, .. }) if agent == "flaky"));
        assert!(session.state_get("out").is_none());
    }

    #[tokio::test]
    async fn test_cancelled_leaf_never_invokes_capability() {
        let session = test_session();
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let cap = FnCapability::new(|_req, _state| async {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(json!("never"))
        });
        let agent = Agent::Leaf(LeafAgent::new("slow", Arc::new(cap)));

        let ctx = test_ctx(&session, "go");
        ctx.cancellation().cancel();

        let (events, err) = drain(agent.run(ctx)).await;
        assert!(events.is_empty());
        assert!(matches!(err, Some(AgentError::Cancelled)));
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    // === Sequential Tests ===

    #[tokio::test]
    async fn test_sequential_orders_events_and_state() {
        let session = test_session();

        let first = static_leaf("first", json!("a"));
        // Second child proves it observes the first child's write.
        let second_cap = FnCapability::new(|_req, state: StateSnapshot| async move {
            match state.get("first") {
                Some(v) => Ok(json!(format!("saw-{}", v.as_str().unwrap()))),
                None => Err(CapabilityError::MissingField("first")),
            }
        });
        let second = Arc::new(Agent::Leaf(
            LeafAgent::new("second", Arc::new(second_cap)).with_output_key("second"),
        ));

        let chain = Agent::Sequential(SequentialAgent::new("chain", vec![first, second]));
        let (events, err) = drain(chain.run(test_ctx(&session, "go"))).await;

        assert!(err.is_none());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].author, "first");
        assert_eq!(events[1].author, "second");
        assert_eq!(session.state_get("second"), Some(json!("saw-a")));
    }

    #[tokio::test]
    async fn test_sequential_fail_fast_skips_later_children() {
        let session = test_session();
        let failing_cap = FnCapability::new(|_req, _state| async {
            Err::<Value, _>(CapabilityError::Service("down".into()))
        });
        let failing = Arc::new(Agent::Leaf(LeafAgent::new("broken", Arc::new(failing_cap))));
        let never = static_leaf("never", json!("x"));

        let chain = Agent::Sequential(SequentialAgent::new("chain", vec![failing, never]));
        let (events, err) = drain(chain.run(test_ctx(&session, "go"))).await;

        assert!(events.is_empty());
        assert!(matches!(err, Some(AgentError::Capability { .. })));
        assert!(session.state_get("never").is_none());
    }

    // === Parallel Tests ===

    #[tokio::test]
    async fn test_parallel_disjoint_writes_both_land() {
        let session = test_session();
        let group = Agent::Parallel(ParallelAgent::new(
            "group",
            vec![
                static_leaf("left", json!("L")),
                static_leaf("right", json!("R")),
            ],
        ));

        let (events, err) = drain(group.run(test_ctx(&session, "go"))).await;
        assert!(err.is_none());
        assert_eq!(events.len(), 2);
        assert_eq!(session.state_get("left"), Some(json!("L")));
        assert_eq!(session.state_get("right"), Some(json!("R")));
    }

    #[tokio::test]
    async fn test_parallel_aggregate_failure_lists_failed_children() {
        let session = test_session();
        let fail_a = FnCapability::new(|_req, _state| async {
            Err::<Value, _>(CapabilityError::Service("a down".into()))
        });
        let fail_b = FnCapability::new(|_req, _state| async {
            Err::<Value, _>(CapabilityError::Service("b down".into()))
        });
        let group = Agent::Parallel(ParallelAgent::new(
            "group",
            vec![
                Arc::new(Agent::Leaf(LeafAgent::new("a", Arc::new(fail_a)))),
                Arc::new(Agent::Leaf(LeafAgent::new("b", Arc::new(fail_b)))),
                static_leaf("healthy", json!("ok")),
            ],
        ));

        let (events, err) = drain(group.run(test_ctx(&session, "go"))).await;

        // The healthy sibling completed and its write stands.
        assert_eq!(events.len(), 1);
        assert_eq!(session.state_get("healthy"), Some(json!("ok")));

        match err {
            Some(AgentError::Parallel { failures }) => {
                let mut failed: Vec<_> = failures.iter().map(|f| f.child.as_str()).collect();
                failed.sort_unstable();
                assert_eq!(failed, vec!["a", "b"]);
            }
            other => panic!("expected aggregate failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nested_parallel_inside_sequential() {
        let session = test_session();
        let group = Arc::new(Agent::Parallel(ParallelAgent::new(
            "stage",
            vec![
                static_leaf("pros", json!("benefits")),
                static_leaf("cons", json!("drawbacks")),
            ],
        )));

        let synth_cap = FnCapability::new(|_req, state: StateSnapshot| async move {
            let pros = state.get("pros").cloned();
            let cons = state.get("cons").cloned();
            match (pros, cons) {
                (Some(p), Some(c)) => Ok(json!(format!(
                    "{} vs {}",
                    p.as_str().unwrap(),
                    c.as_str().unwrap()
                ))),
                _ => Err(CapabilityError::MissingField("pros/cons")),
            }
        });
        let synth = Arc::new(Agent::Leaf(
            LeafAgent::new("synth", Arc::new(synth_cap)).with_output_key("verdict"),
        ));

        let pipeline = Agent::Sequential(SequentialAgent::new("pipeline", vec![group, synth]));
        let (events, err) = drain(pipeline.run(test_ctx(&session, "go"))).await;

        assert!(err.is_none());
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].author, "synth");
        assert_eq!(
            session.state_get("verdict"),
            Some(json!("benefits vs drawbacks"))
        );
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!("plain")), "plain");
        assert_eq!(render_value(&json!(14)), "14");
        assert_eq!(render_value(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
