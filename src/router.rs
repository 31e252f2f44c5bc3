//! Deterministic keyword routing
//!
//! The router inspects the request text against an ordered rule list and
//! delegates to exactly one branch (or none, falling back to a fixed
//! message). Dispatch progress follows a strict contract:
//!
//! Idle → Inspecting → Dispatched(branch) → Finalizing → Done, or
//! Idle → Inspecting → NoMatch → Done.
//!
//! Routing is deterministic and side-effect-free until a branch is chosen;
//! rule order is significant and preserved exactly.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::agent::{render_value, Agent, EventStream};
use crate::context::ExecutionContext;
use crate::error::AgentError;
use crate::event::Event;

/// One ordered matching rule.
///
/// A rule matches when any of its keywords is a substring of the lower-cased
/// request text. The first matching rule in declaration order selects the
/// branch; later rules are never consulted.
#[derive(Debug, Clone)]
pub struct RouteRule {
    branch: String,
    keywords: Vec<String>,
    state_key: String,
    summary_prefix: String,
    missing_placeholder: String,
}

impl RouteRule {
    pub fn new(
        branch: impl Into<String>,
        keywords: impl IntoIterator<Item = impl Into<String>>,
        state_key: impl Into<String>,
    ) -> Self {
        Self {
            branch: branch.into(),
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
            state_key: state_key.into(),
            summary_prefix: String::new(),
            missing_placeholder: "unknown".to_string(),
        }
    }

    /// Prefix prepended to the branch's state value in the final summary
    pub fn with_summary_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.summary_prefix = prefix.into();
        self
    }

    /// Placeholder substituted when the branch never wrote its state key.
    /// A degenerate path, not an error.
    pub fn with_missing_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.missing_placeholder = placeholder.into();
        self
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|k| normalized.contains(k.as_str()))
    }
}

/// Dispatch progress for one router invocation
#[derive(Debug, Clone, PartialEq, Eq)]
enum RouterState {
    Idle,
    Inspecting,
    Dispatched(String),
    Finalizing(String),
    NoMatch,
    Done,
}

fn transition(router: &str, from: &RouterState, to: RouterState) -> RouterState {
    debug!(router = %router, from = ?from, to = ?to, "router transition");
    to
}

/// Deterministic dispatch over a fixed, finite set of named branches.
///
/// Always emits exactly one terminal event authored by the router, in
/// addition to whatever events the delegated branch produced.
pub struct RouterAgent {
    name: String,
    rules: Vec<RouteRule>,
    branches: Vec<(String, Arc<Agent>)>,
    fallback: String,
}

impl RouterAgent {
    /// Build a router, validating that every rule's branch is wired.
    pub fn new(
        name: impl Into<String>,
        rules: Vec<RouteRule>,
        branches: Vec<(String, Arc<Agent>)>,
        fallback: impl Into<String>,
    ) -> Result<Self, AgentError> {
        let name = name.into();
        for rule in &rules {
            if !branches.iter().any(|(b, _)| b == &rule.branch) {
                return Err(AgentError::UnknownBranch {
                    router: name,
                    branch: rule.branch.clone(),
                });
            }
        }
        Ok(Self {
            name,
            rules,
            branches,
            fallback: fallback.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First rule matching the request text, in declaration order.
    /// Pure: no state is touched until a branch is dispatched.
    fn select_rule<'a>(rules: &'a [RouteRule], request: &str) -> Option<&'a RouteRule> {
        let normalized = request.to_lowercase();
        rules.iter().find(|rule| rule.matches(&normalized))
    }

    pub(crate) fn run(&self, ctx: ExecutionContext) -> EventStream {
        let name = self.name.clone();
        let rules = self.rules.clone();
        let branches = self.branches.clone();
        let fallback = self.fallback.clone();

        Box::pin(async_stream::try_stream! {
            let mut state = RouterState::Idle;
            state = transition(&name, &state, RouterState::Inspecting);

            let selected = Self::select_rule(&rules, ctx.request_text()).cloned();

            let summary = match selected {
                Some(rule) => {
                    state = transition(
                        &name,
                        &state,
                        RouterState::Dispatched(rule.branch.clone()),
                    );
                    info!(router = %name, branch = %rule.branch, "dispatching");

                    // Wired branches are validated at construction.
                    let branch = branches
                        .iter()
                        .find(|(b, _)| b == &rule.branch)
                        .map(|(_, agent)| Arc::clone(agent))
                        .ok_or_else(|| AgentError::UnknownBranch {
                            router: name.clone(),
                            branch: rule.branch.clone(),
                        })?;

                    let mut events = branch.run(ctx.clone());
                    while let Some(event) = events.next().await {
                        yield event?;
                    }

                    state = transition(
                        &name,
                        &state,
                        RouterState::Finalizing(rule.branch.clone()),
                    );
                    let rendered = match ctx.session.state_get(&rule.state_key) {
                        Some(value) => render_value(&value),
                        None => {
                            warn!(
                                router = %name,
                                branch = %rule.branch,
                                state_key = %rule.state_key,
                                "branch completed without writing its state key",
                            );
                            rule.missing_placeholder.clone()
                        }
                    };
                    format!("{}{}", rule.summary_prefix, rendered)
                }
                None => {
                    state = transition(&name, &state, RouterState::NoMatch);
                    debug!(router = %name, "no rule matched");
                    fallback.clone()
                }
            };

            state = transition(&name, &state, RouterState::Done);
            let _ = state;
            info!(router = %name, summary = %summary, "routing complete");

            yield Event::agent_text(&name, summary);
        })
    }
}
