//! # Troupe
//!
//! Hierarchical agent orchestration core - composable agent trees over
//! shared session state.
//!
//! Agents are arranged into trees with two composition operators plus one
//! deterministic router; every agent consumes a shared session and a user
//! request and produces a lazy stream of events.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         RUNNER                          │
//! │   fetch session → build context → drive the root agent  │
//! └────────────────────────────┬────────────────────────────┘
//!                              │ ExecutionContext
//!                              ▼
//!                      ┌───────────────┐
//!                      │    Router     │  first matching rule wins
//!                      └───┬───────┬───┘
//!                          ▼       ▼
//!                ┌────────────┐ ┌────────────┐
//!                │ Sequential │ │  Parallel  │
//!                └──┬──────┬──┘ └──┬──────┬──┘
//!                   ▼      ▼       ▼      ▼
//!                 ┌────┐ ┌────┐  ┌────┐ ┌────┐
//!                 │Leaf│ │Leaf│  │Leaf│ │Leaf│
//!                 └────┘ └────┘  └────┘ └────┘
//! ```
//!
//! ## Key Concepts
//!
//! - **Agent**: the polymorphic unit of execution; a closed set of variants
//! - **Leaf**: invokes exactly one external capability
//! - **Sequential/Parallel**: run children in strict order / with
//!   concurrent overlap
//! - **Router**: deterministic keyword dispatch to exactly one branch
//! - **Session**: per-(app, user, session) state map plus event history,
//!   the only inter-agent channel besides delegation
//! - **Event**: an immutable, ordered record of output produced during a run

pub mod agent;
pub mod capabilities;
pub mod capability;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod router;
pub mod runner;
pub mod session;

pub use agent::{Agent, EventStream, LeafAgent, ParallelAgent, SequentialAgent};
pub use capability::{Capability, CapabilityError, FnCapability, StateSnapshot};
pub use config::EngineConfig;
pub use context::{ExecutionContext, InvocationId};
pub use error::{AgentError, ChildFailure};
pub use event::{Content, Event, EventId, Part, Role};
pub use router::{RouteRule, RouterAgent};
pub use runner::Runner;
pub use session::{Session, SessionHandle, SessionKey, SessionService};
