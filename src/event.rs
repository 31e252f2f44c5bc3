//! Event types - immutable records produced during a run

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an emitted event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Originator of a piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

/// One segment of event content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    Data { value: serde_json::Value },
}

/// Structured payload carried by an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    pub fn agent_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// First text part, if any
    pub fn text(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            Part::Text { text } => Some(text.as_str()),
            Part::Data { .. } => None,
        })
    }
}

/// An immutable record emitted during execution.
///
/// Position in the produced sequence is the only ordering signal consumers
/// have; `id` and `timestamp` identify the event for diagnostics and must
/// not be used for ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub content: Option<Content>,
}

impl Event {
    pub fn new(author: impl Into<String>, content: Option<Content>) -> Self {
        Self {
            id: EventId::new(),
            author: author.into(),
            timestamp: Utc::now(),
            content,
        }
    }

    /// Event carrying a single agent-authored text part
    pub fn agent_text(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(author, Some(Content::agent_text(text)))
    }

    /// Event recording the triggering user message
    pub fn user(content: Content) -> Self {
        Self::new("user", Some(content))
    }

    /// First text part of the content, if any
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().and_then(Content::text)
    }
}
