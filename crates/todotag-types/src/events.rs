use serde::{Deserialize, Serialize};

use crate::models::{ModelKind, Tag, Todo, TodoTag};
use crate::options::AuthMode;

/// Events sent over the live-query gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Connection accepted; `username` is absent for key-only callers
    Ready { username: Option<String> },

    /// Full current result set of an observed Todo query
    Todos { items: Vec<Todo> },

    /// Full current result set of an observed Tag query
    Tags { items: Vec<Tag> },

    /// Full current result set of an observed TodoTag query
    TodoTags { items: Vec<TodoTag> },

    /// A command was refused
    Error { model: Option<ModelKind>, message: String },
}

impl GatewayEvent {
    /// The collection a snapshot event belongs to.
    pub fn model(&self) -> Option<ModelKind> {
        match self {
            Self::Todos { .. } => Some(ModelKind::Todo),
            Self::Tags { .. } => Some(ModelKind::Tag),
            Self::TodoTags { .. } => Some(ModelKind::TodoTag),
            Self::Error { model, .. } => *model,
            Self::Ready { .. } => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Start a live query over a collection. Replaces any existing one for that model.
    Observe {
        model: ModelKind,
        #[serde(default)]
        auth_mode: Option<AuthMode>,
    },

    /// Cancel the live query over a collection
    Unobserve { model: ModelKind },
}
