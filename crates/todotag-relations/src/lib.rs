//! Relationship maintenance for the Todo <-> Tag many-to-many association.

pub mod error;
pub mod manager;
pub mod prompt;
mod view;

pub use error::ProtocolError;
pub use manager::{CascadeReport, CreatedTodo, RelationshipManager};
pub use prompt::{FixedPrompt, ValuePrompt};
