use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three collections exposed by the data service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Todo,
    Tag,
    TodoTag,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "Todo",
            Self::Tag => "Tag",
            Self::TodoTag => "TodoTag",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ties a record type to its create/patch inputs and its collection.
pub trait Model: Clone + Send + Sync + 'static {
    const KIND: ModelKind;
    type Create: Send + Sync + 'static;
    type Patch: Send + Sync + 'static;

    fn id(&self) -> &str;
}

// -- Todo --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub content: String,
    pub is_done: bool,
    /// Stamped by the data service from the creating user's `sub`.
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTodo {
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub is_done: bool,
}

impl NewTodo {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            is_done: false,
        }
    }
}

/// Partial update: `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoPatch {
    pub id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_done: Option<bool>,
}

impl Model for Todo {
    const KIND: ModelKind = ModelKind::Todo;
    type Create = NewTodo;
    type Patch = TodoPatch;

    fn id(&self) -> &str {
        &self.id
    }
}

// -- Tag --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTag {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

impl NewTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagPatch {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Model for Tag {
    const KIND: ModelKind = ModelKind::Tag;
    type Create = NewTag;
    type Patch = TagPatch;

    fn id(&self) -> &str {
        &self.id
    }
}

// -- TodoTag --

/// Join row for the Todo <-> Tag many-to-many relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoTag {
    pub id: String,
    pub todo_id: String,
    pub tag_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTodoTag {
    #[serde(default)]
    pub id: Option<String>,
    pub todo_id: String,
    pub tag_id: String,
}

impl NewTodoTag {
    pub fn new(todo_id: impl Into<String>, tag_id: impl Into<String>) -> Self {
        Self {
            id: None,
            todo_id: todo_id.into(),
            tag_id: tag_id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoTagPatch {
    pub id: String,
    #[serde(default)]
    pub todo_id: Option<String>,
    #[serde(default)]
    pub tag_id: Option<String>,
}

impl Model for TodoTag {
    const KIND: ModelKind = ModelKind::TodoTag;
    type Create = NewTodoTag;
    type Patch = TodoTagPatch;

    fn id(&self) -> &str {
        &self.id
    }
}
