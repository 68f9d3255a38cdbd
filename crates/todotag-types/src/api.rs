use serde::{Deserialize, Serialize};

use crate::models::{Tag, Todo, TodoTag};

// -- JWT Claims --

/// Claims carried by the bearer token of an authenticated user. Tokens are
/// issued by the identity provider; this service only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

// -- Todos --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTodoRequest {
    pub content: String,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTodoResponse {
    pub todo: Todo,
    pub tags: Vec<TodoTag>,
    /// Tags whose join row could not be created. The todo itself was kept.
    pub failed_tag_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateContentRequest {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleDoneRequest {
    /// The value the client currently displays; the stored value becomes its negation.
    pub is_done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoWithTags {
    #[serde(flatten)]
    pub todo: Todo,
    pub tags: Vec<Tag>,
}

// -- Tags --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateNameRequest {
    #[serde(default)]
    pub name: Option<String>,
}

// -- Join rows --

#[derive(Debug, Default, Deserialize)]
pub struct TodoTagQuery {
    pub todo_id: Option<String>,
    pub tag_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CascadeResponse {
    pub id: String,
    /// Number of join rows removed before the parent.
    pub detached: usize,
}

// -- Custom queries --

#[derive(Debug, Deserialize)]
pub struct SayHelloQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse<T> {
    pub data: T,
}
