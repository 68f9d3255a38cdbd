use futures_util::future::try_join_all;

use todotag_types::api::TodoWithTags;
use todotag_types::models::Todo;
use todotag_types::options::Filter;

use crate::error::ProtocolError;
use crate::manager::{RelationshipManager, SHARED_OPTIONS, TODO_OPTIONS};

impl RelationshipManager {
    /// The caller's todos, each resolved to the tags it is attached to.
    /// Join rows pointing at a tag that no longer exists are skipped.
    pub async fn todos_with_tags(&self) -> Result<Vec<TodoWithTags>, ProtocolError> {
        let todos = self.client().todos().list(Filter::all(), TODO_OPTIONS).await?;
        try_join_all(todos.into_iter().map(|todo| self.resolve_tags(todo))).await
    }

    async fn resolve_tags(&self, todo: Todo) -> Result<TodoWithTags, ProtocolError> {
        let rows = self
            .client()
            .todo_tags()
            .list(Filter::eq("todo_id", todo.id.as_str()), SHARED_OPTIONS)
            .await?;

        let lookups = rows
            .iter()
            .map(|row| self.client().tags().get(&row.tag_id, SHARED_OPTIONS));
        let tags = try_join_all(lookups).await?.into_iter().flatten().collect();

        Ok(TodoWithTags { todo, tags })
    }
}
