use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use todotag_data::{DataClient, ServiceError};
use todotag_types::models::{
    ModelKind, NewTag, NewTodo, NewTodoTag, Tag, TagPatch, Todo, TodoPatch, TodoTag,
};
use todotag_types::options::{AuthMode, CallOptions, Filter};

use crate::error::ProtocolError;
use crate::prompt::{ValuePrompt, ask};

/// Todo is owner-scoped.
pub(crate) const TODO_OPTIONS: CallOptions = CallOptions {
    auth_mode: Some(AuthMode::UserPool),
};

/// Tag and TodoTag sit behind the shared key.
pub(crate) const SHARED_OPTIONS: CallOptions = CallOptions {
    auth_mode: Some(AuthMode::ApiKey),
};

/// Keeps `TodoTag` join rows consistent with the `Todo` and `Tag` rows they
/// reference. The data service performs no cascading delete, so every parent
/// delete goes through here.
#[derive(Clone)]
pub struct RelationshipManager {
    client: Arc<dyn DataClient>,
}

#[derive(Debug, Clone)]
pub struct CreatedTodo {
    pub todo: Todo,
    pub tags: Vec<TodoTag>,
    pub failed_tag_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    pub id: String,
    pub detached: usize,
}

impl RelationshipManager {
    pub fn new(client: Arc<dyn DataClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &dyn DataClient {
        self.client.as_ref()
    }

    /// Create a todo, then one join row per distinct tag id.
    ///
    /// Join rows are created concurrently and independently. An unknown tag
    /// or a failed join row is logged and reported in `failed_tag_ids`; the
    /// todo is kept.
    pub async fn create_todo_with_tags(
        &self,
        content: &str,
        tag_ids: &[String],
    ) -> Result<CreatedTodo, ProtocolError> {
        let todo = self
            .client
            .todos()
            .create(NewTodo::new(content), TODO_OPTIONS)
            .await?;

        let mut seen = HashSet::new();
        let tag_ids: Vec<&String> = tag_ids.iter().filter(|id| seen.insert(*id)).collect();

        let attempts = tag_ids.iter().map(|tag_id| self.attach_existing(&todo.id, tag_id));
        let results = join_all(attempts).await;

        let mut tags = Vec::with_capacity(results.len());
        let mut failed_tag_ids = Vec::new();
        for (tag_id, result) in tag_ids.into_iter().zip(results) {
            match result {
                Ok(row) => tags.push(row),
                Err(e) => {
                    warn!("Failed to attach tag {} to todo {}: {}", tag_id, todo.id, e);
                    failed_tag_ids.push(tag_id.clone());
                }
            }
        }

        info!(
            "Created todo {} with {} tag(s), {} failed",
            todo.id,
            tags.len(),
            failed_tag_ids.len()
        );
        Ok(CreatedTodo {
            todo,
            tags,
            failed_tag_ids,
        })
    }

    /// Create the join row only if the tag is live.
    async fn attach_existing(&self, todo_id: &str, tag_id: &str) -> Result<TodoTag, ServiceError> {
        if self.client.tags().get(tag_id, SHARED_OPTIONS).await?.is_none() {
            return Err(ServiceError::not_found(ModelKind::Tag, tag_id));
        }
        self.client
            .todo_tags()
            .create(NewTodoTag::new(todo_id, tag_id), SHARED_OPTIONS)
            .await
    }

    /// Attach an existing tag to an existing todo of the caller.
    pub async fn attach_tag(&self, todo_id: &str, tag_id: &str) -> Result<TodoTag, ProtocolError> {
        if self.client.todos().get(todo_id, TODO_OPTIONS).await?.is_none() {
            return Err(ServiceError::not_found(ModelKind::Todo, todo_id).into());
        }
        if self.client.tags().get(tag_id, SHARED_OPTIONS).await?.is_none() {
            return Err(ServiceError::not_found(ModelKind::Tag, tag_id).into());
        }

        let row = self
            .client
            .todo_tags()
            .create(NewTodoTag::new(todo_id, tag_id), SHARED_OPTIONS)
            .await?;

        debug!("Attached tag {} to todo {}", tag_id, todo_id);
        Ok(row)
    }

    /// Delete every join row of the todo, then the todo.
    ///
    /// The todo must be visible to the caller before any join row is touched.
    pub async fn delete_todo_cascade(&self, id: &str) -> Result<CascadeReport, ProtocolError> {
        if self.client.todos().get(id, TODO_OPTIONS).await?.is_none() {
            return Err(ServiceError::not_found(ModelKind::Todo, id).into());
        }

        let detached = self.detach_all(ModelKind::Todo, "todo_id", id).await?;
        self.client.todos().delete(id, TODO_OPTIONS).await?;

        info!("Deleted todo {} after detaching {} tag(s)", id, detached);
        Ok(CascadeReport {
            id: id.to_string(),
            detached,
        })
    }

    /// Delete every join row of the tag, then the tag. Todos are untouched.
    pub async fn delete_tag_cascade(&self, id: &str) -> Result<CascadeReport, ProtocolError> {
        let detached = self.detach_all(ModelKind::Tag, "tag_id", id).await?;
        self.client.tags().delete(id, SHARED_OPTIONS).await?;

        info!("Deleted tag {} after detaching {} todo(s)", id, detached);
        Ok(CascadeReport {
            id: id.to_string(),
            detached,
        })
    }

    /// Remove all join rows whose `field` equals `id`. Deletions run
    /// concurrently and the whole batch settles before returning.
    async fn detach_all(
        &self,
        parent: ModelKind,
        field: &str,
        id: &str,
    ) -> Result<usize, ProtocolError> {
        let rows = self
            .client
            .todo_tags()
            .list(Filter::eq(field, id), SHARED_OPTIONS)
            .await
            .map_err(|source| {
                error!("Failed to list TodoTag rows of {} {}: {}", parent, id, source);
                ProtocolError::JoinListFailed {
                    parent,
                    id: id.to_string(),
                    source,
                }
            })?;

        let total = rows.len();
        let deletions = rows
            .iter()
            .map(|row| self.client.todo_tags().delete(&row.id, SHARED_OPTIONS));

        let mut failures = join_all(deletions)
            .await
            .into_iter()
            .filter_map(Result::err);

        if let Some(source) = failures.next() {
            let failed = 1 + failures.count();
            error!(
                "Failed to delete {} of {} TodoTag rows of {} {}: {}",
                failed, total, parent, id, source
            );
            return Err(ProtocolError::JoinDeleteFailed {
                parent,
                id: id.to_string(),
                failed,
                total,
                source,
            });
        }

        Ok(total)
    }

    /// Store the negation of the value the caller currently sees. The stored
    /// value is not re-read, so concurrent toggles are last-write-wins.
    pub async fn toggle_done(&self, id: &str, current: bool) -> Result<Todo, ProtocolError> {
        let patch = TodoPatch {
            id: id.to_string(),
            content: None,
            is_done: Some(!current),
        };
        Ok(self.client.todos().update(patch, TODO_OPTIONS).await?)
    }

    pub async fn rename_content(
        &self,
        id: &str,
        current: &str,
        prompt: &dyn ValuePrompt,
    ) -> Result<Todo, ProtocolError> {
        let Some(content) = ask(prompt, "Update Todo content", current) else {
            debug!("Content update of todo {} cancelled", id);
            return Err(ProtocolError::UserCancelled);
        };

        let patch = TodoPatch {
            id: id.to_string(),
            content: Some(content),
            is_done: None,
        };
        Ok(self.client.todos().update(patch, TODO_OPTIONS).await?)
    }

    pub async fn rename_tag_name(
        &self,
        id: &str,
        current: &str,
        prompt: &dyn ValuePrompt,
    ) -> Result<Tag, ProtocolError> {
        let Some(name) = ask(prompt, "Update Tag name", current) else {
            debug!("Rename of tag {} cancelled", id);
            return Err(ProtocolError::UserCancelled);
        };

        let patch = TagPatch {
            id: id.to_string(),
            name: Some(name),
        };
        Ok(self.client.tags().update(patch, SHARED_OPTIONS).await?)
    }

    pub async fn create_tag(&self, prompt: &dyn ValuePrompt) -> Result<Tag, ProtocolError> {
        let Some(name) = ask(prompt, "Tag name", "") else {
            debug!("Tag creation cancelled");
            return Err(ProtocolError::UserCancelled);
        };

        Ok(self.client.tags().create(NewTag::new(name), SHARED_OPTIONS).await?)
    }
}
