use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use todotag_db::models::{TagRow, TodoRow, TodoTagRow};
use todotag_db::{ColumnEq, Database};
use todotag_types::models::{
    ModelKind, NewTag, NewTodo, NewTodoTag, Tag, TagPatch, Todo, TodoPatch, TodoTag, TodoTagPatch,
};
use todotag_types::options::{CallOptions, FieldValue, Filter};

use crate::collection::{Collection, DataClient};
use crate::error::ServiceError;
use crate::feed::{ChangeFeed, Subscription};
use crate::policy::{self, Access, Caller};

/// SQLite-backed data service shared by every request.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<BackendInner>,
}

struct BackendInner {
    db: Database,
    feed: ChangeFeed,
    api_key: String,
}

impl Backend {
    pub fn new(db: Database, api_key: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(BackendInner {
                db,
                feed: ChangeFeed::new(),
                api_key: api_key.into(),
            }),
        }
    }

    /// A client acting with the given caller's credentials.
    pub fn client(&self, caller: Caller) -> LocalClient {
        LocalClient {
            backend: self.clone(),
            caller: Arc::new(caller),
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.inner.feed
    }
}

#[derive(Clone)]
pub struct LocalClient {
    backend: Backend,
    caller: Arc<Caller>,
}

impl LocalClient {
    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    fn authorize(&self, kind: ModelKind, options: CallOptions) -> Result<Access, ServiceError> {
        policy::authorize(kind, options, &self.caller, &self.backend.inner.api_key)
    }

    /// Owner `sub` for Todo calls.
    fn owner(&self, options: CallOptions) -> Result<String, ServiceError> {
        match self.authorize(ModelKind::Todo, options)? {
            Access::Owner(sub) => Ok(sub),
            Access::Public => Err(ServiceError::Unauthorized(
                "Todo requires an owner identity".into(),
            )),
        }
    }

    /// Run a blocking DB call off the async runtime.
    async fn blocking<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.backend.inner.clone();
        tokio::task::spawn_blocking(move || f(&inner.db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ServiceError::Backend(e.to_string())
            })?
            .map_err(|e| {
                error!("DB error: {}", e);
                ServiceError::from(e)
            })
    }

    fn publish(&self, kind: ModelKind) {
        self.backend.inner.feed.publish(kind);
    }
}

impl DataClient for LocalClient {
    fn todos(&self) -> &dyn Collection<Todo> {
        self
    }

    fn tags(&self) -> &dyn Collection<Tag> {
        self
    }

    fn todo_tags(&self) -> &dyn Collection<TodoTag> {
        self
    }
}

// -- Todos --

#[async_trait]
impl Collection<Todo> for LocalClient {
    async fn create(&self, fields: NewTodo, options: CallOptions) -> Result<Todo, ServiceError> {
        let owner = self.owner(options)?;
        let id = new_id(fields.id);

        let target = id.clone();
        let row = self
            .blocking(move |db| db.insert_todo(&target, &fields.content, fields.is_done, &owner))
            .await?
            .ok_or_else(|| ServiceError::Validation(format!("Todo {} already exists", id)))?;

        self.publish(ModelKind::Todo);
        debug!("Created Todo {}", row.id);
        Ok(todo_from_row(row))
    }

    async fn update(&self, patch: TodoPatch, options: CallOptions) -> Result<Todo, ServiceError> {
        let owner = self.owner(options)?;
        let id = patch.id.clone();

        let row = self
            .blocking(move |db| match db.get_todo(&patch.id)? {
                Some(row) if row.owner == owner => {
                    db.update_todo(&patch.id, patch.content.as_deref(), patch.is_done)
                }
                _ => Ok(None),
            })
            .await?
            .ok_or_else(|| ServiceError::not_found(ModelKind::Todo, id))?;

        self.publish(ModelKind::Todo);
        Ok(todo_from_row(row))
    }

    async fn delete(&self, id: &str, options: CallOptions) -> Result<(), ServiceError> {
        let owner = self.owner(options)?;

        let target = id.to_string();
        let deleted = self
            .blocking(move |db| match db.get_todo(&target)? {
                Some(row) if row.owner == owner => db.delete_todo(&target),
                _ => Ok(false),
            })
            .await?;

        if !deleted {
            return Err(ServiceError::not_found(ModelKind::Todo, id));
        }

        self.publish(ModelKind::Todo);
        debug!("Deleted Todo {}", id);
        Ok(())
    }

    async fn get(&self, id: &str, options: CallOptions) -> Result<Option<Todo>, ServiceError> {
        let owner = self.owner(options)?;

        let target = id.to_string();
        let row = self.blocking(move |db| db.get_todo(&target)).await?;

        Ok(row.filter(|row| row.owner == owner).map(todo_from_row))
    }

    async fn list(&self, filter: Filter, options: CallOptions) -> Result<Vec<Todo>, ServiceError> {
        let owner = self.owner(options)?;

        let mut columns = to_columns(ModelKind::Todo, filter)?;
        columns.push(ColumnEq::new("owner", owner));
        let rows = self.blocking(move |db| db.list_todos(&columns)).await?;

        Ok(rows.into_iter().map(todo_from_row).collect())
    }

    fn observe_query(&self, options: CallOptions) -> Result<Subscription<Todo>, ServiceError> {
        self.owner(options)?;

        let changes = self.backend.feed().subscribe();
        let client = self.clone();
        Ok(Subscription::spawn(changes, move || {
            let client = client.clone();
            async move { Collection::<Todo>::list(&client, Filter::all(), options).await }.boxed()
        }))
    }
}

// -- Tags --

#[async_trait]
impl Collection<Tag> for LocalClient {
    async fn create(&self, fields: NewTag, options: CallOptions) -> Result<Tag, ServiceError> {
        self.authorize(ModelKind::Tag, options)?;
        let id = new_id(fields.id);

        let target = id.clone();
        let row = self
            .blocking(move |db| db.insert_tag(&target, &fields.name))
            .await?
            .ok_or_else(|| ServiceError::Validation(format!("Tag {} already exists", id)))?;

        self.publish(ModelKind::Tag);
        debug!("Created Tag {}", row.id);
        Ok(tag_from_row(row))
    }

    async fn update(&self, patch: TagPatch, options: CallOptions) -> Result<Tag, ServiceError> {
        self.authorize(ModelKind::Tag, options)?;
        let id = patch.id.clone();

        let row = self
            .blocking(move |db| db.update_tag(&patch.id, patch.name.as_deref()))
            .await?
            .ok_or_else(|| ServiceError::not_found(ModelKind::Tag, id))?;

        self.publish(ModelKind::Tag);
        Ok(tag_from_row(row))
    }

    async fn delete(&self, id: &str, options: CallOptions) -> Result<(), ServiceError> {
        self.authorize(ModelKind::Tag, options)?;

        let target = id.to_string();
        if !self.blocking(move |db| db.delete_tag(&target)).await? {
            return Err(ServiceError::not_found(ModelKind::Tag, id));
        }

        self.publish(ModelKind::Tag);
        debug!("Deleted Tag {}", id);
        Ok(())
    }

    async fn get(&self, id: &str, options: CallOptions) -> Result<Option<Tag>, ServiceError> {
        self.authorize(ModelKind::Tag, options)?;

        let target = id.to_string();
        let row = self.blocking(move |db| db.get_tag(&target)).await?;
        Ok(row.map(tag_from_row))
    }

    async fn list(&self, filter: Filter, options: CallOptions) -> Result<Vec<Tag>, ServiceError> {
        self.authorize(ModelKind::Tag, options)?;

        let columns = to_columns(ModelKind::Tag, filter)?;
        let rows = self.blocking(move |db| db.list_tags(&columns)).await?;
        Ok(rows.into_iter().map(tag_from_row).collect())
    }

    fn observe_query(&self, options: CallOptions) -> Result<Subscription<Tag>, ServiceError> {
        self.authorize(ModelKind::Tag, options)?;

        let changes = self.backend.feed().subscribe();
        let client = self.clone();
        Ok(Subscription::spawn(changes, move || {
            let client = client.clone();
            async move { Collection::<Tag>::list(&client, Filter::all(), options).await }.boxed()
        }))
    }
}

// -- TodoTags --

#[async_trait]
impl Collection<TodoTag> for LocalClient {
    async fn create(
        &self,
        fields: NewTodoTag,
        options: CallOptions,
    ) -> Result<TodoTag, ServiceError> {
        self.authorize(ModelKind::TodoTag, options)?;
        if fields.todo_id.is_empty() || fields.tag_id.is_empty() {
            return Err(ServiceError::Validation(
                "TodoTag requires both todo_id and tag_id".into(),
            ));
        }
        let id = new_id(fields.id);

        let target = id.clone();
        let row = self
            .blocking(move |db| db.insert_todo_tag(&target, &fields.todo_id, &fields.tag_id))
            .await?
            .ok_or_else(|| ServiceError::Validation(format!("TodoTag {} already exists", id)))?;

        self.publish(ModelKind::TodoTag);
        Ok(todo_tag_from_row(row))
    }

    async fn update(
        &self,
        patch: TodoTagPatch,
        options: CallOptions,
    ) -> Result<TodoTag, ServiceError> {
        self.authorize(ModelKind::TodoTag, options)?;
        if patch.todo_id.as_deref() == Some("") || patch.tag_id.as_deref() == Some("") {
            return Err(ServiceError::Validation(
                "TodoTag references cannot be blank".into(),
            ));
        }
        let id = patch.id.clone();

        let row = self
            .blocking(move |db| {
                db.update_todo_tag(&patch.id, patch.todo_id.as_deref(), patch.tag_id.as_deref())
            })
            .await?
            .ok_or_else(|| ServiceError::not_found(ModelKind::TodoTag, id))?;

        self.publish(ModelKind::TodoTag);
        Ok(todo_tag_from_row(row))
    }

    async fn delete(&self, id: &str, options: CallOptions) -> Result<(), ServiceError> {
        self.authorize(ModelKind::TodoTag, options)?;

        let target = id.to_string();
        if !self.blocking(move |db| db.delete_todo_tag(&target)).await? {
            return Err(ServiceError::not_found(ModelKind::TodoTag, id));
        }

        self.publish(ModelKind::TodoTag);
        Ok(())
    }

    async fn get(&self, id: &str, options: CallOptions) -> Result<Option<TodoTag>, ServiceError> {
        self.authorize(ModelKind::TodoTag, options)?;

        let target = id.to_string();
        let row = self.blocking(move |db| db.get_todo_tag(&target)).await?;
        Ok(row.map(todo_tag_from_row))
    }

    async fn list(
        &self,
        filter: Filter,
        options: CallOptions,
    ) -> Result<Vec<TodoTag>, ServiceError> {
        self.authorize(ModelKind::TodoTag, options)?;

        let columns = to_columns(ModelKind::TodoTag, filter)?;
        let rows = self.blocking(move |db| db.list_todo_tags(&columns)).await?;
        Ok(rows.into_iter().map(todo_tag_from_row).collect())
    }

    fn observe_query(&self, options: CallOptions) -> Result<Subscription<TodoTag>, ServiceError> {
        self.authorize(ModelKind::TodoTag, options)?;

        let changes = self.backend.feed().subscribe();
        let client = self.clone();
        Ok(Subscription::spawn(changes, move || {
            let client = client.clone();
            async move { Collection::<TodoTag>::list(&client, Filter::all(), options).await }
                .boxed()
        }))
    }
}

// -- Helpers --

fn new_id(requested: Option<String>) -> String {
    requested
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Map filter fields onto table columns. Unknown fields are a validation error.
fn to_columns(kind: ModelKind, filter: Filter) -> Result<Vec<ColumnEq>, ServiceError> {
    filter
        .conditions
        .into_iter()
        .map(|cond| {
            let column = column_for(kind, &cond.field).ok_or_else(|| {
                ServiceError::Validation(format!("{} has no field '{}'", kind, cond.field))
            })?;
            Ok(match cond.eq {
                FieldValue::Str(value) => ColumnEq::new(column, value),
                FieldValue::Bool(value) => ColumnEq::new(column, value),
            })
        })
        .collect()
}

fn column_for(kind: ModelKind, field: &str) -> Option<&'static str> {
    match (kind, field) {
        (_, "id") => Some("id"),
        (ModelKind::Todo, "content") => Some("content"),
        (ModelKind::Todo, "is_done") => Some("is_done"),
        (ModelKind::Todo, "owner") => Some("owner"),
        (ModelKind::Tag, "name") => Some("name"),
        (ModelKind::TodoTag, "todo_id") => Some("todo_id"),
        (ModelKind::TodoTag, "tag_id") => Some("tag_id"),
        _ => None,
    }
}

fn parse_timestamp(value: &str, id: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on row '{}': {}", value, id, e);
            DateTime::default()
        })
}

fn todo_from_row(row: TodoRow) -> Todo {
    Todo {
        created_at: parse_timestamp(&row.created_at, &row.id),
        updated_at: parse_timestamp(&row.updated_at, &row.id),
        id: row.id,
        content: row.content,
        is_done: row.is_done,
        owner: row.owner,
    }
}

fn tag_from_row(row: TagRow) -> Tag {
    Tag {
        created_at: parse_timestamp(&row.created_at, &row.id),
        updated_at: parse_timestamp(&row.updated_at, &row.id),
        id: row.id,
        name: row.name,
    }
}

fn todo_tag_from_row(row: TodoTagRow) -> TodoTag {
    TodoTag {
        created_at: parse_timestamp(&row.created_at, &row.id),
        updated_at: parse_timestamp(&row.updated_at, &row.id),
        id: row.id,
        todo_id: row.todo_id,
        tag_id: row.tag_id,
    }
}
