use async_trait::async_trait;

use todotag_types::models::{Model, Tag, Todo, TodoTag};
use todotag_types::options::{CallOptions, Filter};

use crate::error::ServiceError;
use crate::feed::Subscription;

/// Operations the data service exposes for one entity type.
#[async_trait]
pub trait Collection<M: Model>: Send + Sync {
    async fn create(&self, fields: M::Create, options: CallOptions) -> Result<M, ServiceError>;

    /// Partial update: only the fields present in the patch change.
    async fn update(&self, patch: M::Patch, options: CallOptions) -> Result<M, ServiceError>;

    async fn delete(&self, id: &str, options: CallOptions) -> Result<(), ServiceError>;

    async fn get(&self, id: &str, options: CallOptions) -> Result<Option<M>, ServiceError>;

    async fn list(&self, filter: Filter, options: CallOptions) -> Result<Vec<M>, ServiceError>;

    /// Live query over the whole collection as visible to the caller.
    fn observe_query(&self, options: CallOptions) -> Result<Subscription<M>, ServiceError>;
}

/// Handle on the three collections of the schema. Injected wherever the
/// collections are used; there is no process-wide client.
pub trait DataClient: Send + Sync {
    fn todos(&self) -> &dyn Collection<Todo>;
    fn tags(&self) -> &dyn Collection<Tag>;
    fn todo_tags(&self) -> &dyn Collection<TodoTag>;
}
