use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use todotag_data::{
    Backend, Caller, Collection, DataClient, LocalClient, ServiceError, Subscription,
};
use todotag_db::Database;
use todotag_relations::{FixedPrompt, ProtocolError, RelationshipManager};
use todotag_types::models::{
    ModelKind, NewTag, NewTodo, NewTodoTag, Todo, TodoPatch, TodoTag, TodoTagPatch,
};
use todotag_types::options::{CallOptions, Filter};

const KEY: &str = "test-key";

/// Delegates to the local service, with switchable join-row failures and a
/// count of Todo updates.
struct FlakyClient {
    inner: LocalClient,
    fail_join_list: AtomicBool,
    fail_join_delete: Mutex<HashSet<String>>,
    fail_join_create_for_tag: Mutex<HashSet<String>>,
    todo_updates: AtomicUsize,
}

impl FlakyClient {
    fn new(inner: LocalClient) -> Self {
        Self {
            inner,
            fail_join_list: AtomicBool::new(false),
            fail_join_delete: Mutex::new(HashSet::new()),
            fail_join_create_for_tag: Mutex::new(HashSet::new()),
            todo_updates: AtomicUsize::new(0),
        }
    }

    fn injected() -> ServiceError {
        ServiceError::Backend("injected failure".into())
    }
}

impl DataClient for FlakyClient {
    fn todos(&self) -> &dyn Collection<Todo> {
        self
    }

    fn tags(&self) -> &dyn Collection<todotag_types::models::Tag> {
        self.inner.tags()
    }

    fn todo_tags(&self) -> &dyn Collection<TodoTag> {
        self
    }
}

#[async_trait]
impl Collection<Todo> for FlakyClient {
    async fn create(&self, fields: NewTodo, options: CallOptions) -> Result<Todo, ServiceError> {
        self.inner.todos().create(fields, options).await
    }

    async fn update(&self, patch: TodoPatch, options: CallOptions) -> Result<Todo, ServiceError> {
        self.todo_updates.fetch_add(1, Ordering::SeqCst);
        self.inner.todos().update(patch, options).await
    }

    async fn delete(&self, id: &str, options: CallOptions) -> Result<(), ServiceError> {
        self.inner.todos().delete(id, options).await
    }

    async fn get(&self, id: &str, options: CallOptions) -> Result<Option<Todo>, ServiceError> {
        self.inner.todos().get(id, options).await
    }

    async fn list(&self, filter: Filter, options: CallOptions) -> Result<Vec<Todo>, ServiceError> {
        self.inner.todos().list(filter, options).await
    }

    fn observe_query(&self, options: CallOptions) -> Result<Subscription<Todo>, ServiceError> {
        self.inner.todos().observe_query(options)
    }
}

#[async_trait]
impl Collection<TodoTag> for FlakyClient {
    async fn create(
        &self,
        fields: NewTodoTag,
        options: CallOptions,
    ) -> Result<TodoTag, ServiceError> {
        if self.fail_join_create_for_tag.lock().unwrap().contains(&fields.tag_id) {
            return Err(Self::injected());
        }
        self.inner.todo_tags().create(fields, options).await
    }

    async fn update(
        &self,
        patch: TodoTagPatch,
        options: CallOptions,
    ) -> Result<TodoTag, ServiceError> {
        self.inner.todo_tags().update(patch, options).await
    }

    async fn delete(&self, id: &str, options: CallOptions) -> Result<(), ServiceError> {
        if self.fail_join_delete.lock().unwrap().contains(id) {
            return Err(Self::injected());
        }
        self.inner.todo_tags().delete(id, options).await
    }

    async fn get(&self, id: &str, options: CallOptions) -> Result<Option<TodoTag>, ServiceError> {
        self.inner.todo_tags().get(id, options).await
    }

    async fn list(
        &self,
        filter: Filter,
        options: CallOptions,
    ) -> Result<Vec<TodoTag>, ServiceError> {
        if self.fail_join_list.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.todo_tags().list(filter, options).await
    }

    fn observe_query(&self, options: CallOptions) -> Result<Subscription<TodoTag>, ServiceError> {
        self.inner.todo_tags().observe_query(options)
    }
}

struct Harness {
    flaky: Arc<FlakyClient>,
    manager: RelationshipManager,
}

impl Harness {
    async fn new() -> Self {
        let backend = Backend::new(Database::open_in_memory().unwrap(), KEY);
        let client = backend.client(Caller::user("sub-alice", "alice").with_api_key(KEY));
        let flaky = Arc::new(FlakyClient::new(client));
        let manager = RelationshipManager::new(flaky.clone());

        for (id, name) in [("tag-1", "home"), ("tag-2", "work"), ("tag-3", "errands")] {
            flaky
                .inner
                .tags()
                .create(NewTag::with_id(id, name), CallOptions::api_key())
                .await
                .unwrap();
        }

        Self { flaky, manager }
    }

    async fn join_rows(&self, field: &str, id: &str) -> Vec<TodoTag> {
        self.flaky
            .inner
            .todo_tags()
            .list(Filter::eq(field, id), CallOptions::api_key())
            .await
            .unwrap()
    }

    async fn todo(&self, id: &str) -> Option<Todo> {
        self.flaky.inner.todos().get(id, CallOptions::user_pool()).await.unwrap()
    }
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn create_todo_attaches_one_row_per_tag() {
    let h = Harness::new().await;

    let created = h
        .manager
        .create_todo_with_tags("Buy milk", &ids(&["tag-1", "tag-2"]))
        .await
        .unwrap();

    assert_eq!(created.todo.content, "Buy milk");
    assert!(!created.todo.is_done);
    assert!(created.failed_tag_ids.is_empty());

    let rows = h.join_rows("todo_id", &created.todo.id).await;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.todo_id == created.todo.id));
    let mut tags: Vec<&str> = rows.iter().map(|row| row.tag_id.as_str()).collect();
    tags.sort();
    assert_eq!(tags, vec!["tag-1", "tag-2"]);
}

#[tokio::test]
async fn create_todo_ignores_duplicate_tag_ids() {
    let h = Harness::new().await;

    let created = h
        .manager
        .create_todo_with_tags("Buy milk", &ids(&["tag-1", "tag-1"]))
        .await
        .unwrap();

    assert_eq!(created.tags.len(), 1);
    assert_eq!(h.join_rows("todo_id", &created.todo.id).await.len(), 1);
}

#[tokio::test]
async fn partial_join_failure_keeps_the_todo() {
    let h = Harness::new().await;
    h.flaky
        .fail_join_create_for_tag
        .lock()
        .unwrap()
        .insert("tag-2".into());

    let created = h
        .manager
        .create_todo_with_tags("Buy milk", &ids(&["tag-1", "tag-2", "tag-3"]))
        .await
        .unwrap();

    assert_eq!(created.failed_tag_ids, ids(&["tag-2"]));
    assert_eq!(created.tags.len(), 2);
    assert!(h.todo(&created.todo.id).await.is_some());
    assert_eq!(h.join_rows("todo_id", &created.todo.id).await.len(), 2);
}

#[tokio::test]
async fn delete_todo_removes_join_rows_then_todo() {
    let h = Harness::new().await;
    let created = h
        .manager
        .create_todo_with_tags("Buy milk", &ids(&["tag-1", "tag-2"]))
        .await
        .unwrap();
    let id = created.todo.id;

    let report = h.manager.delete_todo_cascade(&id).await.unwrap();

    assert_eq!(report.detached, 2);
    assert!(h.join_rows("todo_id", &id).await.is_empty());
    assert!(h.todo(&id).await.is_none());
    // Tags are untouched
    assert!(h.flaky.inner.tags().get("tag-1", CallOptions::api_key()).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_tag_removes_join_rows_and_keeps_todos() {
    let h = Harness::new().await;
    let first = h
        .manager
        .create_todo_with_tags("Buy milk", &ids(&["tag-1", "tag-2"]))
        .await
        .unwrap();
    let second = h
        .manager
        .create_todo_with_tags("Walk dog", &ids(&["tag-1"]))
        .await
        .unwrap();
    assert_eq!(h.join_rows("tag_id", "tag-1").await.len(), 2);

    let report = h.manager.delete_tag_cascade("tag-1").await.unwrap();

    assert_eq!(report.detached, 2);
    assert!(h.join_rows("tag_id", "tag-1").await.is_empty());
    assert!(h.flaky.inner.tags().get("tag-1", CallOptions::api_key()).await.unwrap().is_none());
    assert!(h.todo(&first.todo.id).await.is_some());
    assert!(h.todo(&second.todo.id).await.is_some());
    // The unrelated join row survives
    assert_eq!(h.join_rows("tag_id", "tag-2").await.len(), 1);
}

#[tokio::test]
async fn list_failure_aborts_cascade_and_retry_succeeds() {
    let h = Harness::new().await;
    let created = h
        .manager
        .create_todo_with_tags("Buy milk", &ids(&["tag-1"]))
        .await
        .unwrap();
    let id = created.todo.id;

    h.flaky.fail_join_list.store(true, Ordering::SeqCst);
    let err = h.manager.delete_todo_cascade(&id).await.unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::JoinListFailed { parent: ModelKind::Todo, .. }
    ));
    assert!(err.is_cascade_abort());
    assert!(h.todo(&id).await.is_some());

    h.flaky.fail_join_list.store(false, Ordering::SeqCst);
    let report = h.manager.delete_todo_cascade(&id).await.unwrap();
    assert_eq!(report.detached, 1);
    assert!(h.todo(&id).await.is_none());
}

#[tokio::test]
async fn join_delete_failure_keeps_parent_and_surfaces_error() {
    let h = Harness::new().await;
    let created = h
        .manager
        .create_todo_with_tags("Buy milk", &ids(&["tag-1", "tag-2"]))
        .await
        .unwrap();
    let stuck = created
        .tags
        .iter()
        .find(|row| row.tag_id == "tag-2")
        .unwrap()
        .id
        .clone();
    h.flaky.fail_join_delete.lock().unwrap().insert(stuck.clone());

    let err = h.manager.delete_tag_cascade("tag-2").await.unwrap_err();
    match err {
        ProtocolError::JoinDeleteFailed { parent, failed, total, .. } => {
            assert_eq!(parent, ModelKind::Tag);
            assert_eq!(failed, 1);
            assert_eq!(total, 1);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(h.flaky.inner.tags().get("tag-2", CallOptions::api_key()).await.unwrap().is_some());

    // Siblings of a failed row are still deleted before the abort
    let err = h.manager.delete_todo_cascade(&created.todo.id).await.unwrap_err();
    assert!(err.is_cascade_abort());
    let remaining = h.join_rows("todo_id", &created.todo.id).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, stuck);
    assert!(h.todo(&created.todo.id).await.is_some());
}

#[tokio::test]
async fn delete_unknown_todo_touches_nothing() {
    let h = Harness::new().await;
    let err = h.manager.delete_todo_cascade("missing").await.unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Service(ServiceError::NotFound { model: ModelKind::Todo, .. })
    ));
}

#[tokio::test]
async fn toggle_done_is_an_involution() {
    let h = Harness::new().await;
    let created = h.manager.create_todo_with_tags("Buy milk", &[]).await.unwrap();
    let id = created.todo.id;

    let toggled = h.manager.toggle_done(&id, false).await.unwrap();
    assert!(toggled.is_done);
    let restored = h.manager.toggle_done(&id, true).await.unwrap();
    assert!(!restored.is_done);
    assert!(!h.todo(&id).await.unwrap().is_done);
}

#[tokio::test]
async fn toggle_done_trusts_the_callers_value() {
    let h = Harness::new().await;
    let created = h.manager.create_todo_with_tags("Buy milk", &[]).await.unwrap();

    // Stale view: stored value is already false, caller thinks it is true
    let toggled = h.manager.toggle_done(&created.todo.id, true).await.unwrap();
    assert!(!toggled.is_done);
}

#[tokio::test]
async fn cancelled_rename_issues_no_update() {
    let h = Harness::new().await;
    let created = h.manager.create_todo_with_tags("Buy milk", &[]).await.unwrap();
    let id = created.todo.id;

    let err = h
        .manager
        .rename_content(&id, "Buy milk", &FixedPrompt::new(Some(String::new())))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::UserCancelled));

    let err = h
        .manager
        .rename_content(&id, "Buy milk", &FixedPrompt::cancelled())
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::UserCancelled));

    assert_eq!(h.flaky.todo_updates.load(Ordering::SeqCst), 0);
    assert_eq!(h.todo(&id).await.unwrap().content, "Buy milk");
}

#[tokio::test]
async fn rename_uses_prompt_answer() {
    let h = Harness::new().await;
    let created = h.manager.create_todo_with_tags("Buy milk", &[]).await.unwrap();

    let renamed = h
        .manager
        .rename_content(
            &created.todo.id,
            "Buy milk",
            &FixedPrompt::new(Some("Buy oat milk".into())),
        )
        .await
        .unwrap();
    assert_eq!(renamed.content, "Buy oat milk");
    assert_eq!(h.flaky.todo_updates.load(Ordering::SeqCst), 1);

    let tag = h
        .manager
        .rename_tag_name("tag-1", "home", &FixedPrompt::new(Some("house".into())))
        .await
        .unwrap();
    assert_eq!(tag.name, "house");
}

#[tokio::test]
async fn create_tag_from_prompt() {
    let h = Harness::new().await;

    let tag = h
        .manager
        .create_tag(&FixedPrompt::new(Some("garden".into())))
        .await
        .unwrap();
    assert_eq!(tag.name, "garden");

    let err = h.manager.create_tag(&FixedPrompt::cancelled()).await.unwrap_err();
    assert!(matches!(err, ProtocolError::UserCancelled));
}

#[tokio::test]
async fn attach_tag_requires_live_parents() {
    let h = Harness::new().await;
    let created = h.manager.create_todo_with_tags("Buy milk", &[]).await.unwrap();

    let row = h.manager.attach_tag(&created.todo.id, "tag-3").await.unwrap();
    assert_eq!(row.todo_id, created.todo.id);

    let err = h.manager.attach_tag(&created.todo.id, "tag-404").await.unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Service(ServiceError::NotFound { model: ModelKind::Tag, .. })
    ));
    assert_eq!(h.join_rows("todo_id", &created.todo.id).await.len(), 1);
}

#[tokio::test]
async fn create_todo_skips_unknown_tags() {
    let h = Harness::new().await;

    let created = h
        .manager
        .create_todo_with_tags("Buy milk", &ids(&["tag-1", "tag-404"]))
        .await
        .unwrap();

    assert_eq!(created.tags.len(), 1);
    assert_eq!(created.failed_tag_ids, ids(&["tag-404"]));
    let rows = h.join_rows("todo_id", &created.todo.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tag_id, "tag-1");
    assert!(h.join_rows("tag_id", "tag-404").await.is_empty());
}

#[tokio::test]
async fn todos_with_tags_resolves_and_skips_missing_tags() {
    let h = Harness::new().await;
    let created = h
        .manager
        .create_todo_with_tags("Buy milk", &ids(&["tag-1", "tag-2"]))
        .await
        .unwrap();
    // Deleting the tag without the cascade leaves its join row behind
    h.flaky.inner.tags().delete("tag-2", CallOptions::api_key()).await.unwrap();
    assert_eq!(h.join_rows("todo_id", &created.todo.id).await.len(), 2);

    let views = h.manager.todos_with_tags().await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].todo.id, created.todo.id);
    let names: Vec<&str> = views[0].tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["home"]);
}

#[tokio::test]
async fn cancelled_tag_rename_leaves_tag_unchanged() {
    let h = Harness::new().await;
    let before = h
        .flaky
        .inner
        .tags()
        .get("tag-1", CallOptions::api_key())
        .await
        .unwrap()
        .unwrap();

    for prompt in [FixedPrompt::new(Some("   ".into())), FixedPrompt::cancelled()] {
        let err = h
            .manager
            .rename_tag_name("tag-1", "home", &prompt)
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UserCancelled));
    }

    let after = h
        .flaky
        .inner
        .tags()
        .get("tag-1", CallOptions::api_key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.name, "home");
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn tag_list_failure_keeps_the_tag() {
    let h = Harness::new().await;
    h.manager
        .create_todo_with_tags("Buy milk", &ids(&["tag-1"]))
        .await
        .unwrap();

    h.flaky.fail_join_list.store(true, Ordering::SeqCst);
    let err = h.manager.delete_tag_cascade("tag-1").await.unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::JoinListFailed { parent: ModelKind::Tag, .. }
    ));
    assert!(h.flaky.inner.tags().get("tag-1", CallOptions::api_key()).await.unwrap().is_some());

    h.flaky.fail_join_list.store(false, Ordering::SeqCst);
    assert_eq!(h.join_rows("tag_id", "tag-1").await.len(), 1);
}
