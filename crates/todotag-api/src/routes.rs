use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::middleware::resolve_caller;
use crate::state::AppState;
use crate::{queries, tags, todo_tags, todos};

/// REST routes. Every data route runs behind `resolve_caller`.
pub fn router(state: AppState) -> Router {
    let data_routes = Router::new()
        .route("/todos", get(todos::list_todos).post(todos::create_todo))
        .route("/todos/with-tags", get(todos::list_todos_with_tags))
        .route("/todos/{id}", delete(todos::delete_todo))
        .route("/todos/{id}/content", put(todos::update_content))
        .route("/todos/{id}/toggle", post(todos::toggle_done))
        .route("/todos/{id}/tags/{tag_id}", post(todos::attach_tag))
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/{id}", delete(tags::delete_tag))
        .route("/tags/{id}/name", put(tags::update_name))
        .route("/todo-tags", get(todo_tags::list_todo_tags))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_caller));

    let public_routes: Router<AppState> = Router::new()
        .route("/queries/say-hello", get(queries::say_hello))
        .route("/health", get(health));

    Router::<AppState>::new()
        .merge(data_routes)
        .merge(public_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
