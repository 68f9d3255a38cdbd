use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};

use todotag_data::{Caller, DataClient};
use todotag_types::api::TodoTagQuery;
use todotag_types::options::{CallOptions, Filter};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /todo-tags: join rows matching every supplied `todo_id` / `tag_id`.
pub async fn list_todo_tags(
    State(state): State<AppState>,
    Query(query): Query<TodoTagQuery>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let mut filter = Filter::all();
    if let Some(todo_id) = query.todo_id {
        filter = filter.and_eq("todo_id", todo_id);
    }
    if let Some(tag_id) = query.tag_id {
        filter = filter.and_eq("tag_id", tag_id);
    }

    let rows = state
        .client(&caller)
        .todo_tags()
        .list(filter, CallOptions::api_key())
        .await?;

    Ok(Json(rows))
}
