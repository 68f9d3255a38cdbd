use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use todotag_data::{Caller, DataClient, ServiceError};
use todotag_relations::FixedPrompt;
use todotag_types::api::{
    CascadeResponse, CreateTodoRequest, CreateTodoResponse, ToggleDoneRequest,
    UpdateContentRequest,
};
use todotag_types::models::ModelKind;
use todotag_types::options::{CallOptions, Filter};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_todos(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let todos = state
        .client(&caller)
        .todos()
        .list(Filter::all(), CallOptions::user_pool())
        .await?;

    Ok(Json(todos))
}

pub async fn list_todos_with_tags(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let views = state.manager(&caller).todos_with_tags().await?;
    Ok(Json(views))
}

/// POST /todos: creates the todo, then one join row per selected tag.
pub async fn create_todo(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreateTodoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .manager(&caller)
        .create_todo_with_tags(&req.content, &req.tag_ids)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTodoResponse {
            todo: created.todo,
            tags: created.tags,
            failed_tag_ids: created.failed_tag_ids,
        }),
    ))
}

/// PUT /todos/{id}/content: the body's `content` answers the edit prompt.
/// Missing or blank content leaves the todo unchanged (204).
pub async fn update_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let manager = state.manager(&caller);
    let current = manager
        .client()
        .todos()
        .get(&id, CallOptions::user_pool())
        .await?
        .ok_or_else(|| ServiceError::not_found(ModelKind::Todo, id.as_str()))?;

    let todo = manager
        .rename_content(&id, &current.content, &FixedPrompt::new(req.content))
        .await?;

    Ok(Json(todo))
}

pub async fn toggle_done(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<ToggleDoneRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = state.manager(&caller).toggle_done(&id, req.is_done).await?;
    Ok(Json(todo))
}

pub async fn attach_tag(
    State(state): State<AppState>,
    Path((id, tag_id)): Path<(String, String)>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state.manager(&caller).attach_tag(&id, &tag_id).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.manager(&caller).delete_todo_cascade(&id).await?;
    Ok(Json(CascadeResponse {
        id: report.id,
        detached: report.detached,
    }))
}
