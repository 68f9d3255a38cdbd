use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use todotag_data::{Caller, DataClient, ServiceError};
use todotag_relations::FixedPrompt;
use todotag_types::api::{CascadeResponse, CreateTagRequest, UpdateNameRequest};
use todotag_types::models::ModelKind;
use todotag_types::options::{CallOptions, Filter};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_tags(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = state
        .client(&caller)
        .tags()
        .list(Filter::all(), CallOptions::api_key())
        .await?;

    Ok(Json(tags))
}

/// POST /tags: a missing or blank name is treated as a cancelled prompt (204).
pub async fn create_tag(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state
        .manager(&caller)
        .create_tag(&FixedPrompt::new(req.name))
        .await?;

    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update_name(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<UpdateNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let manager = state.manager(&caller);
    let current = manager
        .client()
        .tags()
        .get(&id, CallOptions::api_key())
        .await?
        .ok_or_else(|| ServiceError::not_found(ModelKind::Tag, id.as_str()))?;

    let tag = manager
        .rename_tag_name(&id, &current.name, &FixedPrompt::new(req.name))
        .await?;

    Ok(Json(tag))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.manager(&caller).delete_tag_cascade(&id).await?;
    Ok(Json(CascadeResponse {
        id: report.id,
        detached: report.detached,
    }))
}
