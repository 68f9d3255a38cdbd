use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use todotag_data::{Caller, UserIdentity};
use todotag_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Collect the request's credentials into a `Caller` extension.
///
/// A bearer token must be a valid JWT; the API key is passed through and
/// checked by the data service only for calls made in API-key mode.
pub async fn resolve_caller(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        Some(value) => {
            let token = value
                .strip_prefix("Bearer ")
                .ok_or_else(|| ApiError::Unauthorized("expected a Bearer token".into()))?;
            Some(decode_identity(token, &state.jwt_secret)?)
        }
        None => None,
    };

    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    req.extensions_mut().insert(Caller { user, api_key });
    Ok(next.run(req).await)
}

pub fn decode_identity(token: &str, secret: &str) -> Result<UserIdentity, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| ApiError::Unauthorized(format!("invalid token: {}", e)))?;

    Ok(UserIdentity {
        sub: token_data.claims.sub,
        username: token_data.claims.username,
    })
}
