//! Authorization rules of the todo/tag schema.
//!
//! `Todo` is owner-only and must be reached in user-pool mode. `Tag` and
//! `TodoTag` are public behind the shared API key.

use todotag_types::models::ModelKind;
use todotag_types::options::{AuthMode, CallOptions};

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub sub: String,
    pub username: String,
}

/// Credentials presented by whoever holds a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user: Option<UserIdentity>,
    pub api_key: Option<String>,
}

impl Caller {
    pub fn user(sub: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user: Some(UserIdentity {
                sub: sub.into(),
                username: username.into(),
            }),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Only rows owned by this `sub` are visible.
    Owner(String),
    Public,
}

pub fn authorize(
    kind: ModelKind,
    options: CallOptions,
    caller: &Caller,
    api_key: &str,
) -> Result<Access, ServiceError> {
    match (kind, options.effective_mode()) {
        (ModelKind::Todo, AuthMode::UserPool) => caller
            .user
            .as_ref()
            .map(|user| Access::Owner(user.sub.clone()))
            .ok_or_else(|| ServiceError::Unauthorized("sign-in required".into())),
        (ModelKind::Todo, AuthMode::ApiKey) => Err(ServiceError::Unauthorized(
            "Todo is only reachable by its owner in user pool mode".into(),
        )),
        (_, AuthMode::ApiKey) => match caller.api_key.as_deref() {
            Some(key) if !api_key.is_empty() && key == api_key => Ok(Access::Public),
            _ => Err(ServiceError::Unauthorized("missing or invalid API key".into())),
        },
        (_, AuthMode::UserPool) => Err(ServiceError::Unauthorized(format!(
            "{} does not allow user pool access",
            kind
        ))),
    }
}
