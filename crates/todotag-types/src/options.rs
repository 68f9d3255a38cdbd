use serde::{Deserialize, Serialize};

/// Selects which authorization policy the data service applies to a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Authenticated user; owner rules apply.
    UserPool,
    /// Shared public API key. Service default.
    #[default]
    ApiKey,
}

/// Per-call options passed alongside every data client operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOptions {
    #[serde(default)]
    pub auth_mode: Option<AuthMode>,
}

impl CallOptions {
    pub fn user_pool() -> Self {
        Self {
            auth_mode: Some(AuthMode::UserPool),
        }
    }

    pub fn api_key() -> Self {
        Self {
            auth_mode: Some(AuthMode::ApiKey),
        }
    }

    /// The mode actually applied, falling back to the service default.
    pub fn effective_mode(&self) -> AuthMode {
        self.auth_mode.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Str(String),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub eq: FieldValue,
}

/// Conjunction of field equality predicates. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            eq: value.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
