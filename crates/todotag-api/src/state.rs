use std::sync::Arc;

use todotag_data::{Backend, Caller, LocalClient};
use todotag_relations::RelationshipManager;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub backend: Backend,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(backend: Backend, jwt_secret: impl Into<String>) -> AppState {
        Arc::new(Self {
            backend,
            jwt_secret: jwt_secret.into(),
        })
    }

    /// Data client acting with the request's credentials.
    pub fn client(&self, caller: &Caller) -> LocalClient {
        self.backend.client(caller.clone())
    }

    pub fn manager(&self, caller: &Caller) -> RelationshipManager {
        RelationshipManager::new(Arc::new(self.client(caller)))
    }
}
