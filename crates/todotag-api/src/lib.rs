pub mod error;
pub mod middleware;
pub mod queries;
pub mod routes;
pub mod state;
pub mod tags;
pub mod todo_tags;
pub mod todos;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
