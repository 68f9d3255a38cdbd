//! WebSocket gateway streaming live-query snapshots to clients.

pub mod connection;
pub mod watchers;

pub use connection::handle_connection;
pub use watchers::Watchers;
