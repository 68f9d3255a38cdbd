//! Data client capability over the `Todo`, `Tag` and `TodoTag` collections,
//! plus a local SQLite-backed implementation with live queries.

pub mod collection;
pub mod error;
pub mod feed;
pub mod local;
pub mod policy;

pub use collection::{Collection, DataClient};
pub use error::ServiceError;
pub use feed::{ChangeFeed, Subscription};
pub use local::{Backend, LocalClient};
pub use policy::{Caller, UserIdentity};
