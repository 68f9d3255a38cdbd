use thiserror::Error;
use todotag_data::ServiceError;
use todotag_types::models::ModelKind;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The interactive prompt returned nothing usable. No write was issued.
    #[error("Prompt cancelled")]
    UserCancelled,

    /// Cascade aborted before any deletion; the parent is intact.
    #[error("Could not list TodoTag rows of {parent} {id}: {source}")]
    JoinListFailed {
        parent: ModelKind,
        id: String,
        source: ServiceError,
    },

    /// Cascade aborted after the join-row batch settled; the parent is intact.
    #[error("{failed} of {total} TodoTag deletions failed for {parent} {id}: {source}")]
    JoinDeleteFailed {
        parent: ModelKind,
        id: String,
        failed: usize,
        total: usize,
        source: ServiceError,
    },
}

impl ProtocolError {
    /// True when the parent delete was never attempted.
    pub fn is_cascade_abort(&self) -> bool {
        matches!(self, Self::JoinListFailed { .. } | Self::JoinDeleteFailed { .. })
    }
}
