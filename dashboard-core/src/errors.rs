use crate::records::RecordError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The identity provider reported an error; carries its message verbatim.
    #[error("{0}")]
    AuthStream(String),
    #[error("User data not found.")]
    UserNotFound,
    #[error(transparent)]
    MalformedRecord(#[from] RecordError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
