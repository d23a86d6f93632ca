use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ConnectionError {
    InvalidMessage { reason: String },
    RateLimitExceeded,
    SessionExpired,
}
