use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{ConnectionError, Problem, ViewState};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    /// Sign in with an identity-provider token.
    Authenticate { token: String },
    SignOut,
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    Problems { problems: Vec<Problem> },
    StateUpdate { state: ViewState },
    Redirect { location: String },
    AuthenticationFailed { reason: String },
    ConnectionError { error: ConnectionError },
}
