use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Everything the presentation layer needs to draw the dashboard.
///
/// `highest_score` is computed independently of `your_score`, so it is not
/// guaranteed to be greater or equal while the scan is still in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ViewState {
    #[default]
    Loading,
    Error {
        message: String,
    },
    Ready {
        name: String,
        your_score: u32,
        highest_score: u32,
        thread_ids: Vec<String>,
        deck_ids: Vec<String>,
    },
}

impl ViewState {
    pub fn error(message: impl Into<String>) -> Self {
        ViewState::Error {
            message: message.into(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ViewState::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_loading() {
        assert!(ViewState::default().is_loading());
    }

    #[test]
    fn test_error_wire_format() {
        let state = ViewState::error("User data not found.");
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"Error":{"message":"User data not found."}}"#);
    }

    #[test]
    fn test_ready_round_trips_through_json() {
        let state = ViewState::Ready {
            name: "Ada".to_string(),
            your_score: 10,
            highest_score: 25,
            thread_ids: vec!["graphs".to_string()],
            deck_ids: Vec::new(),
        };
        let json = serde_json::to_string(&state).unwrap();
        let parsed: ViewState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
        assert!(parsed.is_ready());
    }
}
