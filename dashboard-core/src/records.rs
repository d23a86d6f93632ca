use serde_json::Value;
use tracing::warn;

use crate::store::{Document, USERS};
use dashboard_types::UserRecord;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("{collection}/{id} is missing required field '{field}'")]
    MissingField {
        collection: &'static str,
        id: String,
        field: &'static str,
    },
    #[error("{collection}/{id} has an invalid '{field}': expected {expected}")]
    InvalidField {
        collection: &'static str,
        id: String,
        field: &'static str,
        expected: &'static str,
    },
}

/// Decode a `users` document, rejecting payloads without the required fields.
pub fn decode_user(document: &Document) -> Result<UserRecord, RecordError> {
    let email = required_string(document, "email")?;
    let name = required_string(document, "name")?;
    let score = match document.field("score") {
        None | Some(Value::Null) => return Err(missing(document, "score")),
        Some(value) => parse_score(value).ok_or_else(|| RecordError::InvalidField {
            collection: USERS,
            id: document.id.clone(),
            field: "score",
            expected: "a non-negative integer",
        })?,
    };

    Ok(UserRecord { email, name, score })
}

/// Lenient score read used by the high-score scan: anything unusable counts as 0.
pub fn score_or_zero(document: &Document) -> u32 {
    match document.field("score").and_then(parse_score) {
        Some(score) => score,
        None => {
            warn!("User document {} has no usable score, counting it as 0", document.id);
            0
        }
    }
}

fn parse_score(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    // Some writers store whole numbers as doubles
    let n = value.as_f64()?;
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) {
        Some(n as u32)
    } else {
        None
    }
}

fn required_string(document: &Document, field: &'static str) -> Result<String, RecordError> {
    match document.field(field) {
        None | Some(Value::Null) => Err(missing(document, field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(RecordError::InvalidField {
            collection: USERS,
            id: document.id.clone(),
            field,
            expected: "a string",
        }),
    }
}

fn missing(document: &Document, field: &'static str) -> RecordError {
    RecordError::MissingField {
        collection: USERS,
        id: document.id.clone(),
        field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_complete_user() {
        let doc = Document::new(
            "u1",
            json!({"email": "a@x.com", "name": "Ada", "score": 10}),
        );
        let user = decode_user(&doc).unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(user.score, 10);
    }

    #[test]
    fn test_decode_rejects_missing_name() {
        let doc = Document::new("u1", json!({"email": "a@x.com", "score": 3}));
        let err = decode_user(&doc).unwrap_err();
        assert!(matches!(err, RecordError::MissingField { field: "name", .. }));
    }

    #[test]
    fn test_decode_rejects_negative_score() {
        let doc = Document::new(
            "u1",
            json!({"email": "a@x.com", "name": "Ada", "score": -4}),
        );
        let err = decode_user(&doc).unwrap_err();
        assert!(matches!(err, RecordError::InvalidField { field: "score", .. }));
    }

    #[test]
    fn test_whole_doubles_are_scores() {
        let doc = Document::new("u1", json!({"score": 42.0}));
        assert_eq!(score_or_zero(&doc), 42);
    }

    #[test]
    fn test_unusable_scores_count_as_zero() {
        assert_eq!(score_or_zero(&Document::new("a", json!({}))), 0);
        assert_eq!(score_or_zero(&Document::new("b", json!({"score": "12"}))), 0);
        assert_eq!(score_or_zero(&Document::new("c", json!({"score": 1.5}))), 0);
    }
}
