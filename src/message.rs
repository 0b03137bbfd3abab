//! Chat message and model types shared by the pipeline and the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the backend.
    System,
    /// The human side of the conversation.
    User,
    /// Backend replies.
    Assistant,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote this message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The model selected by the caller.
///
/// Forwarded to the completion backend as given: fields citewise does not
/// know are kept in `extra`, and absent optional fields stay absent. Only
/// `token_limit` is read locally (for history trimming).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    /// Backend model identifier.
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Maximum prompt length in characters, if the backend advertises one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Context window in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_limit: Option<u64>,
    /// Any other fields the caller sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelSpec {
    /// A model with just an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            max_length: None,
            token_limit: None,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).expect("serialize");
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn unknown_role_rejected() {
        let result = serde_json::from_str::<ChatMessage>(r#"{"role":"tool","content":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn model_spec_camel_case_round_trip() {
        let json = r#"{"id":"local-7b","name":"Local 7B","maxLength":12000,"tokenLimit":4000}"#;
        let model: ModelSpec = serde_json::from_str(json).expect("parse");
        assert_eq!(model.token_limit, Some(4000));
        assert_eq!(model.max_length, Some(12000));
        assert_eq!(serde_json::to_string(&model).expect("serialize"), json);
    }

    #[test]
    fn model_spec_optional_fields() {
        let model: ModelSpec = serde_json::from_str(r#"{"id":"m"}"#).expect("parse");
        assert!(model.name.is_none());
        assert!(model.token_limit.is_none());
        assert_eq!(serde_json::to_string(&model).expect("serialize"), r#"{"id":"m"}"#);
    }

    #[test]
    fn model_spec_keeps_unknown_fields() {
        let sent = serde_json::json!({
            "id": "local-7b",
            "tokenLimit": 4000,
            "quantization": "q4",
            "context": {"rope": 2}
        });
        let model: ModelSpec = serde_json::from_value(sent.clone()).expect("parse");
        assert_eq!(model.token_limit, Some(4000));
        assert_eq!(model.extra.get("quantization"), Some(&Value::from("q4")));
        assert_eq!(serde_json::to_value(&model).expect("serialize"), sent);
    }
}
