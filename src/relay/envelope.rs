use crate::error::RelayError;
use serde::{Deserialize, Serialize};

/// The only action the relay answers to.
pub const ACTION: &str = "generate_content";

/// Form fields posted by the trigger surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayForm {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub security: String,
    #[serde(default)]
    pub prompt: String,
}

impl RelayForm {
    pub fn new(security: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            action: ACTION.to_string(),
            security: security.into(),
            prompt: prompt.into(),
        }
    }
}

/// `{ success, data: { content | message } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub data: EnvelopeData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    Content { content: String },
    Message {
        #[serde(default)]
        message: String,
    },
}

impl Envelope {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            success: true,
            data: EnvelopeData::Content {
                content: content.into(),
            },
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: EnvelopeData::Message {
                message: message.into(),
            },
        }
    }

    pub fn from_result(result: Result<String, RelayError>) -> Self {
        match result {
            Ok(content) => Self::success(content),
            Err(e) => Self::failure(e.user_message()),
        }
    }

    /// Generated text, if this is a success envelope.
    pub fn content(&self) -> Option<&str> {
        match (&self.data, self.success) {
            (EnvelopeData::Content { content }, true) => Some(content),
            _ => None,
        }
    }

    /// Failure text, if any.
    pub fn message(&self) -> Option<&str> {
        match (&self.data, self.success) {
            (EnvelopeData::Message { message }, false) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shapes() {
        assert_eq!(
            serde_json::to_value(Envelope::success("Build faster.")).unwrap(),
            json!({"success": true, "data": {"content": "Build faster."}})
        );
        assert_eq!(
            serde_json::to_value(Envelope::from_result(Err(RelayError::UpstreamStatus { status: 500 }))).unwrap(),
            json!({"success": false, "data": {"message": "API request failed with status 500"}})
        );
    }

    #[test]
    fn failure_without_message_still_parses() {
        let env: Envelope = serde_json::from_str(r#"{"success":false,"data":{}}"#).unwrap();
        assert_eq!(env.message(), Some(""));
        assert_eq!(env.content(), None);
    }

    #[test]
    fn form_defaults_to_generate_action() {
        let form = RelayForm::new("tok", "Write a tagline");
        assert_eq!(form.action, ACTION);
    }
}
