use serde::{Deserialize, Serialize};

/// Body the backend attaches to a non-success response. Every field is
/// optional; a missing or unparsable body is not an error on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Extracts a non-blank `message` from a raw response body.
    pub fn message_from_bytes(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<ApiErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.message)
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
    }
}
