use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend-assigned identifier of an analyzed image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Offset-less layouts the backend has been seen to send; read as UTC.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Upload timestamp exactly as the backend sent it.
///
/// The text is kept verbatim so a record never fails to load over its
/// timestamp; [`UploadedAt::to_utc`] interprets it on demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadedAt(String);

impl UploadedAt {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// RFC 3339 first, then the offset-less ISO 8601 forms taken as UTC.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.0.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NAIVE_TIMESTAMP_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }
}

impl fmt::Display for UploadedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_utc() {
            Some(parsed) => write!(f, "{}", parsed.format("%Y-%m-%d %H:%M:%S UTC")),
            None => f.write_str(&self.0),
        }
    }
}

/// Client-side analysis state. The backend never sends it; records known to
/// the client are always `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Analyzing,
    #[default]
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: ImageId,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub uploaded_at: UploadedAt,
    pub description: String,
    #[serde(default, skip_serializing)]
    pub status: ImageStatus,
}

impl ImageRecord {
    /// Name to show the user: the original upload name when the backend kept
    /// it, the storage name otherwise.
    pub fn display_name(&self) -> &str {
        self.original_name.as_deref().unwrap_or(&self.file_name)
    }

    pub fn completed(mut self) -> Self {
        self.status = ImageStatus::Completed;
        self
    }
}
