use std::path::Path;

/// A file chosen by the user, held in memory until it is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub file_name: String,
    /// Media type the file declares. Not sniffed from the content.
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Cheap snapshot of a staged candidate for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSummary {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size: u64,
}

impl CandidateFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: Option<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type,
            bytes: bytes.into(),
        }
    }

    /// Reads `path` and declares the media type guessed from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime_type = mime_guess::from_path(path).first_raw().map(str::to_string);
        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn summary(&self) -> StagedSummary {
        StagedSummary {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size(),
        }
    }
}
