//! Change notifications published by the gallery controller.

use shared::domain::ImageRecord;

use crate::candidate::StagedSummary;

pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient user-facing message, rendered by the front end as a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum GalleryEvent {
    /// Full collection after a successful mutation, newest first.
    ImagesChanged(Vec<ImageRecord>),
    StagedChanged(Option<StagedSummary>),
    UploadingChanged(bool),
    Notice(Notice),
}
