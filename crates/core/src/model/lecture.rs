use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::LectureId;
use crate::video::{self, PlayabilityPolicy};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LectureError {
    #[error("lecture title cannot be empty")]
    EmptyTitle,

    #[error("resource file reference cannot be empty")]
    EmptyResourceFile,
}

/// A downloadable attachment of a lecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureResource {
    title: String,
    file_url: String,
}

impl LectureResource {
    /// # Errors
    ///
    /// Returns `LectureError::EmptyResourceFile` if the file reference is blank.
    pub fn new(title: impl Into<String>, file_url: impl Into<String>) -> Result<Self, LectureError> {
        let file_url = file_url.into();
        if file_url.trim().is_empty() {
            return Err(LectureError::EmptyResourceFile);
        }
        Ok(Self {
            title: title.into(),
            file_url,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn file_url(&self) -> &str {
        &self.file_url
    }
}

/// One entry of a course's ordered lecture sequence.
///
/// Position in the sequence is implicit (the index in the owning `Vec`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lecture {
    id: LectureId,
    title: String,
    video_url: Option<String>,
    resources: Vec<LectureResource>,
}

impl Lecture {
    /// # Errors
    ///
    /// Returns `LectureError::EmptyTitle` if the title is blank.
    pub fn new(
        id: LectureId,
        title: impl Into<String>,
        video_url: Option<String>,
        resources: Vec<LectureResource>,
    ) -> Result<Self, LectureError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LectureError::EmptyTitle);
        }
        let video_url = video_url
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty());

        Ok(Self {
            id,
            title,
            video_url,
            resources,
        })
    }

    #[must_use]
    pub fn id(&self) -> &LectureId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    #[must_use]
    pub fn resources(&self) -> &[LectureResource] {
        &self.resources
    }

    /// Whether the lecture can be opened directly from the lecture list.
    #[must_use]
    pub fn is_playable(&self, policy: PlayabilityPolicy) -> bool {
        video::is_playable(self.video_url(), policy)
    }

    /// Player embed URL for the lecture's video, when one can be derived.
    #[must_use]
    pub fn embed_url(&self) -> Option<String> {
        self.video_url().and_then(video::embed_url)
    }
}
