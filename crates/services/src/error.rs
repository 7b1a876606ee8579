//! Shared error types for the services crate.

use learning_core::model::LectureId;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors emitted by the backend client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("backend request failed with status {status}")]
    HttpStatus {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("backend rejected the request: {message}")]
    Rejected { message: String },
    #[error("viewer is not enrolled in this course")]
    NotEnrolled,
    #[error("backend payload is missing `{0}`")]
    MissingField(&'static str),
    #[error(transparent)]
    InvalidPayload(#[from] learning_core::Error),
    #[error("invalid backend base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Server-provided explanation, when there is one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::HttpStatus { message, .. } => message.as_deref(),
            ApiError::Rejected { message } => Some(message),
            _ => None,
        }
    }
}

/// Errors emitted while loading a learning session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// Any of the initial fetches failed or the viewer has no usable enrollment.
    #[error("course unavailable: not enrolled or not found")]
    NotEnrolledOrNotFound(#[source] ApiError),
}

/// Rejected navigation attempts. Never fatal; state is left unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("course has no lectures")]
    NoLectures,
    #[error("lecture {0} is not part of this course")]
    UnknownLecture(LectureId),
    #[error("lecture {0} has no playable video")]
    Unplayable(LectureId),
    #[error("already at the last lecture")]
    AtEnd,
    #[error("already at the first lecture")]
    AtStart,
}

/// Completion toggle failures. Local state is left unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("lecture {0} is not part of this course")]
    UnknownLecture(LectureId),
    #[error(transparent)]
    Api(#[from] ApiError),
}
