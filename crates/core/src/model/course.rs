use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::CourseId;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("course duration must be a finite, non-negative number of hours (got {0})")]
    InvalidDuration(f64),
}

/// Read-only snapshot of a course, fetched once per learning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    id: CourseId,
    title: String,
    category: Option<String>,
    duration_hours: f64,
    thumbnail: Option<String>,
}

impl Course {
    /// Creates a validated course snapshot.
    ///
    /// `category` is whatever reference the backend exposes (an id or a populated name).
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if the title is blank or the duration is negative or not finite.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        category: Option<String>,
        duration_hours: f64,
        thumbnail: Option<String>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        if !duration_hours.is_finite() || duration_hours < 0.0 {
            return Err(CourseError::InvalidDuration(duration_hours));
        }

        Ok(Self {
            id,
            title,
            category: category.filter(|c| !c.trim().is_empty()),
            duration_hours,
            thumbnail: thumbnail.filter(|t| !t.trim().is_empty()),
        })
    }

    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn duration_hours(&self) -> f64 {
        self.duration_hours
    }

    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }
}
