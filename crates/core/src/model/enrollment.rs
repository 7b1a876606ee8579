use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, EnrollmentId, LectureId};
use crate::model::progress::Progress;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("enrollment belongs to course {actual}, expected {expected}")]
    CourseMismatch { expected: CourseId, actual: CourseId },
}

/// The viewer's enrollment in one course.
///
/// `completed` and `progress` are authoritative only as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    id: EnrollmentId,
    course_id: CourseId,
    viewer: Option<String>,
    completed: Vec<LectureId>,
    progress: Progress,
    last_activity: Option<DateTime<Utc>>,
}

impl Enrollment {
    #[must_use]
    pub fn new(
        id: EnrollmentId,
        course_id: CourseId,
        viewer: Option<String>,
        completed: Vec<LectureId>,
        progress: Progress,
        last_activity: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            course_id,
            viewer,
            completed: dedupe(completed),
            progress,
            last_activity,
        }
    }

    #[must_use]
    pub fn id(&self) -> &EnrollmentId {
        &self.id
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn viewer(&self) -> Option<&str> {
        self.viewer.as_deref()
    }

    #[must_use]
    pub fn completed_lectures(&self) -> &[LectureId] {
        &self.completed
    }

    #[must_use]
    pub fn is_completed(&self, lecture_id: &LectureId) -> bool {
        self.completed.contains(lecture_id)
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress
    }

    #[must_use]
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity
    }

    /// Ensure the enrollment was issued for `course_id`.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::CourseMismatch` when it belongs to another course.
    pub fn ensure_course(&self, course_id: &CourseId) -> Result<(), EnrollmentError> {
        if &self.course_id == course_id {
            Ok(())
        } else {
            Err(EnrollmentError::CourseMismatch {
                expected: course_id.clone(),
                actual: self.course_id.clone(),
            })
        }
    }

    /// Replace the completed set and progress with what the backend reported.
    ///
    /// The set is taken in backend order; repeated ids collapse to one entry.
    pub fn apply_backend_state(
        &mut self,
        completed: Vec<LectureId>,
        progress: Progress,
        last_activity: Option<DateTime<Utc>>,
    ) {
        self.completed = dedupe(completed);
        self.progress = progress;
        if last_activity.is_some() {
            self.last_activity = last_activity;
        }
    }

    /// Drop completed ids for which `known` returns false.
    ///
    /// Returns the number of ids removed.
    pub fn retain_known(&mut self, known: impl Fn(&LectureId) -> bool) -> usize {
        let before = self.completed.len();
        self.completed.retain(|id| known(id));
        before - self.completed.len()
    }
}

fn dedupe(ids: Vec<LectureId>) -> Vec<LectureId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
