//! Backend collaborator seam.
//!
//! The tracker only talks to the course backend through `CourseApi`, so tests and
//! alternative transports can stand in for the HTTP client.

mod http;
mod wire;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learning_core::model::{Course, CourseId, Enrollment, EnrollmentId, Lecture, LectureId, Progress};

use crate::error::ApiError;

pub use http::HttpCourseApi;

/// Authoritative enrollment state returned by a completion mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentUpdate {
    pub completed: Vec<LectureId>,
    pub progress: Progress,
    pub last_activity: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

/// One row of the viewer's "my courses" listing.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrolledCourse {
    pub enrollment_id: EnrollmentId,
    pub course: Course,
    pub progress: Progress,
    pub payment_completed: bool,
    pub enrolled_at: Option<DateTime<Utc>>,
}

impl EnrolledCourse {
    /// Whether the viewer has made any progress ("Continue" rather than "Start").
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.progress.percent() > 0.0
    }
}

#[async_trait]
pub trait CourseApi: Send + Sync {
    /// `GET /courses/courseDetails/{id}`
    async fn course_details(&self, course_id: &CourseId) -> Result<Course, ApiError>;

    /// `GET /courses/{id}/lectures`, in sequence order.
    async fn lectures(&self, course_id: &CourseId) -> Result<Vec<Lecture>, ApiError>;

    /// `GET /enrollment/course/{id}`
    ///
    /// Returns `ApiError::NotEnrolled` when the viewer has no paid enrollment.
    async fn enrollment_for_course(&self, course_id: &CourseId) -> Result<Enrollment, ApiError>;

    /// `POST /enrollment/{enrollmentId}/complete-lecture`
    async fn complete_lecture(
        &self,
        enrollment_id: &EnrollmentId,
        lecture_id: &LectureId,
    ) -> Result<EnrollmentUpdate, ApiError>;

    /// `POST /enrollment/{enrollmentId}/incomplete-lecture`
    async fn incomplete_lecture(
        &self,
        enrollment_id: &EnrollmentId,
        lecture_id: &LectureId,
    ) -> Result<EnrollmentUpdate, ApiError>;

    /// `GET /payments/enrollments`
    async fn my_enrollments(&self) -> Result<Vec<EnrolledCourse>, ApiError>;
}
