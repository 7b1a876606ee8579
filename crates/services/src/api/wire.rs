//! JSON shapes of the course backend and their mapping into domain types.

use chrono::{DateTime, Utc};
use learning_core::model::{
    Course, CourseId, Enrollment, EnrollmentId, Lecture, LectureId, LectureResource, Progress,
};
use serde::Deserialize;

use super::{EnrolledCourse, EnrollmentUpdate};
use crate::error::ApiError;

const PAYMENT_COMPLETED: &str = "completed";

fn invalid(err: impl Into<learning_core::Error>) -> ApiError {
    ApiError::InvalidPayload(err.into())
}

fn rejected(message: Option<String>, fallback: &str) -> ApiError {
    ApiError::Rejected {
        message: message.unwrap_or_else(|| fallback.to_owned()),
    }
}

/// A reference that the backend sends either as a bare id or as a populated document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum DocRef {
    Id(String),
    Doc {
        #[serde(rename = "_id", default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl DocRef {
    fn id(&self) -> Option<&str> {
        match self {
            DocRef::Id(id) => Some(id),
            DocRef::Doc { id, .. } => id.as_deref(),
        }
    }

    fn label(&self) -> Option<&str> {
        match self {
            DocRef::Id(id) => Some(id),
            DocRef::Doc { id, name } => name.as_deref().or(id.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(super) struct CourseDetailsResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    course: Option<CourseDto>,
    #[serde(default)]
    message: Option<String>,
}

impl CourseDetailsResponse {
    pub(super) fn into_course(self) -> Result<Course, ApiError> {
        match (self.success, self.course) {
            (Some(false), _) | (_, None) => Err(rejected(self.message, "course not found")),
            (_, Some(course)) => course.into_course(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CourseDto {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    #[serde(default)]
    category: Option<DocRef>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    thumbnail: Option<String>,
}

impl CourseDto {
    fn into_course(self) -> Result<Course, ApiError> {
        let id = CourseId::new(self.id).map_err(invalid)?;
        let category = self.category.as_ref().and_then(DocRef::label).map(str::to_owned);
        Course::new(
            id,
            self.title,
            category,
            self.duration.unwrap_or(0.0),
            self.thumbnail,
        )
        .map_err(invalid)
    }
}

//
// ─── LECTURES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(super) struct LecturesResponse {
    #[serde(default)]
    lectures: Vec<LectureDto>,
}

impl LecturesResponse {
    pub(super) fn into_lectures(self) -> Result<Vec<Lecture>, ApiError> {
        self.lectures
            .into_iter()
            .enumerate()
            .map(|(index, dto)| dto.into_lecture(index + 1))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct LectureDto {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "videoUrl", default)]
    video_url: Option<String>,
    #[serde(default)]
    resources: Vec<ResourceDto>,
}

#[derive(Debug, Deserialize)]
struct ResourceDto {
    #[serde(default)]
    title: String,
    #[serde(rename = "fileUrl", default)]
    file_url: String,
}

impl LectureDto {
    /// Broken attachments are dropped and a blank title falls back to the lecture's
    /// position, so one bad field never hides the rest of the course.
    fn into_lecture(self, position: usize) -> Result<Lecture, ApiError> {
        let id = LectureId::new(self.id).map_err(invalid)?;
        let resources = self
            .resources
            .into_iter()
            .filter_map(|r| {
                LectureResource::new(r.title, r.file_url)
                    .inspect_err(|err| log::debug!("dropping resource of lecture {id}: {err}"))
                    .ok()
            })
            .collect();
        let title = if self.title.trim().is_empty() {
            log::debug!("lecture {id} has no title");
            format!("Lecture {position}")
        } else {
            self.title
        };
        Lecture::new(id, title, self.video_url, resources).map_err(invalid)
    }
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(super) struct EnrollmentResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    enrollment: Option<EnrollmentDto>,
}

impl EnrollmentResponse {
    pub(super) fn into_enrollment(self, course_id: &CourseId) -> Result<Enrollment, ApiError> {
        match (self.success, self.enrollment) {
            (Some(false), _) | (_, None) => Err(ApiError::NotEnrolled),
            (_, Some(dto)) => {
                if !dto.payment_completed() {
                    return Err(ApiError::NotEnrolled);
                }
                dto.into_enrollment(course_id)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnrollmentDto {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    course: Option<DocRef>,
    #[serde(default)]
    user: Option<DocRef>,
    #[serde(rename = "completedLectures", default)]
    completed_lectures: Vec<DocRef>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(rename = "lastActivity", default)]
    last_activity: Option<DateTime<Utc>>,
    #[serde(rename = "paymentStatus", default)]
    payment_status: Option<String>,
}

impl EnrollmentDto {
    /// Enrollments without a payment status predate payments and count as paid.
    fn payment_completed(&self) -> bool {
        self.payment_status
            .as_deref()
            .is_none_or(|status| status.eq_ignore_ascii_case(PAYMENT_COMPLETED))
    }

    fn completed_ids(&self) -> Result<Vec<LectureId>, ApiError> {
        self.completed_lectures
            .iter()
            .filter_map(DocRef::id)
            .map(|id| LectureId::new(id).map_err(invalid))
            .collect()
    }

    fn into_enrollment(self, fallback_course: &CourseId) -> Result<Enrollment, ApiError> {
        let id = EnrollmentId::new(self.id.clone()).map_err(invalid)?;
        let course_id = match self.course.as_ref().and_then(DocRef::id) {
            Some(raw) => CourseId::new(raw).map_err(invalid)?,
            None => fallback_course.clone(),
        };
        let completed = self.completed_ids()?;
        let progress = Progress::new(self.progress.unwrap_or(0.0)).map_err(invalid)?;
        let viewer = self.user.as_ref().and_then(DocRef::id).map(str::to_owned);

        Ok(Enrollment::new(
            id,
            course_id,
            viewer,
            completed,
            progress,
            self.last_activity,
        ))
    }
}

//
// ─── COMPLETION MUTATIONS ──────────────────────────────────────────────────────
//

#[derive(Debug, serde::Serialize)]
pub(super) struct LectureRequest<'a> {
    #[serde(rename = "lectureId")]
    pub lecture_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct MutationResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    enrollment: Option<EnrollmentDto>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

impl MutationResponse {
    pub(super) fn into_update(self) -> Result<EnrollmentUpdate, ApiError> {
        if self.success == Some(false) {
            return Err(rejected(self.message, "lecture update rejected"));
        }
        let enrollment = self.enrollment.ok_or(ApiError::MissingField("enrollment"))?;
        let raw_progress = self
            .progress
            .or(enrollment.progress)
            .ok_or(ApiError::MissingField("progress"))?;
        let progress = Progress::new(raw_progress).map_err(invalid)?;

        Ok(EnrollmentUpdate {
            completed: enrollment.completed_ids()?,
            progress,
            last_activity: enrollment.last_activity,
            message: self.message,
        })
    }
}

//
// ─── MY COURSES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(super) struct MyEnrollmentsResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    enrollments: Vec<CatalogEntryDto>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntryDto {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    course: Option<CourseDto>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(rename = "paymentStatus", default)]
    payment_status: Option<String>,
    #[serde(rename = "enrolledAt", default)]
    enrolled_at: Option<DateTime<Utc>>,
}

impl MyEnrollmentsResponse {
    pub(super) fn into_entries(self) -> Result<Vec<EnrolledCourse>, ApiError> {
        if self.success == Some(false) {
            return Err(rejected(self.message, "could not list enrollments"));
        }
        let entries: Vec<EnrolledCourse> = self
            .enrollments
            .into_iter()
            .filter_map(|dto| {
                let id = dto.id.clone();
                dto.into_entry()
                    .inspect_err(|err| log::debug!("skipping enrollment {id}: {err}"))
                    .ok()
                    .flatten()
            })
            .collect();
        Ok(entries)
    }
}

impl CatalogEntryDto {
    /// `Ok(None)` for enrollments whose course was deleted.
    fn into_entry(self) -> Result<Option<EnrolledCourse>, ApiError> {
        let Some(course) = self.course else {
            log::debug!("skipping enrollment {} without a course", self.id);
            return Ok(None);
        };
        Ok(Some(EnrolledCourse {
            enrollment_id: EnrollmentId::new(self.id).map_err(invalid)?,
            course: course.into_course()?,
            progress: Progress::new(self.progress.unwrap_or(0.0)).map_err(invalid)?,
            payment_completed: self
                .payment_status
                .as_deref()
                .is_none_or(|s| s.eq_ignore_ascii_case(PAYMENT_COMPLETED)),
            enrolled_at: self.enrolled_at,
        }))
    }
}
