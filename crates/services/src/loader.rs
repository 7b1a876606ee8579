use learning_core::model::{Course, CourseId, Enrollment, Lecture};

use crate::api::CourseApi;
use crate::error::{ApiError, LoadError};

/// Consistent view of a course as fetched at session start.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseSnapshot {
    pub course: Course,
    pub lectures: Vec<Lecture>,
    pub enrollment: Enrollment,
}

/// Fetch course details, lectures and the viewer's enrollment concurrently.
///
/// The three requests are issued together and the combine step fails fast: the
/// first rejection resolves the load without waiting for the remaining requests.
///
/// # Errors
///
/// Returns `LoadError::NotEnrolledOrNotFound` if any fetch fails, the viewer is not
/// enrolled, or the enrollment belongs to a different course.
pub async fn load_course(
    api: &dyn CourseApi,
    course_id: &CourseId,
) -> Result<CourseSnapshot, LoadError> {
    log::debug!("loading course {course_id}");

    let (course, lectures, enrollment) = tokio::try_join!(
        api.course_details(course_id),
        api.lectures(course_id),
        api.enrollment_for_course(course_id),
    )
    .map_err(|err| {
        log::warn!("course {course_id} unavailable: {err}");
        LoadError::NotEnrolledOrNotFound(err)
    })?;

    enrollment
        .ensure_course(course_id)
        .map_err(|err| LoadError::NotEnrolledOrNotFound(ApiError::InvalidPayload(err.into())))?;

    log::info!(
        "loaded course {course_id}: {} lectures, {} completed, progress {}",
        lectures.len(),
        enrollment.completed_lectures().len(),
        enrollment.progress()
    );

    Ok(CourseSnapshot {
        course,
        lectures,
        enrollment,
    })
}
