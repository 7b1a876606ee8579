use thiserror::Error;

use crate::model::{CourseError, EnrollmentError, IdError, LectureError, ProgressError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Lecture(#[from] LectureError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
}
