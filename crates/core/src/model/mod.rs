mod course;
mod enrollment;
mod ids;
mod lecture;
mod progress;

pub use course::{Course, CourseError};
pub use enrollment::{Enrollment, EnrollmentError};
pub use ids::{CourseId, EnrollmentId, IdError, LectureId};
pub use lecture::{Lecture, LectureError, LectureResource};
pub use progress::{Progress, ProgressError};
