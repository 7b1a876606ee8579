#![forbid(unsafe_code)]

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod loader;
pub mod sessions;

pub use learning_core::Clock;
pub use sessions as session;

pub use api::{CourseApi, EnrolledCourse, EnrollmentUpdate, HttpCourseApi};
pub use catalog::EnrollmentCatalog;
pub use config::{ApiConfig, TrackerSettings};
pub use error::{ApiError, LoadError, NavigationError, SyncError};
pub use loader::{CourseSnapshot, load_course};
pub use sessions::{
    AutoAdvanceTicket, CompletionOutcome, LearningSession, LearningSessionService,
    LectureListItem, PlaybackState, SessionOverview, SessionSnapshot,
};
