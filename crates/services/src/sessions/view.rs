use learning_core::model::{CourseId, LectureId, Progress};

/// Player state of a learning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    NoLectureSelected,
    LectureSelected,
    VideoError,
}

/// State published to observers after every change.
///
/// This is intentionally not a view-model: no formatted strings, just the data a
/// view needs to re-render.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub course_id: CourseId,
    pub current_lecture: Option<LectureId>,
    pub state: PlaybackState,
    pub completed: Vec<LectureId>,
    pub progress: Progress,
    pub pending_auto_advance: Option<LectureId>,
}

/// One row of the lecture sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureListItem {
    pub id: LectureId,
    pub title: String,
    pub position: usize,
    /// Unplayable lectures are listed but cannot be selected directly.
    pub playable: bool,
    pub completed: bool,
    pub current: bool,
    pub resource_count: usize,
}
