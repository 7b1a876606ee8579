use learning_core::model::Progress;

/// Aggregated view of course progress, useful for UI.
///
/// `progress` is the backend's figure; nothing here recomputes it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOverview {
    pub progress: Progress,
    pub completed: usize,
    pub total: usize,
    /// 1-based position of the current lecture.
    pub position: Option<usize>,
    pub has_next: bool,
    pub has_previous: bool,
    pub current_completed: bool,
    /// Course duration scaled by progress, rounded to whole hours.
    pub hours_watched: f64,
}
