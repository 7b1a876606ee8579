use std::time::Duration;

use chrono::{DateTime, Utc};
use learning_core::model::LectureId;

/// A pending move to the lecture after one that was just completed.
///
/// The ticket is only honored while it is still the session's pending advance;
/// any manual navigation or newer completion invalidates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoAdvanceTicket {
    pub(crate) target: LectureId,
    pub(crate) revision: u64,
    pub(crate) due_at: DateTime<Utc>,
    pub(crate) delay: Duration,
}

impl AutoAdvanceTicket {
    #[must_use]
    pub fn target(&self) -> &LectureId {
        &self.target
    }

    #[must_use]
    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.due_at
    }
}
