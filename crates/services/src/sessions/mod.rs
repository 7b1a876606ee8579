mod auto_advance;
mod progress;
mod service;
mod view;
mod workflow;

// Public API of the learning session subsystem.
pub use crate::error::{NavigationError, SyncError};
pub use auto_advance::AutoAdvanceTicket;
pub use progress::SessionOverview;
pub use service::LearningSession;
pub use view::{LectureListItem, PlaybackState, SessionSnapshot};
pub use workflow::{CompletionOutcome, LearningSessionService};
