use std::sync::Arc;

use chrono::{DateTime, Utc};
use learning_core::model::{CourseId, EnrollmentId, LectureId, Progress};
use storage::repository::{KeyValueStore, LastWatchedSlot};
use tokio::sync::Mutex;

use super::auto_advance::AutoAdvanceTicket;
use super::service::LearningSession;
use crate::api::CourseApi;
use crate::config::TrackerSettings;
use crate::error::{LoadError, NavigationError, SyncError};
use crate::loader::load_course;
use crate::Clock;

/// Result of a completion toggle that the backend accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub lecture_id: LectureId,
    /// Whether the backend now lists the lecture as completed.
    pub completed: bool,
    pub progress: Progress,
    pub message: Option<String>,
    pub auto_advance: Option<AutoAdvanceTicket>,
}

/// Orchestrates loading, navigation persistence and completion sync for learning sessions.
#[derive(Clone)]
pub struct LearningSessionService {
    clock: Clock,
    api: Arc<dyn CourseApi>,
    last_watched: LastWatchedSlot,
    settings: TrackerSettings,
}

impl LearningSessionService {
    #[must_use]
    pub fn new(clock: Clock, api: Arc<dyn CourseApi>, slots: Arc<dyn KeyValueStore>) -> Self {
        Self {
            clock,
            api,
            last_watched: LastWatchedSlot::new(slots),
            settings: TrackerSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: TrackerSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Load a course and position the session at the last watched lecture.
    ///
    /// An unreadable last-watched slot is treated as empty. A slot naming a lecture
    /// that no longer exists is cleared.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NotEnrolledOrNotFound` when the course cannot be loaded.
    pub async fn open(&self, course_id: &CourseId) -> Result<LearningSession, LoadError> {
        let snapshot = load_course(self.api.as_ref(), course_id).await?;
        let mut restored = match self.last_watched.load(course_id).await {
            Ok(restored) => restored,
            Err(err) => {
                log::warn!("could not read last watched lecture for {course_id}: {err}");
                None
            }
        };
        let known = |id: &mut LectureId| snapshot.lectures.iter().any(|l| l.id() == &*id);
        if let Some(stale) = restored.take_if(|id| !known(id)) {
            log::debug!("forgetting last watched lecture {stale} of {course_id}");
            if let Err(err) = self.last_watched.clear(course_id).await {
                log::warn!("could not clear last watched lecture for {course_id}: {err}");
            }
        }

        let session = LearningSession::new(snapshot, restored.as_ref(), self.settings.playability);
        if let Some(lecture) = session.current_lecture() {
            log::debug!("session for {course_id} starts at lecture {}", lecture.id());
        }
        Ok(session)
    }

    /// Jump to a lecture chosen from the lecture list.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError` when the lecture is unknown or unplayable; nothing is persisted then.
    pub async fn select_lecture(
        &self,
        session: &mut LearningSession,
        lecture_id: &LectureId,
    ) -> Result<LectureId, NavigationError> {
        let moved = session
            .select_lecture(lecture_id)
            .inspect_err(|err| log::debug!("navigation rejected: {err}"))?
            .id()
            .clone();
        self.remember(session.course().id(), &moved).await;
        Ok(moved)
    }

    /// # Errors
    ///
    /// Returns `NavigationError::AtEnd` on the last lecture.
    pub async fn next(&self, session: &mut LearningSession) -> Result<LectureId, NavigationError> {
        let moved = session.next()?.id().clone();
        self.remember(session.course().id(), &moved).await;
        Ok(moved)
    }

    /// # Errors
    ///
    /// Returns `NavigationError::AtStart` on the first lecture.
    pub async fn previous(
        &self,
        session: &mut LearningSession,
    ) -> Result<LectureId, NavigationError> {
        let moved = session.previous()?.id().clone();
        self.remember(session.course().id(), &moved).await;
        Ok(moved)
    }

    /// Mark a lecture completed and adopt the backend's completed set and progress.
    ///
    /// When auto-advance is enabled and the following lecture is not yet completed,
    /// the outcome carries a ticket for moving there after the configured delay.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the lecture is unknown (no request is made) or the
    /// backend call fails. Local state is unchanged on error.
    pub async fn mark_complete(
        &self,
        session: &mut LearningSession,
        lecture_id: &LectureId,
    ) -> Result<CompletionOutcome, SyncError> {
        let enrollment_id = known_enrollment(session, lecture_id)?;
        let update = self
            .api
            .complete_lecture(&enrollment_id, lecture_id)
            .await
            .inspect_err(|err| log::warn!("complete {lecture_id} failed: {err}"))?;
        let message = update.message.clone();
        session.apply_update(update);

        let auto_advance = if self.settings.auto_advance {
            session.schedule_auto_advance(lecture_id, self.clock.now(), self.settings.auto_advance_delay)
        } else {
            session.cancel_auto_advance();
            None
        };

        Ok(CompletionOutcome {
            lecture_id: lecture_id.clone(),
            completed: session.is_completed(lecture_id),
            progress: session.progress(),
            message,
            auto_advance,
        })
    }

    /// Mark a lecture not completed. Already-incomplete lectures are accepted as-is.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the lecture is unknown or the backend call fails.
    /// Local state is unchanged on error.
    pub async fn mark_incomplete(
        &self,
        session: &mut LearningSession,
        lecture_id: &LectureId,
    ) -> Result<CompletionOutcome, SyncError> {
        let enrollment_id = known_enrollment(session, lecture_id)?;
        let update = self
            .api
            .incomplete_lecture(&enrollment_id, lecture_id)
            .await
            .inspect_err(|err| log::warn!("incomplete {lecture_id} failed: {err}"))?;
        let message = update.message.clone();
        session.apply_update(update);
        session.cancel_auto_advance();

        Ok(CompletionOutcome {
            lecture_id: lecture_id.clone(),
            completed: session.is_completed(lecture_id),
            progress: session.progress(),
            message,
            auto_advance: None,
        })
    }

    /// Flip a lecture's completion based on its current membership in the completed set.
    ///
    /// # Errors
    ///
    /// See `mark_complete` and `mark_incomplete`.
    pub async fn toggle_completion(
        &self,
        session: &mut LearningSession,
        lecture_id: &LectureId,
    ) -> Result<CompletionOutcome, SyncError> {
        if session.is_completed(lecture_id) {
            self.mark_incomplete(session, lecture_id).await
        } else {
            self.mark_complete(session, lecture_id).await
        }
    }

    /// Carry out the pending auto-advance if its delay has elapsed at `now`.
    ///
    /// Intended for hosts that drive the session from a UI tick.
    pub async fn apply_due_auto_advance(
        &self,
        session: &mut LearningSession,
        now: DateTime<Utc>,
    ) -> Option<LectureId> {
        let ticket = session.due_auto_advance(now)?;
        let moved = session.apply_auto_advance(&ticket)?.id().clone();
        log::debug!("auto-advanced to {moved}");
        self.remember(session.course().id(), &moved).await;
        Some(moved)
    }

    /// Sleep for the ticket's delay, then advance if nothing superseded it meanwhile.
    ///
    /// The session lock is only held after the delay, so manual navigation can run
    /// while this waits.
    pub async fn run_auto_advance(
        &self,
        session: &Mutex<LearningSession>,
        ticket: AutoAdvanceTicket,
    ) -> Option<LectureId> {
        tokio::time::sleep(ticket.delay()).await;
        let (course_id, moved) = {
            let mut guard = session.lock().await;
            let moved = guard.apply_auto_advance(&ticket)?.id().clone();
            (guard.course().id().clone(), moved)
        };
        log::debug!("auto-advanced to {moved}");
        self.remember(&course_id, &moved).await;
        Some(moved)
    }

    async fn remember(&self, course_id: &CourseId, lecture_id: &LectureId) {
        if let Err(err) = self.last_watched.save(course_id, lecture_id).await {
            log::warn!("could not persist last watched lecture for {course_id}: {err}");
        }
    }
}

fn known_enrollment(
    session: &LearningSession,
    lecture_id: &LectureId,
) -> Result<EnrollmentId, SyncError> {
    if session.contains(lecture_id) {
        Ok(session.enrollment().id().clone())
    } else {
        Err(SyncError::UnknownLecture(lecture_id.clone()))
    }
}
