use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use learning_core::model::{Course, Enrollment, Lecture, LectureId, Progress};
use learning_core::video::PlayabilityPolicy;
use tokio::sync::watch;

use super::auto_advance::AutoAdvanceTicket;
use super::progress::SessionOverview;
use super::view::{LectureListItem, PlaybackState, SessionSnapshot};
use crate::api::EnrollmentUpdate;
use crate::error::NavigationError;
use crate::loader::CourseSnapshot;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one viewer working through one course.
///
/// Holds the lecture sequence, the current-lecture pointer and the last enrollment
/// state reported by the backend. All transitions here are synchronous; persistence
/// and backend calls are layered on top by `LearningSessionService`.
pub struct LearningSession {
    course: Course,
    lectures: Vec<Lecture>,
    enrollment: Enrollment,
    policy: PlayabilityPolicy,
    current: Option<usize>,
    video_error: bool,
    revision: u64,
    pending_advance: Option<AutoAdvanceTicket>,
    updates: watch::Sender<SessionSnapshot>,
}

impl LearningSession {
    /// Build a session from a loaded snapshot.
    ///
    /// The pointer starts at `restored` when it names a lecture of this course,
    /// otherwise at the first lecture. Completed ids the course does not contain are dropped.
    #[must_use]
    pub fn new(
        snapshot: CourseSnapshot,
        restored: Option<&LectureId>,
        policy: PlayabilityPolicy,
    ) -> Self {
        let CourseSnapshot {
            course,
            lectures,
            mut enrollment,
        } = snapshot;

        let dropped = enrollment.retain_known(|id| lectures.iter().any(|l| l.id() == id));
        if dropped > 0 {
            log::warn!(
                "ignoring {dropped} completed lecture(s) not in course {}",
                course.id()
            );
        }

        let restored_index =
            restored.and_then(|id| lectures.iter().position(|lecture| lecture.id() == id));
        let current = restored_index.or(if lectures.is_empty() { None } else { Some(0) });
        if let (Some(id), None) = (restored, restored_index) {
            log::debug!("last watched lecture {id} no longer exists; starting from the top");
        }

        let (updates, _) = watch::channel(SessionSnapshot {
            course_id: course.id().clone(),
            current_lecture: None,
            state: PlaybackState::NoLectureSelected,
            completed: Vec::new(),
            progress: Progress::ZERO,
            pending_auto_advance: None,
        });

        let session = Self {
            course,
            lectures,
            enrollment,
            policy,
            current,
            video_error: false,
            revision: 0,
            pending_advance: None,
            updates,
        };
        session.publish();
        session
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn lectures(&self) -> &[Lecture] {
        &self.lectures
    }

    #[must_use]
    pub fn enrollment(&self) -> &Enrollment {
        &self.enrollment
    }

    #[must_use]
    pub fn playability(&self) -> PlayabilityPolicy {
        self.policy
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.enrollment.progress()
    }

    #[must_use]
    pub fn completed_lectures(&self) -> &[LectureId] {
        self.enrollment.completed_lectures()
    }

    #[must_use]
    pub fn is_completed(&self, lecture_id: &LectureId) -> bool {
        self.enrollment.is_completed(lecture_id)
    }

    #[must_use]
    pub fn contains(&self, lecture_id: &LectureId) -> bool {
        self.index_of(lecture_id).is_some()
    }

    #[must_use]
    pub fn index_of(&self, lecture_id: &LectureId) -> Option<usize> {
        self.lectures.iter().position(|l| l.id() == lecture_id)
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn current_lecture(&self) -> Option<&Lecture> {
        self.current.and_then(|i| self.lectures.get(i))
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current.is_some_and(|i| i + 1 < self.lectures.len())
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.current.is_some_and(|i| i > 0)
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        match (self.current, self.video_error) {
            (None, _) => PlaybackState::NoLectureSelected,
            (Some(_), false) => PlaybackState::LectureSelected,
            (Some(_), true) => PlaybackState::VideoError,
        }
    }

    /// Raw video reference of the current lecture, for "open original link".
    #[must_use]
    pub fn external_video_link(&self) -> Option<&str> {
        self.current_lecture().and_then(Lecture::video_url)
    }

    #[must_use]
    pub fn current_embed_url(&self) -> Option<String> {
        self.current_lecture().and_then(Lecture::embed_url)
    }

    #[must_use]
    pub fn pending_auto_advance(&self) -> Option<&AutoAdvanceTicket> {
        self.pending_advance.as_ref()
    }

    // ─── Navigation ────────────────────────────────────────────────────────────

    /// Point the session at `lecture_id`.
    ///
    /// # Errors
    ///
    /// `NavigationError::UnknownLecture` if the course has no such lecture,
    /// `NavigationError::Unplayable` if it has no playable video.
    pub fn select_lecture(&mut self, lecture_id: &LectureId) -> Result<&Lecture, NavigationError> {
        let index = self
            .index_of(lecture_id)
            .ok_or_else(|| NavigationError::UnknownLecture(lecture_id.clone()))?;
        if !self.lectures[index].is_playable(self.policy) {
            return Err(NavigationError::Unplayable(lecture_id.clone()));
        }
        Ok(self.move_to(index))
    }

    /// Advance to the following lecture. Unplayable lectures are not skipped.
    ///
    /// # Errors
    ///
    /// `NavigationError::NoLectures` for an empty course, `NavigationError::AtEnd` on the last lecture.
    pub fn next(&mut self) -> Result<&Lecture, NavigationError> {
        let index = self.current.ok_or(NavigationError::NoLectures)?;
        if index + 1 >= self.lectures.len() {
            return Err(NavigationError::AtEnd);
        }
        Ok(self.move_to(index + 1))
    }

    /// Step back to the preceding lecture. Unplayable lectures are not skipped.
    ///
    /// # Errors
    ///
    /// `NavigationError::NoLectures` for an empty course, `NavigationError::AtStart` on the first lecture.
    pub fn previous(&mut self) -> Result<&Lecture, NavigationError> {
        let index = self.current.ok_or(NavigationError::NoLectures)?;
        if index == 0 {
            return Err(NavigationError::AtStart);
        }
        Ok(self.move_to(index - 1))
    }

    fn move_to(&mut self, index: usize) -> &Lecture {
        self.current = Some(index);
        self.video_error = false;
        self.revision += 1;
        if let Some(ticket) = self.pending_advance.take() {
            log::debug!("auto-advance to {} superseded by navigation", ticket.target);
        }
        self.publish();
        &self.lectures[index]
    }

    // ─── Player ────────────────────────────────────────────────────────────────

    /// Record that the embedded player failed. Ignored when no lecture is selected.
    pub fn report_video_error(&mut self) -> bool {
        if self.current.is_none() {
            return false;
        }
        if !self.video_error {
            self.video_error = true;
            self.publish();
        }
        true
    }

    /// Leave the video-error state so the player can try again.
    pub fn retry_video(&mut self) -> bool {
        if !self.video_error {
            return false;
        }
        self.video_error = false;
        self.publish();
        true
    }

    // ─── Backend reconciliation ────────────────────────────────────────────────

    /// Replace completion state with what the backend returned.
    pub(crate) fn apply_update(&mut self, update: EnrollmentUpdate) {
        let EnrollmentUpdate {
            completed,
            progress,
            last_activity,
            ..
        } = update;
        let known: Vec<LectureId> = completed
            .into_iter()
            .filter(|id| {
                let known = self.contains(id);
                if !known {
                    log::warn!("backend reported unknown completed lecture {id}");
                }
                known
            })
            .collect();
        self.enrollment
            .apply_backend_state(known, progress, last_activity);
        self.publish();
    }

    /// Queue a move to the lecture after `completed`, unless that lecture is already done.
    ///
    /// Replaces any previously pending advance.
    pub(crate) fn schedule_auto_advance(
        &mut self,
        completed: &LectureId,
        now: DateTime<Utc>,
        delay: Duration,
    ) -> Option<AutoAdvanceTicket> {
        self.cancel_auto_advance();

        let target = self
            .index_of(completed)
            .and_then(|index| self.lectures.get(index + 1))
            .filter(|lecture| !self.enrollment.is_completed(lecture.id()))?
            .id()
            .clone();

        let due_at = now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        self.revision += 1;
        let ticket = AutoAdvanceTicket {
            target,
            revision: self.revision,
            due_at,
            delay,
        };
        self.pending_advance = Some(ticket.clone());
        self.publish();
        Some(ticket)
    }

    /// Drop the pending advance, if any.
    pub fn cancel_auto_advance(&mut self) -> Option<AutoAdvanceTicket> {
        let ticket = self.pending_advance.take()?;
        self.revision += 1;
        self.publish();
        Some(ticket)
    }

    /// Pending advance whose delay has elapsed at `now`.
    #[must_use]
    pub fn due_auto_advance(&self, now: DateTime<Utc>) -> Option<AutoAdvanceTicket> {
        self.pending_advance
            .as_ref()
            .filter(|ticket| ticket.is_due(now))
            .cloned()
    }

    /// Carry out `ticket` if it is still the pending advance.
    ///
    /// Returns `None` when the ticket was superseded by navigation or a newer completion.
    pub fn apply_auto_advance(&mut self, ticket: &AutoAdvanceTicket) -> Option<&Lecture> {
        if self.pending_advance.as_ref() != Some(ticket) || ticket.revision != self.revision {
            log::debug!("auto-advance to {} suppressed", ticket.target);
            return None;
        }
        let index = self.index_of(&ticket.target)?;
        self.pending_advance = None;
        Some(self.move_to(index))
    }

    // ─── Observation ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            course_id: self.course.id().clone(),
            current_lecture: self.current_lecture().map(|l| l.id().clone()),
            state: self.state(),
            completed: self.completed_lectures().to_vec(),
            progress: self.progress(),
            pending_auto_advance: self.pending_advance.as_ref().map(|t| t.target.clone()),
        }
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }

    #[must_use]
    pub fn overview(&self) -> SessionOverview {
        let progress = self.progress();
        SessionOverview {
            progress,
            completed: self.completed_lectures().len(),
            total: self.lectures.len(),
            position: self.current.map(|i| i + 1),
            has_next: self.has_next(),
            has_previous: self.has_previous(),
            current_completed: self
                .current_lecture()
                .is_some_and(|l| self.is_completed(l.id())),
            hours_watched: (self.course.duration_hours() * progress.percent() / 100.0).round(),
        }
    }

    #[must_use]
    pub fn lecture_list(&self) -> Vec<LectureListItem> {
        self.lectures
            .iter()
            .enumerate()
            .map(|(index, lecture)| LectureListItem {
                id: lecture.id().clone(),
                title: lecture.title().to_owned(),
                position: index + 1,
                playable: lecture.is_playable(self.policy),
                completed: self.is_completed(lecture.id()),
                current: self.current == Some(index),
                resource_count: lecture.resources().len(),
            })
            .collect()
    }
}

impl fmt::Debug for LearningSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LearningSession")
            .field("course_id", self.course.id())
            .field("lectures_len", &self.lectures.len())
            .field("current", &self.current)
            .field("video_error", &self.video_error)
            .field("completed_len", &self.completed_lectures().len())
            .field("progress", &self.progress())
            .field("pending_advance", &self.pending_advance)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use learning_core::model::{CourseId, EnrollmentId};
    use learning_core::time::fixed_now;

    const PLAYABLE: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn lid(raw: &str) -> LectureId {
        LectureId::new(raw).unwrap()
    }

    fn lecture(id: &str, video: Option<&str>) -> Lecture {
        Lecture::new(lid(id), format!("Lecture {id}"), video.map(str::to_owned), Vec::new()).unwrap()
    }

    fn snapshot(lectures: Vec<Lecture>, completed: &[&str], progress: f64) -> CourseSnapshot {
        let course_id = CourseId::new("c1").unwrap();
        CourseSnapshot {
            course: Course::new(course_id.clone(), "Course", None, 10.0, None).unwrap(),
            lectures,
            enrollment: Enrollment::new(
                EnrollmentId::new("e1").unwrap(),
                course_id,
                None,
                completed.iter().map(|id| lid(id)).collect(),
                Progress::new(progress).unwrap(),
                None,
            ),
        }
    }

    fn three_lectures() -> Vec<Lecture> {
        vec![
            lecture("l1", Some(PLAYABLE)),
            lecture("l2", Some(PLAYABLE)),
            lecture("l3", Some(PLAYABLE)),
        ]
    }

    fn session(lectures: Vec<Lecture>) -> LearningSession {
        LearningSession::new(snapshot(lectures, &[], 0.0), None, PlayabilityPolicy::Strict)
    }

    fn update(completed: &[&str], progress: f64) -> EnrollmentUpdate {
        EnrollmentUpdate {
            completed: completed.iter().map(|id| lid(id)).collect(),
            progress: Progress::new(progress).unwrap(),
            last_activity: None,
            message: None,
        }
    }

    #[test]
    fn empty_course_has_no_lecture_selected() {
        let mut session = session(Vec::new());
        assert_eq!(session.state(), PlaybackState::NoLectureSelected);
        assert_eq!(session.next().unwrap_err(), NavigationError::NoLectures);
        assert_eq!(session.previous().unwrap_err(), NavigationError::NoLectures);
        assert!(!session.report_video_error());
    }

    #[test]
    fn starts_at_first_lecture_without_restore() {
        let session = session(three_lectures());
        assert_eq!(session.current_lecture().unwrap().id(), &lid("l1"));
        assert_eq!(session.state(), PlaybackState::LectureSelected);
    }

    #[test]
    fn restores_existing_last_watched_lecture() {
        let session = LearningSession::new(
            snapshot(three_lectures(), &[], 0.0),
            Some(&lid("l3")),
            PlayabilityPolicy::Strict,
        );
        assert_eq!(session.current_index(), Some(2));
    }

    #[test]
    fn stale_last_watched_falls_back_to_first() {
        let session = LearningSession::new(
            snapshot(three_lectures(), &[], 0.0),
            Some(&lid("deleted")),
            PlayabilityPolicy::Strict,
        );
        assert_eq!(session.current_index(), Some(0));
    }

    #[test]
    fn next_then_previous_returns_to_start() {
        let mut session = session(three_lectures());
        session.select_lecture(&lid("l2")).unwrap();
        session.next().unwrap();
        session.previous().unwrap();
        assert_eq!(session.current_lecture().unwrap().id(), &lid("l2"));
    }

    #[test]
    fn bounds_are_rejected_without_moving() {
        let mut session = session(three_lectures());
        assert_eq!(session.previous().unwrap_err(), NavigationError::AtStart);
        session.select_lecture(&lid("l3")).unwrap();
        assert_eq!(session.next().unwrap_err(), NavigationError::AtEnd);
        assert_eq!(session.current_index(), Some(2));
    }

    #[test]
    fn selecting_unknown_or_unplayable_lecture_is_rejected() {
        let mut session = session(vec![
            lecture("l1", Some(PLAYABLE)),
            lecture("l2", Some("https://vimeo.com/123456789")),
            lecture("l3", None),
        ]);
        let before = session.snapshot();

        assert_eq!(
            session.select_lecture(&lid("nope")).unwrap_err(),
            NavigationError::UnknownLecture(lid("nope"))
        );
        assert_eq!(
            session.select_lecture(&lid("l2")).unwrap_err(),
            NavigationError::Unplayable(lid("l2"))
        );
        assert_eq!(
            session.select_lecture(&lid("l3")).unwrap_err(),
            NavigationError::Unplayable(lid("l3"))
        );
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn next_lands_on_unplayable_lectures() {
        let mut session = session(vec![lecture("l1", Some(PLAYABLE)), lecture("l2", None)]);
        assert_eq!(session.next().unwrap().id(), &lid("l2"));
    }

    #[test]
    fn direct_links_policy_allows_other_hosts() {
        let mut session = LearningSession::new(
            snapshot(
                vec![
                    lecture("l1", Some(PLAYABLE)),
                    lecture("l2", Some("https://cdn.example.com/intro.mp4")),
                ],
                &[],
                0.0,
            ),
            None,
            PlayabilityPolicy::AllowDirectLinks,
        );
        assert!(session.select_lecture(&lid("l2")).is_ok());
    }

    #[test]
    fn video_error_cycle() {
        let mut session = session(three_lectures());
        assert!(session.report_video_error());
        assert_eq!(session.state(), PlaybackState::VideoError);
        assert!(session.retry_video());
        assert_eq!(session.state(), PlaybackState::LectureSelected);
        assert!(!session.retry_video());

        session.report_video_error();
        session.next().unwrap();
        assert_eq!(session.state(), PlaybackState::LectureSelected);
    }

    #[test]
    fn update_replaces_completed_set_and_progress_verbatim() {
        let mut session = LearningSession::new(
            snapshot(three_lectures(), &["l1", "l2"], 66.0),
            None,
            PlayabilityPolicy::Strict,
        );
        session.apply_update(update(&["l2", "ghost", "l2"], 12.5));
        assert_eq!(session.completed_lectures(), &[lid("l2")]);
        assert_eq!(session.progress().percent(), 12.5);
    }

    #[test]
    fn foreign_completed_ids_are_dropped_on_load() {
        let session = LearningSession::new(
            snapshot(three_lectures(), &["l1", "other-course-lecture"], 33.0),
            None,
            PlayabilityPolicy::Strict,
        );
        assert_eq!(session.completed_lectures(), &[lid("l1")]);
    }

    #[test]
    fn auto_advance_targets_following_incomplete_lecture() {
        let mut session = session(three_lectures());
        session.apply_update(update(&["l1"], 33.0));
        let ticket = session
            .schedule_auto_advance(&lid("l1"), fixed_now(), Duration::from_secs(2))
            .unwrap();
        assert_eq!(ticket.target(), &lid("l2"));
        assert!(session.due_auto_advance(fixed_now()).is_none());

        let later = fixed_now() + chrono::Duration::seconds(2);
        let due = session.due_auto_advance(later).unwrap();
        assert_eq!(session.apply_auto_advance(&due).unwrap().id(), &lid("l2"));
        assert!(session.pending_auto_advance().is_none());
    }

    #[test]
    fn no_auto_advance_when_following_lecture_is_done_or_missing() {
        let mut session = session(three_lectures());
        session.apply_update(update(&["l1", "l2"], 66.0));
        assert!(session
            .schedule_auto_advance(&lid("l1"), fixed_now(), Duration::ZERO)
            .is_none());
        assert!(session
            .schedule_auto_advance(&lid("l3"), fixed_now(), Duration::ZERO)
            .is_none());
    }

    #[test]
    fn manual_navigation_suppresses_auto_advance() {
        let mut session = session(three_lectures());
        let ticket = session
            .schedule_auto_advance(&lid("l1"), fixed_now(), Duration::from_secs(2))
            .unwrap();
        session.select_lecture(&lid("l3")).unwrap();
        assert!(session.apply_auto_advance(&ticket).is_none());
        assert_eq!(session.current_lecture().unwrap().id(), &lid("l3"));
    }

    #[test]
    fn newer_completion_invalidates_older_ticket() {
        let mut session = session(three_lectures());
        let first = session
            .schedule_auto_advance(&lid("l1"), fixed_now(), Duration::ZERO)
            .unwrap();
        let second = session
            .schedule_auto_advance(&lid("l1"), fixed_now(), Duration::ZERO)
            .unwrap();
        assert!(session.apply_auto_advance(&first).is_none());
        assert!(session.apply_auto_advance(&second).is_some());
    }

    #[test]
    fn observers_see_every_transition() {
        let mut session = session(three_lectures());
        let mut rx = session.subscribe();
        assert_eq!(rx.borrow_and_update().current_lecture, Some(lid("l1")));

        session.next().unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().current_lecture, Some(lid("l2")));

        session.report_video_error();
        assert_eq!(rx.borrow_and_update().state, PlaybackState::VideoError);
    }

    #[test]
    fn overview_uses_backend_progress() {
        let mut session = session(three_lectures());
        session.apply_update(update(&["l1"], 33.0));
        let overview = session.overview();
        assert_eq!(overview.completed, 1);
        assert_eq!(overview.total, 3);
        assert_eq!(overview.position, Some(1));
        assert!(overview.current_completed);
        assert!(overview.has_next);
        assert!(!overview.has_previous);
        assert!((overview.hours_watched - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lecture_list_marks_current_and_playability() {
        let session = session(vec![lecture("l1", Some(PLAYABLE)), lecture("l2", None)]);
        let list = session.lecture_list();
        assert!(list[0].current && list[0].playable);
        assert!(!list[1].current && !list[1].playable);
        assert_eq!(list[1].position, 2);
    }
}
