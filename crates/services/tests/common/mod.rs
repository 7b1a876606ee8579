#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use learning_core::model::{
    Course, CourseId, Enrollment, EnrollmentId, Lecture, LectureId, Progress,
};
use learning_core::time::fixed_clock;
use reqwest::StatusCode;
use services::{ApiError, CourseApi, EnrolledCourse, EnrollmentUpdate, LearningSessionService};
use storage::repository::{InMemoryRepository, KeyValueStore};

pub const PLAYABLE: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CourseDetails,
    Lectures,
    Enrollment,
    Complete(LectureId),
    Incomplete(LectureId),
    MyEnrollments,
}

#[derive(Debug, Default)]
struct FakeState {
    completed: Vec<LectureId>,
    calls: Vec<Call>,
    enrolled: bool,
    course_missing: bool,
    hang_lectures: bool,
    fail_mutations: bool,
    progress_override: Option<f64>,
}

/// In-memory backend that dedupes completions and reports rounded progress.
pub struct FakeCourseApi {
    course: Course,
    lectures: Vec<Lecture>,
    enrollment_id: EnrollmentId,
    state: Mutex<FakeState>,
}

impl FakeCourseApi {
    pub fn new(lectures: Vec<Lecture>) -> Self {
        Self {
            course: Course::new(course_id(), "Rust from Scratch", Some("Programming".into()), 6.0, None)
                .unwrap(),
            lectures,
            enrollment_id: EnrollmentId::new("enr-1").unwrap(),
            state: Mutex::new(FakeState {
                enrolled: true,
                ..FakeState::default()
            }),
        }
    }

    pub fn with_completed(self, ids: &[&str]) -> Self {
        self.state.lock().unwrap().completed = ids.iter().map(|id| lid(id)).collect();
        self
    }

    pub fn not_enrolled(self) -> Self {
        self.state.lock().unwrap().enrolled = false;
        self
    }

    pub fn course_missing(self) -> Self {
        self.state.lock().unwrap().course_missing = true;
        self
    }

    pub fn hang_lectures(self) -> Self {
        self.state.lock().unwrap().hang_lectures = true;
        self
    }

    pub fn set_fail_mutations(&self, fail: bool) {
        self.state.lock().unwrap().fail_mutations = fail;
    }

    pub fn set_progress_override(&self, progress: Option<f64>) {
        self.state.lock().unwrap().progress_override = progress;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutation_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Complete(_) | Call::Incomplete(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn progress(&self, completed: usize) -> f64 {
        if self.lectures.is_empty() {
            return 0.0;
        }
        (completed as f64 * 100.0 / self.lectures.len() as f64).round()
    }

    fn mutate(
        &self,
        enrollment_id: &EnrollmentId,
        apply: impl FnOnce(&mut Vec<LectureId>),
        message: &str,
    ) -> Result<EnrollmentUpdate, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_mutations {
            return Err(ApiError::HttpStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: Some("database unavailable".into()),
            });
        }
        if enrollment_id != &self.enrollment_id {
            return Err(ApiError::HttpStatus {
                status: StatusCode::NOT_FOUND,
                message: Some("Enrollment not found".into()),
            });
        }
        apply(&mut state.completed);
        let progress = state
            .progress_override
            .unwrap_or_else(|| self.progress(state.completed.len()));
        Ok(EnrollmentUpdate {
            completed: state.completed.clone(),
            progress: Progress::new(progress).unwrap(),
            last_activity: None,
            message: Some(message.into()),
        })
    }
}

#[async_trait]
impl CourseApi for FakeCourseApi {
    async fn course_details(&self, id: &CourseId) -> Result<Course, ApiError> {
        self.record(Call::CourseDetails);
        if self.state.lock().unwrap().course_missing || id != self.course.id() {
            return Err(ApiError::HttpStatus {
                status: StatusCode::NOT_FOUND,
                message: Some("Course not found".into()),
            });
        }
        Ok(self.course.clone())
    }

    async fn lectures(&self, _id: &CourseId) -> Result<Vec<Lecture>, ApiError> {
        self.record(Call::Lectures);
        let hang = self.state.lock().unwrap().hang_lectures;
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(self.lectures.clone())
    }

    async fn enrollment_for_course(&self, id: &CourseId) -> Result<Enrollment, ApiError> {
        self.record(Call::Enrollment);
        let state = self.state.lock().unwrap();
        if !state.enrolled {
            return Err(ApiError::NotEnrolled);
        }
        Ok(Enrollment::new(
            self.enrollment_id.clone(),
            id.clone(),
            Some("viewer-1".into()),
            state.completed.clone(),
            Progress::new(self.progress(state.completed.len())).unwrap(),
            None,
        ))
    }

    async fn complete_lecture(
        &self,
        enrollment_id: &EnrollmentId,
        lecture_id: &LectureId,
    ) -> Result<EnrollmentUpdate, ApiError> {
        self.record(Call::Complete(lecture_id.clone()));
        self.mutate(
            enrollment_id,
            |completed| {
                if !completed.contains(lecture_id) {
                    completed.push(lecture_id.clone());
                }
            },
            "Lecture marked as complete",
        )
    }

    async fn incomplete_lecture(
        &self,
        enrollment_id: &EnrollmentId,
        lecture_id: &LectureId,
    ) -> Result<EnrollmentUpdate, ApiError> {
        self.record(Call::Incomplete(lecture_id.clone()));
        self.mutate(
            enrollment_id,
            |completed| completed.retain(|id| id != lecture_id),
            "Lecture marked as incomplete",
        )
    }

    async fn my_enrollments(&self) -> Result<Vec<EnrolledCourse>, ApiError> {
        self.record(Call::MyEnrollments);
        let state = self.state.lock().unwrap();
        Ok(vec![EnrolledCourse {
            enrollment_id: self.enrollment_id.clone(),
            course: self.course.clone(),
            progress: Progress::new(self.progress(state.completed.len())).unwrap(),
            payment_completed: state.enrolled,
            enrolled_at: None,
        }])
    }
}

pub fn course_id() -> CourseId {
    CourseId::new("course-1").unwrap()
}

pub fn lid(raw: &str) -> LectureId {
    LectureId::new(raw).unwrap()
}

pub fn lecture(id: &str, video: Option<&str>) -> Lecture {
    Lecture::new(lid(id), format!("Lecture {id}"), video.map(str::to_owned), Vec::new()).unwrap()
}

pub fn three_lectures() -> Vec<Lecture> {
    vec![
        lecture("L1", Some(PLAYABLE)),
        lecture("L2", Some(PLAYABLE)),
        lecture("L3", Some(PLAYABLE)),
    ]
}

pub struct Harness {
    pub api: Arc<FakeCourseApi>,
    pub slots: Arc<InMemoryRepository>,
    pub service: LearningSessionService,
}

pub fn harness(api: FakeCourseApi) -> Harness {
    let api = Arc::new(api);
    let slots = Arc::new(InMemoryRepository::new());
    let service = LearningSessionService::new(
        fixed_clock(),
        Arc::clone(&api) as Arc<dyn CourseApi>,
        Arc::clone(&slots) as Arc<dyn KeyValueStore>,
    );
    Harness {
        api,
        slots,
        service,
    }
}

pub async fn last_watched(slots: &InMemoryRepository) -> Option<String> {
    slots.get("last_watched_course-1").await.unwrap()
}
