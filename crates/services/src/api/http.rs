use async_trait::async_trait;
use learning_core::model::{Course, CourseId, Enrollment, EnrollmentId, Lecture, LectureId};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::wire::{
    CourseDetailsResponse, EnrollmentResponse, ErrorBody, LectureRequest, LecturesResponse,
    MutationResponse, MyEnrollmentsResponse,
};
use super::{CourseApi, EnrolledCourse, EnrollmentUpdate};
use crate::config::ApiConfig;
use crate::error::ApiError;

/// `CourseApi` over the backend's JSON/HTTP interface.
#[derive(Clone, Debug)]
pub struct HttpCourseApi {
    client: Client,
    config: ApiConfig,
}

impl HttpCourseApi {
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::new(ApiConfig::from_env()).ok()
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.config.endpoint(segments)?;
        log::debug!("GET {url}");
        let response = self.authorize(self.client.get(url)).send().await?;
        decode(response).await
    }

    async fn post_lecture(
        &self,
        enrollment_id: &EnrollmentId,
        lecture_id: &LectureId,
        action: &str,
    ) -> Result<EnrollmentUpdate, ApiError> {
        let url = self
            .config
            .endpoint(&["enrollment", enrollment_id.as_str(), action])?;
        log::debug!("POST {url} lecture={lecture_id}");
        let payload = LectureRequest {
            lecture_id: lecture_id.as_str(),
        };
        let response = self
            .authorize(self.client.post(url))
            .json(&payload)
            .send()
            .await?;
        let body: MutationResponse = decode(response).await?;
        body.into_update()
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message);
        return Err(ApiError::HttpStatus { status, message });
    }
    Ok(response.json().await?)
}

#[async_trait]
impl CourseApi for HttpCourseApi {
    async fn course_details(&self, course_id: &CourseId) -> Result<Course, ApiError> {
        let body: CourseDetailsResponse = self
            .get_json(&["courses", "courseDetails", course_id.as_str()])
            .await?;
        body.into_course()
    }

    async fn lectures(&self, course_id: &CourseId) -> Result<Vec<Lecture>, ApiError> {
        let body: LecturesResponse = self
            .get_json(&["courses", course_id.as_str(), "lectures"])
            .await?;
        body.into_lectures()
    }

    async fn enrollment_for_course(&self, course_id: &CourseId) -> Result<Enrollment, ApiError> {
        let body: EnrollmentResponse = self
            .get_json(&["enrollment", "course", course_id.as_str()])
            .await?;
        body.into_enrollment(course_id)
    }

    async fn complete_lecture(
        &self,
        enrollment_id: &EnrollmentId,
        lecture_id: &LectureId,
    ) -> Result<EnrollmentUpdate, ApiError> {
        self.post_lecture(enrollment_id, lecture_id, "complete-lecture")
            .await
    }

    async fn incomplete_lecture(
        &self,
        enrollment_id: &EnrollmentId,
        lecture_id: &LectureId,
    ) -> Result<EnrollmentUpdate, ApiError> {
        self.post_lecture(enrollment_id, lecture_id, "incomplete-lecture")
            .await
    }

    async fn my_enrollments(&self) -> Result<Vec<EnrolledCourse>, ApiError> {
        let body: MyEnrollmentsResponse = self.get_json(&["payments", "enrollments"]).await?;
        body.into_entries()
    }
}
