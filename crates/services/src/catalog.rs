use crate::api::{CourseApi, EnrolledCourse};
use crate::error::ApiError;

/// The viewer's enrolled courses ("my courses").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentCatalog {
    entries: Vec<EnrolledCourse>,
}

impl EnrollmentCatalog {
    #[must_use]
    pub fn new(entries: Vec<EnrolledCourse>) -> Self {
        Self { entries }
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the listing cannot be fetched.
    pub async fn fetch(api: &dyn CourseApi) -> Result<Self, ApiError> {
        let entries = api.my_enrollments().await?;
        log::debug!("fetched {} enrollments", entries.len());
        Ok(Self::new(entries))
    }

    #[must_use]
    pub fn entries(&self) -> &[EnrolledCourse] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose course title contains `term`, ignoring case. A blank term matches all.
    #[must_use]
    pub fn filter_by_title(&self, term: &str) -> Vec<&EnrolledCourse> {
        let needle = term.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|entry| {
                needle.is_empty() || entry.course.title().to_lowercase().contains(&needle)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learning_core::model::{Course, CourseId, EnrollmentId, Progress};

    fn entry(id: &str, title: &str, progress: f64) -> EnrolledCourse {
        EnrolledCourse {
            enrollment_id: EnrollmentId::new(format!("e-{id}")).unwrap(),
            course: Course::new(CourseId::new(id).unwrap(), title, None, 1.0, None).unwrap(),
            progress: Progress::new(progress).unwrap(),
            payment_completed: true,
            enrolled_at: None,
        }
    }

    fn catalog() -> EnrollmentCatalog {
        EnrollmentCatalog::new(vec![
            entry("c1", "Rust Fundamentals", 0.0),
            entry("c2", "Advanced rust patterns", 40.0),
            entry("c3", "Go in Practice", 100.0),
        ])
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let catalog = catalog();
        let hits: Vec<_> = catalog
            .filter_by_title("RUST")
            .into_iter()
            .map(|e| e.course.id().as_str())
            .collect();
        assert_eq!(hits, vec!["c1", "c2"]);
    }

    #[test]
    fn blank_term_matches_everything() {
        assert_eq!(catalog().filter_by_title("  ").len(), 3);
    }

    #[test]
    fn started_reflects_progress() {
        let catalog = catalog();
        assert!(!catalog.entries()[0].is_started());
        assert!(catalog.entries()[1].is_started());
    }
}
