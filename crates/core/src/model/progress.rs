use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress must be within 0..=100 (got {0})")]
    OutOfRange(f64),
}

/// Course completion percentage exactly as reported by the backend.
///
/// Never computed locally; the tracker only mirrors the last value it received.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Progress(f64);

impl Progress {
    pub const ZERO: Self = Self(0.0);

    /// # Errors
    ///
    /// Returns `ProgressError::OutOfRange` for values outside 0..=100 or non-finite values.
    pub fn new(percent: f64) -> Result<Self, ProgressError> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(ProgressError::OutOfRange(percent));
        }
        Ok(Self(percent))
    }

    #[must_use]
    pub fn percent(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 >= 100.0
    }
}

impl TryFrom<f64> for Progress {
    type Error = ProgressError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Progress> for f64 {
    fn from(progress: Progress) -> Self {
        progress.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
