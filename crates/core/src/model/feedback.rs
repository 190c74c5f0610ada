use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::OwnerId;

pub const MAX_FEEDBACK_LEN: usize = 2000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FeedbackError {
    #[error("feedback cannot be empty")]
    Empty,

    #[error("feedback is {len} characters, the limit is {max}")]
    TooLong { len: usize, max: usize },
}

/// A free-text message from a player, tagged with its author and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    text: String,
    author: Option<OwnerId>,
    submitted_at: DateTime<Utc>,
}

impl Feedback {
    /// Build a feedback entry from raw input.
    ///
    /// # Errors
    ///
    /// Returns `FeedbackError` if the trimmed text is empty or too long.
    pub fn new(
        text: &str,
        author: Option<OwnerId>,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, FeedbackError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FeedbackError::Empty);
        }
        let len = text.chars().count();
        if len > MAX_FEEDBACK_LEN {
            return Err(FeedbackError::TooLong {
                len,
                max: MAX_FEEDBACK_LEN,
            });
        }
        Ok(Self {
            text: text.to_string(),
            author,
            submitted_at,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn author(&self) -> Option<&OwnerId> {
        self.author.as_ref()
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn text_is_trimmed() {
        let fb = Feedback::new("  more topics please \n", None, fixed_now()).unwrap();
        assert_eq!(fb.text(), "more topics please");
        assert!(fb.author().is_none());
    }

    #[test]
    fn blank_and_oversized_text_is_rejected() {
        assert_eq!(
            Feedback::new("   ", None, fixed_now()).unwrap_err(),
            FeedbackError::Empty
        );
        let long = "x".repeat(MAX_FEEDBACK_LEN + 1);
        assert!(matches!(
            Feedback::new(&long, None, fixed_now()).unwrap_err(),
            FeedbackError::TooLong { .. }
        ));
    }
}
