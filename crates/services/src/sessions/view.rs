use quiz_core::model::{OPTION_COUNT, ScoreSummary, SessionId, SessionMode, Topic};

use super::machine::Phase;
use super::progress::SessionProgress;

/// The question currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub index: usize,
    pub text: String,
    pub options: [String; OPTION_COUNT],
    pub chosen: Option<u8>,
    /// Practice reveal, or any question once the session is finished.
    pub revealed: bool,
    pub correct_option: Option<u8>,
    pub explanation: Option<String>,
}

/// Read-only snapshot of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub session_id: SessionId,
    pub phase: Phase,
    pub topic: Option<Topic>,
    pub mode: Option<SessionMode>,
    pub index: usize,
    pub total: usize,
    pub question: Option<QuestionView>,
    pub remaining_secs: Option<u32>,
    /// `remaining_secs` rendered as `m:ss`.
    pub clock: Option<String>,
    pub last_error: Option<String>,
    pub score: Option<ScoreSummary>,
    pub progress: SessionProgress,
}

/// One row of the post-session answer review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub index: usize,
    pub text: String,
    pub chosen: Option<String>,
    pub correct: String,
    pub is_correct: bool,
    pub explanation: String,
}

/// Format seconds as `m:ss`, e.g. `1500` as `25:00`.
#[must_use]
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pads_seconds() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(9), "0:09");
        assert_eq!(format_clock(61), "1:01");
        assert_eq!(format_clock(25 * 60), "25:00");
        assert_eq!(format_clock(120 * 60), "120:00");
    }
}
