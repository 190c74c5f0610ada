use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use quiz_core::model::{
    OPTION_COUNT, OwnerId, Question, ResultRecord, ScoreSummary, SessionConfig, SessionConfigDraft,
    SessionId, SessionMode,
};

use super::progress::SessionProgress;
use super::view::{QuestionView, ReviewItem, SessionView, format_clock};
use crate::error::{SessionError, SourcingError};

//
// ─── PHASES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Idle, collecting configuration.
    Landing,
    /// Waiting for the question batch.
    Sourcing,
    /// Questions loaded, one visible at a time.
    Active,
    /// Scored; answers are frozen.
    Finished,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Landing => "landing",
            Phase::Sourcing => "sourcing",
            Phase::Active => "active",
            Phase::Finished => "finished",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of choosing an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Practice: the answer is revealed and frozen.
    Revealed { correct: bool },
    /// Timed: the answer is recorded; `advanced` is false on the last question.
    Recorded { advanced: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved { index: usize },
    Finished(ScoreSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not a running timed session; nothing changed.
    Ignored,
    Running { remaining_secs: u32 },
    /// The countdown reached zero and the session finished.
    Expired(ScoreSummary),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz session as a pure state machine.
///
/// Every transition is a method taking `&mut self`, so callers serialize
/// events by owning (or locking) the session. Sourcing results carry the
/// `SessionId` they were started for and are refused once the session has
/// been reset.
#[derive(Debug, Clone)]
pub struct QuizSession {
    id: SessionId,
    draft: SessionConfigDraft,
    config: Option<SessionConfig>,
    phase: Phase,
    questions: Vec<Question>,
    current: usize,
    answers: BTreeMap<usize, u8>,
    revealed: BTreeSet<usize>,
    remaining_secs: Option<u32>,
    last_error: Option<SourcingError>,
    score: Option<ScoreSummary>,
    finished_at: Option<DateTime<Utc>>,
    result_taken: bool,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new(SessionConfigDraft::default())
    }
}

impl QuizSession {
    #[must_use]
    pub fn new(draft: SessionConfigDraft) -> Self {
        Self {
            id: SessionId::new(),
            draft,
            config: None,
            phase: Phase::Landing,
            questions: Vec::new(),
            current: 0,
            answers: BTreeMap::new(),
            revealed: BTreeSet::new(),
            remaining_secs: None,
            last_error: None,
            score: None,
            finished_at: None,
            result_taken: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn draft(&self) -> &SessionConfigDraft {
        &self.draft
    }

    #[must_use]
    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::Active | Phase::Finished => self.questions.get(self.current),
            Phase::Landing | Phase::Sourcing => None,
        }
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, u8> {
        &self.answers
    }

    #[must_use]
    pub fn is_revealed(&self, index: usize) -> bool {
        self.phase == Phase::Finished || self.revealed.contains(&index)
    }

    /// Seconds left on the countdown; `None` outside timed sessions.
    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.remaining_secs
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&SourcingError> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub fn score(&self) -> Option<ScoreSummary> {
        self.score
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let answered = self.answers.len();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: self.phase == Phase::Finished,
        }
    }

    fn require(&self, expected: Phase) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn mode(&self) -> Option<SessionMode> {
        self.config.as_ref().map(SessionConfig::mode)
    }

    // ─── Landing / Sourcing ────────────────────────────────────────────────

    /// Replace the configuration draft. Only allowed while landing.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `Landing`.
    pub fn set_draft(&mut self, draft: SessionConfigDraft) -> Result<(), SessionError> {
        self.require(Phase::Landing)?;
        self.draft = draft;
        Ok(())
    }

    /// Validate the draft and enter `Sourcing`.
    ///
    /// A fresh session id is minted for every attempt, so a result arriving
    /// for an earlier attempt is recognised as stale.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `Landing`, or
    /// `SessionError::Config` if the draft is invalid (the session stays in
    /// `Landing`).
    pub fn start(&mut self) -> Result<(SessionId, SessionConfig), SessionError> {
        self.require(Phase::Landing)?;
        let config = self.draft.validate()?;

        self.id = SessionId::new();
        self.config = Some(config.clone());
        self.last_error = None;
        self.phase = Phase::Sourcing;
        Ok((self.id, config))
    }

    /// Enter `Active` with a sourced batch.
    ///
    /// A batch of the wrong size is a precondition violation: the session
    /// returns to `Landing` with a schema error set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StaleSession` for an old id,
    /// `SessionError::WrongPhase` outside `Sourcing`, or
    /// `SessionError::Precondition` for an unusable batch.
    pub fn sourcing_succeeded(
        &mut self,
        id: SessionId,
        questions: Vec<Question>,
    ) -> Result<(), SessionError> {
        self.check_current(id)?;
        self.require(Phase::Sourcing)?;

        let expected = self.config.as_ref().map_or(0, SessionConfig::expected_len);
        if questions.is_empty() || questions.len() != expected {
            let msg = format!("expected {expected} questions, got {}", questions.len());
            self.fail_sourcing(SourcingError::Schema(msg.clone()));
            return Err(SessionError::Precondition(msg));
        }

        self.questions = questions;
        self.current = 0;
        self.answers.clear();
        self.revealed.clear();
        self.remaining_secs = self.config.as_ref().and_then(SessionConfig::time_limit_secs);
        self.phase = Phase::Active;
        Ok(())
    }

    /// Return to `Landing` with the error kept for display. The draft is kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StaleSession` for an old id or
    /// `SessionError::WrongPhase` outside `Sourcing`.
    pub fn sourcing_failed(
        &mut self,
        id: SessionId,
        error: SourcingError,
    ) -> Result<(), SessionError> {
        self.check_current(id)?;
        self.require(Phase::Sourcing)?;
        self.fail_sourcing(error);
        Ok(())
    }

    fn check_current(&self, id: SessionId) -> Result<(), SessionError> {
        if id == self.id {
            Ok(())
        } else {
            Err(SessionError::StaleSession)
        }
    }

    fn fail_sourcing(&mut self, error: SourcingError) {
        self.phase = Phase::Landing;
        self.config = None;
        self.questions.clear();
        self.last_error = Some(error);
    }

    // ─── Active ────────────────────────────────────────────────────────────

    /// Record an answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `Active`,
    /// `SessionError::OptionOutOfRange` for a bad choice, or
    /// `SessionError::AnswerLocked` for an already revealed practice question.
    pub fn select_option(&mut self, choice: u8) -> Result<AnswerOutcome, SessionError> {
        self.require(Phase::Active)?;
        if usize::from(choice) >= OPTION_COUNT {
            return Err(SessionError::OptionOutOfRange(choice));
        }
        let index = self.current;
        let correct = self
            .questions
            .get(index)
            .map(|q| q.is_correct(choice))
            .ok_or_else(|| SessionError::Precondition(format!("no question at {index}")))?;

        match self.mode() {
            Some(SessionMode::Timed) => {
                self.answers.insert(index, choice);
                let advanced = index + 1 < self.questions.len();
                if advanced {
                    self.current += 1;
                }
                Ok(AnswerOutcome::Recorded { advanced })
            }
            _ => {
                if self.revealed.contains(&index) {
                    return Err(SessionError::AnswerLocked);
                }
                self.answers.insert(index, choice);
                self.revealed.insert(index);
                Ok(AnswerOutcome::Revealed { correct })
            }
        }
    }

    /// Move to the next question, or finish when on the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `Active`.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<Advance, SessionError> {
        self.require(Phase::Active)?;
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            Ok(Advance::Moved {
                index: self.current,
            })
        } else {
            self.finish(now).map(Advance::Finished)
        }
    }

    /// Move back one question.
    ///
    /// Practice sessions refuse while the current question is revealed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase`, `SessionError::AtFirstQuestion` or
    /// `SessionError::RetreatLocked`.
    pub fn retreat(&mut self) -> Result<usize, SessionError> {
        self.require(Phase::Active)?;
        if self.current == 0 {
            return Err(SessionError::AtFirstQuestion);
        }
        if self.mode() != Some(SessionMode::Timed) && self.revealed.contains(&self.current) {
            return Err(SessionError::RetreatLocked);
        }
        self.current -= 1;
        Ok(self.current)
    }

    /// Finish immediately, scoring unanswered questions as wrong.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `Active`.
    pub fn end_early(&mut self, now: DateTime<Utc>) -> Result<ScoreSummary, SessionError> {
        self.require(Phase::Active)?;
        self.finish(now)
    }

    /// Apply one second of the countdown.
    ///
    /// Ticks outside a running timed session are ignored, so a feed that
    /// fires late cannot touch a finished or reset session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Score` if the final score cannot be computed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, SessionError> {
        if self.phase != Phase::Active {
            return Ok(TickOutcome::Ignored);
        }
        let Some(remaining) = self.remaining_secs else {
            return Ok(TickOutcome::Ignored);
        };

        let remaining = remaining.saturating_sub(1);
        self.remaining_secs = Some(remaining);
        if remaining == 0 {
            self.finish(now).map(TickOutcome::Expired)
        } else {
            Ok(TickOutcome::Running {
                remaining_secs: remaining,
            })
        }
    }

    fn finish(&mut self, now: DateTime<Utc>) -> Result<ScoreSummary, SessionError> {
        let summary = ScoreSummary::compute(&self.questions, &self.answers)?;
        self.score = Some(summary);
        self.finished_at = Some(now);
        self.phase = Phase::Finished;
        Ok(summary)
    }

    // ─── Finished / reset ──────────────────────────────────────────────────

    /// The finished session's result record, without consuming it.
    #[must_use]
    pub fn result_record(&self, owner: Option<OwnerId>) -> Option<ResultRecord> {
        if self.phase != Phase::Finished {
            return None;
        }
        match (&self.config, self.score, self.finished_at) {
            (Some(config), Some(score), Some(at)) => {
                Some(ResultRecord::new(self.id, config, score, owner, at))
            }
            _ => None,
        }
    }

    /// Hand out the result record exactly once per finished session.
    ///
    /// Later calls return `None`.
    pub fn take_result_record(&mut self, owner: Option<OwnerId>) -> Option<ResultRecord> {
        if self.result_taken {
            return None;
        }
        let record = self.result_record(owner)?;
        self.result_taken = true;
        Some(record)
    }

    /// Discard the session and return to `Landing`, keeping the draft.
    pub fn reset(&mut self) {
        let draft = std::mem::take(&mut self.draft);
        *self = Self::new(draft);
    }

    // ─── Views ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn view(&self) -> SessionView {
        let question = self.current_question().map(|q| {
            let revealed = self.is_revealed(self.current);
            QuestionView {
                index: self.current,
                text: q.text().to_owned(),
                options: q.options().clone(),
                chosen: self.answers.get(&self.current).copied(),
                revealed,
                correct_option: revealed.then(|| q.correct_option()),
                explanation: revealed.then(|| q.explanation().to_owned()),
            }
        });

        SessionView {
            session_id: self.id,
            phase: self.phase,
            topic: self.config.as_ref().map(SessionConfig::topic),
            mode: self.mode(),
            index: self.current,
            total: self.questions.len(),
            question,
            remaining_secs: self.remaining_secs,
            clock: self.remaining_secs.map(format_clock),
            last_error: self.last_error.as_ref().map(ToString::to_string),
            score: self.score,
            progress: self.progress(),
        }
    }

    /// Per-question review, available once finished.
    #[must_use]
    pub fn review(&self) -> Vec<ReviewItem> {
        if self.phase != Phase::Finished {
            return Vec::new();
        }
        self.questions
            .iter()
            .enumerate()
            .map(|(index, q)| {
                let chosen = self.answers.get(&index).copied();
                ReviewItem {
                    index,
                    text: q.text().to_owned(),
                    chosen: chosen.map(|c| q.options()[usize::from(c)].clone()),
                    correct: q.correct_option_text().to_owned(),
                    is_correct: chosen.is_some_and(|c| q.is_correct(c)),
                    explanation: q.explanation().to_owned(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionDraft, QuestionOrigin, SourceMode, Topic};
    use quiz_core::time::fixed_now;

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| {
                QuestionDraft {
                    question: format!("q{i}"),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_answer_index: 1,
                    explanation: "b wins".into(),
                }
                .validate(
                    Topic::parse("Cybersecurity").unwrap(),
                    QuestionOrigin::Ai,
                    fixed_now(),
                )
                .unwrap()
            })
            .collect()
    }

    fn draft(mode: SessionMode, count: u32) -> SessionConfigDraft {
        let mut draft = SessionConfigDraft::for_topic("Cybersecurity");
        draft.mode = mode;
        draft.question_count = count;
        draft.duration_minutes = 1;
        draft
    }

    fn active(mode: SessionMode, count: u32) -> QuizSession {
        let mut session = QuizSession::new(draft(mode, count));
        let (id, _) = session.start().unwrap();
        session
            .sourcing_succeeded(id, questions(usize::try_from(count).unwrap()))
            .unwrap();
        session
    }

    #[test]
    fn start_requires_a_topic() {
        let mut session = QuizSession::default();
        let err = session.start().unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
        assert_eq!(session.phase(), Phase::Landing);
    }

    #[test]
    fn sourcing_failure_returns_to_landing_with_draft() {
        let mut session = QuizSession::new(draft(SessionMode::Practice, 5));
        let (id, config) = session.start().unwrap();
        assert_eq!(session.phase(), Phase::Sourcing);

        session
            .sourcing_failed(
                id,
                SourcingError::EmptyPool {
                    topic: config.topic(),
                    available: 3,
                    requested: 5,
                },
            )
            .unwrap();
        assert_eq!(session.phase(), Phase::Landing);
        assert_eq!(session.draft().topic, "Cybersecurity");
        assert!(matches!(
            session.last_error(),
            Some(SourcingError::EmptyPool { .. })
        ));

        // retry with the same draft clears the error
        session.start().unwrap();
        assert!(session.last_error().is_none());
    }

    #[test]
    fn short_batch_is_a_precondition_violation() {
        let mut session = QuizSession::new(draft(SessionMode::Practice, 5));
        let (id, _) = session.start().unwrap();
        let err = session.sourcing_succeeded(id, questions(4)).unwrap_err();
        assert!(matches!(err, SessionError::Precondition(_)));
        assert_eq!(session.phase(), Phase::Landing);
        assert!(matches!(session.last_error(), Some(SourcingError::Schema(_))));

        let (id, _) = session.start().unwrap();
        let err = session.sourcing_succeeded(id, Vec::new()).unwrap_err();
        assert!(matches!(err, SessionError::Precondition(_)));
    }

    #[test]
    fn stale_sourcing_result_is_refused_after_reset() {
        let mut session = QuizSession::new(draft(SessionMode::Practice, 5));
        let (stale, _) = session.start().unwrap();
        session.reset();
        assert_eq!(session.phase(), Phase::Landing);
        assert_eq!(session.draft().topic, "Cybersecurity");

        let err = session.sourcing_succeeded(stale, questions(5)).unwrap_err();
        assert_eq!(err, SessionError::StaleSession);
        assert_eq!(session.phase(), Phase::Landing);
    }

    #[test]
    fn practice_reveals_and_freezes() {
        let mut session = active(SessionMode::Practice, 5);
        assert_eq!(
            session.select_option(1).unwrap(),
            AnswerOutcome::Revealed { correct: true }
        );
        assert_eq!(session.select_option(2).unwrap_err(), SessionError::AnswerLocked);
        assert_eq!(session.answers().get(&0), Some(&1));

        let view = session.view();
        let q = view.question.unwrap();
        assert!(q.revealed);
        assert_eq!(q.correct_option, Some(1));
        assert_eq!(q.explanation.as_deref(), Some("b wins"));
    }

    #[test]
    fn practice_retreat_is_blocked_while_revealed() {
        let mut session = active(SessionMode::Practice, 5);
        session.advance(fixed_now()).unwrap();
        session.select_option(0).unwrap();
        assert_eq!(session.retreat().unwrap_err(), SessionError::RetreatLocked);

        session.advance(fixed_now()).unwrap();
        assert_eq!(session.retreat().unwrap(), 1);
    }

    #[test]
    fn timed_answers_auto_advance_and_can_be_changed() {
        let mut session = active(SessionMode::Timed, 5);
        assert_eq!(
            session.select_option(0).unwrap(),
            AnswerOutcome::Recorded { advanced: true }
        );
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.retreat().unwrap(), 0);
        session.select_option(1).unwrap();
        assert_eq!(session.answers().get(&0), Some(&1));

        for _ in 1..4 {
            session.select_option(1).unwrap();
        }
        assert_eq!(session.current_index(), 4);
        assert_eq!(
            session.select_option(1).unwrap(),
            AnswerOutcome::Recorded { advanced: false }
        );
        assert_eq!(session.current_index(), 4);
        assert_eq!(session.phase(), Phase::Active);
    }

    #[test]
    fn retreat_from_first_question_is_refused() {
        let mut session = active(SessionMode::Timed, 5);
        assert_eq!(session.retreat().unwrap_err(), SessionError::AtFirstQuestion);
    }

    #[test]
    fn option_index_is_bounded() {
        let mut session = active(SessionMode::Practice, 5);
        assert_eq!(
            session.select_option(4).unwrap_err(),
            SessionError::OptionOutOfRange(4)
        );
    }

    #[test]
    fn advancing_past_last_question_finishes() {
        let mut session = active(SessionMode::Practice, 5);
        for _ in 0..4 {
            session.select_option(1).unwrap();
            assert!(matches!(
                session.advance(fixed_now()).unwrap(),
                Advance::Moved { .. }
            ));
        }
        session.select_option(1).unwrap();
        let Advance::Finished(summary) = session.advance(fixed_now()).unwrap() else {
            panic!("expected finish");
        };
        assert_eq!(summary.correct(), 5);
        assert_eq!(summary.score(), 100);
        assert_eq!(session.phase(), Phase::Finished);
        assert!(session.select_option(1).is_err());
        assert!(session.review().iter().all(|item| item.is_correct));
    }

    #[test]
    fn result_record_is_handed_out_once() {
        let mut session = active(SessionMode::Practice, 5);
        session.select_option(1).unwrap();
        session.end_early(fixed_now()).unwrap();

        let record = session.take_result_record(None).unwrap();
        assert_eq!(record.session_id(), session.id());
        assert_eq!(record.correct_count(), 1);
        assert_eq!(record.score(), 20);
        assert_eq!(record.source(), SourceMode::Ai);
        assert!(session.take_result_record(None).is_none());
    }

    #[test]
    fn countdown_expires_exactly_once() {
        let mut session = active(SessionMode::Timed, 5);
        assert_eq!(session.remaining_secs(), Some(60));

        for expected in (1..60).rev() {
            assert_eq!(
                session.tick(fixed_now()).unwrap(),
                TickOutcome::Running {
                    remaining_secs: expected
                }
            );
        }
        let TickOutcome::Expired(summary) = session.tick(fixed_now()).unwrap() else {
            panic!("expected expiry");
        };
        assert_eq!(summary.correct(), 0);
        assert_eq!(summary.score(), 0);

        for _ in 0..10 {
            assert_eq!(session.tick(fixed_now()).unwrap(), TickOutcome::Ignored);
        }
        assert_eq!(session.remaining_secs(), Some(0));
        assert!(session.take_result_record(None).is_some());
        assert!(session.take_result_record(None).is_none());
    }

    #[test]
    fn practice_sessions_ignore_ticks() {
        let mut session = active(SessionMode::Practice, 5);
        assert_eq!(session.tick(fixed_now()).unwrap(), TickOutcome::Ignored);
        assert_eq!(session.remaining_secs(), None);
    }

    #[test]
    fn clock_is_rendered_in_view() {
        let mut session = active(SessionMode::Timed, 5);
        session.tick(fixed_now()).unwrap();
        assert_eq!(session.view().clock.as_deref(), Some("0:59"));
    }
}
