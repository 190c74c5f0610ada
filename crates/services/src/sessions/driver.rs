use std::sync::{Arc, Weak};
use std::time::Duration;

use quiz_core::Clock;
use quiz_core::model::{Identity, ResultRecord, ScoreSummary, SessionConfigDraft, SessionId};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::machine::{Advance, AnswerOutcome, Phase, QuizSession, TickOutcome};
use super::view::{ReviewItem, SessionView};
use crate::error::{SessionError, SourcingError};
use crate::resolver::QuestionSourceResolver;
use crate::scoring::{RecordOutcome, ResultService};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Handle to the one-second countdown task. Dropping it cancels the task.
struct TickFeed(Option<JoinHandle<()>>);

impl TickFeed {
    fn is_running(&self) -> bool {
        self.0.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Release the handle without cancelling, for use by the task itself.
    fn detach(mut self) {
        self.0.take();
    }
}

impl Drop for TickFeed {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

struct DriverState {
    session: QuizSession,
    tick_feed: Option<TickFeed>,
}

impl DriverState {
    fn stop_tick_feed(&mut self) {
        self.tick_feed = None;
    }
}

/// Drives a `QuizSession` from async events.
///
/// All transitions (user input, ticks, sourcing completion) go through one
/// lock, so no two are ever applied at once. The tick feed is cancelled on
/// every exit from `Active`, and persistence runs after the lock is released.
#[derive(Clone)]
pub struct SessionDriver {
    state: Arc<Mutex<DriverState>>,
    resolver: QuestionSourceResolver,
    results: ResultService,
    identity: Identity,
    clock: Clock,
}

impl SessionDriver {
    #[must_use]
    pub fn new(resolver: QuestionSourceResolver, results: ResultService, identity: Identity) -> Self {
        Self {
            state: Arc::new(Mutex::new(DriverState {
                session: QuizSession::default(),
                tick_feed: None,
            })),
            resolver,
            results,
            identity,
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub async fn view(&self) -> SessionView {
        self.state.lock().await.session.view()
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.session.phase()
    }

    pub async fn draft(&self) -> SessionConfigDraft {
        self.state.lock().await.session.draft().clone()
    }

    pub async fn last_error(&self) -> Option<SourcingError> {
        self.state.lock().await.session.last_error().cloned()
    }

    pub async fn review(&self) -> Vec<ReviewItem> {
        self.state.lock().await.session.review()
    }

    /// The result record of the finished session, for report export.
    pub async fn result_preview(&self) -> Option<ResultRecord> {
        self.state
            .lock()
            .await
            .session
            .result_record(self.identity.owner_id().cloned())
    }

    /// Whether a countdown task is currently alive.
    pub async fn is_ticking(&self) -> bool {
        self.state
            .lock()
            .await
            .tick_feed
            .as_ref()
            .is_some_and(TickFeed::is_running)
    }

    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `Landing`.
    pub async fn update_draft(&self, draft: SessionConfigDraft) -> Result<(), SessionError> {
        self.state.lock().await.session.set_draft(draft)
    }

    /// Validate the draft, source questions, and enter `Active`.
    ///
    /// Sourcing failures are not errors of this call: the session returns to
    /// `Landing` and the view carries the message, ready for a retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the draft is invalid or the session is not
    /// in `Landing`.
    pub async fn start(&self) -> Result<SessionView, SessionError> {
        let (id, config) = self.state.lock().await.session.start()?;
        info!(
            session_id = %id,
            topic = %config.topic(),
            source_mode = %config.source_mode(),
            phase = %Phase::Sourcing,
            "sourcing questions"
        );

        let sourced = self.resolver.resolve(&config).await;

        let mut state = self.state.lock().await;
        let applied = match sourced {
            Ok(batch) => {
                let (questions, _publish) = batch.into_parts();
                state.session.sourcing_succeeded(id, questions)
            }
            Err(err) => {
                warn!(
                    session_id = %id,
                    topic = %config.topic(),
                    source_mode = %config.source_mode(),
                    phase = %Phase::Sourcing,
                    error = %err,
                    "sourcing failed"
                );
                state.session.sourcing_failed(id, err)
            }
        };

        match applied {
            Ok(()) => {}
            Err(SessionError::StaleSession) => {
                debug!(session_id = %id, "discarding sourcing result for a reset session");
                return Ok(state.session.view());
            }
            Err(err @ SessionError::Precondition(_)) => {
                warn!(session_id = %id, error = %err, "sourced batch rejected");
                return Ok(state.session.view());
            }
            Err(err) => return Err(err),
        }

        if state.session.phase() == Phase::Active && state.session.remaining_secs().is_some() {
            state.tick_feed = Some(self.spawn_tick_feed(id));
        }
        Ok(state.session.view())
    }

    /// # Errors
    ///
    /// Propagates the state machine's refusal.
    pub async fn select_option(&self, choice: u8) -> Result<AnswerOutcome, SessionError> {
        self.state.lock().await.session.select_option(choice)
    }

    /// # Errors
    ///
    /// Propagates the state machine's refusal.
    pub async fn retreat(&self) -> Result<usize, SessionError> {
        self.state.lock().await.session.retreat()
    }

    /// Next question, or finish and persist on the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `Active`.
    pub async fn advance(&self) -> Result<Advance, SessionError> {
        let (advance, record) = {
            let mut state = self.state.lock().await;
            let advance = state.session.advance(self.clock.now())?;
            let record = match advance {
                Advance::Finished(_) => self.close(&mut state),
                Advance::Moved { .. } => None,
            };
            (advance, record)
        };
        self.persist(record).await;
        Ok(advance)
    }

    /// Finish now and persist.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `Active`.
    pub async fn end_early(&self) -> Result<ScoreSummary, SessionError> {
        let (summary, record) = {
            let mut state = self.state.lock().await;
            let summary = state.session.end_early(self.clock.now())?;
            (summary, self.close(&mut state))
        };
        self.persist(record).await;
        Ok(summary)
    }

    /// Leave the current session without scoring it.
    pub async fn abort(&self) {
        let mut state = self.state.lock().await;
        let phase = state.session.phase();
        if matches!(phase, Phase::Sourcing | Phase::Active) {
            info!(session_id = %state.session.id(), %phase, "session aborted");
        }
        state.stop_tick_feed();
        state.session.reset();
    }

    /// Discard the session (in any phase) and return to `Landing` with the draft kept.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.stop_tick_feed();
        state.session.reset();
    }

    /// Cancel the feed and take the one-shot record. Call with the lock held.
    fn close(&self, state: &mut DriverState) -> Option<ResultRecord> {
        state.stop_tick_feed();
        state
            .session
            .take_result_record(self.identity.owner_id().cloned())
    }

    async fn persist(&self, record: Option<ResultRecord>) {
        persist_with(&self.results, record).await;
    }

    /// The task only holds a weak reference to the state, so dropping the
    /// last driver handle drops the `TickFeed` and cancels it.
    fn spawn_tick_feed(&self, id: SessionId) -> TickFeed {
        let weak: Weak<Mutex<DriverState>> = Arc::downgrade(&self.state);
        let results = self.results.clone();
        let owner = self.identity.owner_id().cloned();
        let clock = self.clock;

        TickFeed(Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let Some(state) = weak.upgrade() else {
                    debug!(session_id = %id, "driver dropped, countdown stopped");
                    break;
                };
                let record = {
                    let mut state = state.lock().await;
                    if state.session.id() != id {
                        break;
                    }
                    match state.session.tick(clock.now()) {
                        Ok(TickOutcome::Running { .. }) => continue,
                        Ok(TickOutcome::Ignored) => break,
                        Ok(TickOutcome::Expired(summary)) => {
                            info!(session_id = %id, score = summary.score(), "time expired");
                            if let Some(feed) = state.tick_feed.take() {
                                feed.detach();
                            }
                            state.session.take_result_record(owner.clone())
                        }
                        Err(err) => {
                            warn!(session_id = %id, error = %err, "countdown stopped");
                            break;
                        }
                    }
                };
                drop(state);

                persist_with(&results, record).await;
                break;
            }
        })))
    }
}

async fn persist_with(results: &ResultService, record: Option<ResultRecord>) {
    if let Some(record) = record {
        let outcome = results.record(record).await;
        if let RecordOutcome::Failed { reason } = outcome {
            debug!(%reason, "result not persisted");
        }
    }
}
