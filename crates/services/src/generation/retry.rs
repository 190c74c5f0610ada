use std::sync::Arc;
use std::time::Duration;

use quiz_core::Clock;
use quiz_core::model::Question;
use tracing::{info, warn};

use super::{GenerationRequest, QuestionGenerator, validate_batch};
use crate::error::GenerationError;

/// Attempt count and backoff schedule for generation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// At least one attempt is always made.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after failed attempt number `attempt` (1-based), doubling
    /// from the initial delay.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }

    /// Every sleep the policy can perform, in order.
    #[must_use]
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|n| self.delay_after(n)).collect()
    }
}

/// Wraps a `QuestionGenerator` with bounded retry-with-backoff and batch
/// validation.
#[derive(Clone)]
pub struct RetryingGenerator {
    inner: Arc<dyn QuestionGenerator>,
    policy: RetryPolicy,
    clock: Clock,
}

impl RetryingGenerator {
    #[must_use]
    pub fn new(inner: Arc<dyn QuestionGenerator>) -> Self {
        Self {
            inner,
            policy: RetryPolicy::default(),
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Generate and validate exactly `request.count()` questions.
    ///
    /// Retryable failures are retried until the policy's attempts run out;
    /// the last error is then returned. Schema violations are returned
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns the `GenerationError` of the final failed attempt, or the first
    /// non-retryable one.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<Question>, GenerationError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            let outcome = match self.inner.generate(request).await {
                Ok(drafts) => validate_batch(drafts, request, self.clock.now()),
                Err(err) => Err(err),
            };

            let err = match outcome {
                Ok(questions) => {
                    if attempt > 1 {
                        info!(topic = %request.topic(), attempt, "generation succeeded after retry");
                    }
                    return Ok(questions);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                warn!(topic = %request.topic(), attempt, error = %err, "generation failed, not retrying");
                return Err(err);
            }
            if attempt >= max_attempts {
                warn!(topic = %request.topic(), attempt, error = %err, "generation failed on final attempt");
                return Err(err);
            }

            let delay = self.policy.delay_after(attempt);
            warn!(
                topic = %request.topic(),
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "generation attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::model::{Difficulty, QuestionDraft, Topic};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Scripted {
        replies: Mutex<VecDeque<Result<Vec<QuestionDraft>, GenerationError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(replies: Vec<Result<Vec<QuestionDraft>, GenerationError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuestionGenerator for Scripted {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Vec<QuestionDraft>, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Transport("script exhausted".into())))
        }
    }

    fn drafts(n: usize) -> Vec<QuestionDraft> {
        (0..n)
            .map(|i| QuestionDraft {
                question: format!("q{i}"),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer_index: 1,
                explanation: "b".into(),
            })
            .collect()
    }

    fn request(count: u32) -> GenerationRequest {
        GenerationRequest::new(Topic::parse("Economics").unwrap(), count, Difficulty::Hard)
            .unwrap()
    }

    fn transport() -> Result<Vec<QuestionDraft>, GenerationError> {
        Err(GenerationError::Transport("connection reset".into()))
    }

    #[test]
    fn default_schedule_doubles_from_one_second() {
        let secs: Vec<u64> = RetryPolicy::default()
            .schedule()
            .iter()
            .map(Duration::as_secs)
            .collect();
        assert_eq!(secs, vec![1, 2, 4, 8]);
        assert_eq!(RetryPolicy::default().delay_after(5), Duration::from_secs(16));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_fifth_attempt() {
        let script = Scripted::new(vec![
            transport(),
            Err(GenerationError::Service {
                status: 503,
                message: "overloaded".into(),
            }),
            Err(GenerationError::Parse("missing candidate text".into())),
            transport(),
            Ok(drafts(3)),
        ]);
        let generator = RetryingGenerator::new(script.clone());
        let started = tokio::time::Instant::now();

        let questions = generator.generate(&request(3)).await.unwrap();

        assert_eq!(questions.len(), 3);
        assert_eq!(script.calls(), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn five_failures_surface_the_last_error() {
        let mut replies: Vec<_> = (0..4).map(|_| transport()).collect();
        replies.push(Err(GenerationError::Service {
            status: 500,
            message: "last".into(),
        }));
        let script = Scripted::new(replies);
        let generator = RetryingGenerator::new(script.clone());
        let started = tokio::time::Instant::now();

        let err = generator.generate(&request(3)).await.unwrap_err();

        assert_eq!(
            err,
            GenerationError::Service {
                status: 500,
                message: "last".into()
            }
        );
        assert_eq!(script.calls(), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn schema_errors_are_not_retried() {
        let script = Scripted::new(vec![Ok(drafts(2)), Ok(drafts(3))]);
        let generator = RetryingGenerator::new(script.clone());

        let err = generator.generate(&request(3)).await.unwrap_err();

        assert!(matches!(err, GenerationError::Schema(_)));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_policy_limits_attempts() {
        let script = Scripted::new(vec![transport(), transport(), Ok(drafts(1))]);
        let generator = RetryingGenerator::new(script.clone())
            .with_policy(RetryPolicy::new(2, Duration::from_millis(10)));

        let err = generator.generate(&request(1)).await.unwrap_err();

        assert!(matches!(err, GenerationError::Transport(_)));
        assert_eq!(script.calls(), 2);
    }
}
