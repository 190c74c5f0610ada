use std::sync::Arc;

use quiz_core::model::{Difficulty, MAX_QUESTION_COUNT, Topic};
use storage::repository::QuestionPoolRepository;
use tracing::info;

use crate::error::SeedingError;
use crate::generation::{GenerationRequest, RetryingGenerator};

pub const DEFAULT_SEED_COUNT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub topic: Topic,
    pub requested: u32,
    pub written: usize,
}

/// Fills the shared pool for a topic ahead of time.
///
/// Unlike the session path, the pool write is awaited and its failure is
/// reported to the caller.
#[derive(Clone)]
pub struct PoolSeedingService {
    generator: RetryingGenerator,
    pool: Arc<dyn QuestionPoolRepository>,
}

impl PoolSeedingService {
    #[must_use]
    pub fn new(generator: RetryingGenerator, pool: Arc<dyn QuestionPoolRepository>) -> Self {
        Self { generator, pool }
    }

    /// # Errors
    ///
    /// Returns `SeedingError::Storage` if the count cannot be read.
    pub async fn pool_count(&self, topic: Topic) -> Result<u32, SeedingError> {
        Ok(self.pool.count_for_topic(topic).await?)
    }

    /// Generate `count` questions for `topic` and append them to the pool.
    ///
    /// # Errors
    ///
    /// Returns `SeedingError::InvalidCount` outside `1..=200`, the generation
    /// error after retries run out, or the storage error of the write.
    pub async fn seed(
        &self,
        topic: Topic,
        count: u32,
        difficulty: Difficulty,
    ) -> Result<SeedReport, SeedingError> {
        if !(1..=MAX_QUESTION_COUNT).contains(&count) {
            return Err(SeedingError::InvalidCount(count));
        }
        let request = GenerationRequest::new(topic, count, difficulty)?;
        let questions = self.generator.generate(&request).await?;
        let written = self.pool.append_batch(&questions).await?;
        info!(topic = %topic, requested = count, written, "seeded question pool");
        Ok(SeedReport {
            topic,
            requested: count,
            written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::generation::QuestionGenerator;
    use async_trait::async_trait;
    use quiz_core::model::{QuestionDraft, QuestionOrigin};
    use storage::repository::InMemoryRepository;

    struct Echo;

    #[async_trait]
    impl QuestionGenerator for Echo {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<Vec<QuestionDraft>, GenerationError> {
            Ok((0..request.count())
                .map(|i| QuestionDraft {
                    question: format!("{} seed {i}", request.topic()),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_answer_index: 0,
                    explanation: "a".into(),
                })
                .collect())
        }
    }

    fn service(pool: &InMemoryRepository) -> PoolSeedingService {
        PoolSeedingService::new(
            RetryingGenerator::new(Arc::new(Echo)),
            Arc::new(pool.clone()),
        )
    }

    #[tokio::test]
    async fn seeding_appends_ai_tagged_questions() {
        let pool = InMemoryRepository::new();
        let seeding = service(&pool);
        let topic = Topic::parse("Accounting").unwrap();

        let report = seeding.seed(topic, 12, Difficulty::Medium).await.unwrap();

        assert_eq!(report.written, 12);
        assert_eq!(seeding.pool_count(topic).await.unwrap(), 12);
        let rows = pool.list_for_topic(topic).await.unwrap();
        assert!(rows.iter().all(|r| r.origin == QuestionOrigin::Ai));
    }

    #[tokio::test]
    async fn seed_count_is_bounded() {
        let pool = InMemoryRepository::new();
        let seeding = service(&pool);
        let topic = Topic::parse("Accounting").unwrap();

        for count in [0, 201] {
            let err = seeding.seed(topic, count, Difficulty::Hard).await.unwrap_err();
            assert!(matches!(err, SeedingError::InvalidCount(c) if c == count));
        }
        assert_eq!(seeding.pool_count(topic).await.unwrap(), 0);
    }
}
