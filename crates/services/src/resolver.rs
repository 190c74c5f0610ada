use std::sync::Arc;

use quiz_core::model::{Question, SessionConfig, SourceMode};
use rand::seq::SliceRandom;
use storage::repository::QuestionPoolRepository;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::SourcingError;
use crate::generation::{GenerationRequest, RetryingGenerator};
use crate::pool_writer::SharedPoolWriter;

/// A fixed-size, origin-tagged batch ready to start a session.
#[derive(Debug)]
pub struct SourcedBatch {
    questions: Vec<Question>,
    publish: Option<JoinHandle<()>>,
}

impl SourcedBatch {
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Split into the questions and the background publish task, if one was started.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Question>, Option<JoinHandle<()>>) {
        (self.questions, self.publish)
    }
}

/// Decides where a session's questions come from and guarantees the batch
/// has exactly the configured size.
#[derive(Clone)]
pub struct QuestionSourceResolver {
    generator: RetryingGenerator,
    pool: Arc<dyn QuestionPoolRepository>,
    writer: SharedPoolWriter,
}

impl QuestionSourceResolver {
    #[must_use]
    pub fn new(generator: RetryingGenerator, pool: Arc<dyn QuestionPoolRepository>) -> Self {
        let writer = SharedPoolWriter::new(Arc::clone(&pool));
        Self {
            generator,
            pool,
            writer,
        }
    }

    /// Source `config.question_count()` questions.
    ///
    /// Pool sessions sample uniformly without replacement and fail when the
    /// pool is short; they never fall back to generation. Generated batches
    /// are handed to the shared-pool writer without waiting for the write.
    ///
    /// # Errors
    ///
    /// Returns `SourcingError::EmptyPool` when the pool cannot cover the
    /// request, or the generation/storage failure that stopped sourcing.
    pub async fn resolve(&self, config: &SessionConfig) -> Result<SourcedBatch, SourcingError> {
        let batch = match config.source_mode() {
            SourceMode::Pool => SourcedBatch {
                questions: self.sample_pool(config).await?,
                publish: None,
            },
            SourceMode::Ai => {
                let request = GenerationRequest::for_session(config)?;
                let questions = self.generator.generate(&request).await?;
                let publish = self.writer.publish(questions.clone());
                SourcedBatch {
                    questions,
                    publish: Some(publish),
                }
            }
        };

        if batch.questions.len() != config.expected_len() {
            return Err(SourcingError::Schema(format!(
                "expected {} questions, sourced {}",
                config.expected_len(),
                batch.questions.len()
            )));
        }

        info!(
            topic = %config.topic(),
            source_mode = %config.source_mode(),
            count = batch.questions.len(),
            "sourced question batch"
        );
        Ok(batch)
    }

    async fn sample_pool(&self, config: &SessionConfig) -> Result<Vec<Question>, SourcingError> {
        let topic = config.topic();
        let records = self.pool.list_for_topic(topic).await?;

        let mut usable: Vec<Question> = records
            .into_iter()
            .filter_map(|record| {
                let id = record.id;
                match record.into_question() {
                    Ok(question) => Some(question),
                    Err(err) => {
                        warn!(topic = %topic, ?id, error = %err, "skipping malformed pool entry");
                        None
                    }
                }
            })
            .collect();

        let requested = config.expected_len();
        if usable.len() < requested {
            return Err(SourcingError::EmptyPool {
                topic,
                available: usable.len(),
                requested,
            });
        }

        usable.shuffle(&mut rand::rng());
        usable.truncate(requested);
        Ok(usable)
    }
}
