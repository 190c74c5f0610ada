use std::sync::Arc;

use quiz_core::model::{Question, QuestionOrigin};
use storage::repository::QuestionPoolRepository;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Publishes freshly generated batches into the shared pool in the background.
///
/// Failures are logged and the batch is dropped; nothing is retried and no
/// caller is ever handed the error.
#[derive(Clone)]
pub struct SharedPoolWriter {
    pool: Arc<dyn QuestionPoolRepository>,
}

impl SharedPoolWriter {
    #[must_use]
    pub fn new(pool: Arc<dyn QuestionPoolRepository>) -> Self {
        Self { pool }
    }

    /// Spawn the write and return immediately.
    ///
    /// The handle is only useful for tests and orderly shutdown; dropping it
    /// leaves the write running.
    pub fn publish(&self, questions: Vec<Question>) -> JoinHandle<()> {
        let pool = Arc::clone(&self.pool);
        tokio::spawn(async move {
            write_batch(pool.as_ref(), questions).await;
        })
    }
}

async fn write_batch(pool: &dyn QuestionPoolRepository, questions: Vec<Question>) {
    let total = questions.len();
    let batch: Vec<Question> = questions
        .into_iter()
        .filter(|q| q.origin() == QuestionOrigin::Ai)
        .collect();
    if batch.len() < total {
        debug!(skipped = total - batch.len(), "not republishing pool questions");
    }
    let Some(topic) = batch.first().map(Question::topic) else {
        return;
    };

    match pool.append_batch(&batch).await {
        Ok(written) => info!(topic = %topic, written, "published batch to shared pool"),
        Err(err) => warn!(
            topic = %topic,
            batch = batch.len(),
            error = %err,
            "shared pool publish failed, dropping batch"
        ),
    }
}
