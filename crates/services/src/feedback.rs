use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{Feedback, Identity};
use storage::repository::FeedbackRepository;
use tracing::info;

use crate::error::FeedbackServiceError;

#[derive(Clone)]
pub struct FeedbackService {
    repo: Arc<dyn FeedbackRepository>,
    clock: Clock,
}

impl FeedbackService {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn FeedbackRepository>) -> Self {
        Self { repo, clock }
    }

    /// Validate and store a feedback message from `identity`.
    ///
    /// # Errors
    ///
    /// Returns `FeedbackServiceError::Feedback` for a blank or oversized
    /// message, or `FeedbackServiceError::Storage` if it cannot be stored.
    pub async fn submit(
        &self,
        identity: &Identity,
        text: &str,
    ) -> Result<i64, FeedbackServiceError> {
        let feedback = Feedback::new(text, identity.owner_id().cloned(), self.clock.now())?;
        let id = self.repo.append_feedback(&feedback).await?;
        info!(feedback_id = id, author = identity.label(), "feedback received");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `FeedbackServiceError::Storage` if the read fails.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Feedback>, FeedbackServiceError> {
        Ok(self.repo.recent_feedback(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{FeedbackError, OwnerId};
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn stores_trimmed_feedback_with_author() {
        let service = FeedbackService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        let owner = OwnerId::new("writer").unwrap();
        service
            .submit(&Identity::signed_in(owner.clone()), "  more law topics  ")
            .await
            .unwrap();

        let recent = service.recent(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].text(), "more law topics");
        assert_eq!(recent[0].author(), Some(&owner));
    }

    #[tokio::test]
    async fn blank_feedback_is_rejected() {
        let service = FeedbackService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        let err = service.submit(&Identity::Anonymous, "   ").await.unwrap_err();
        assert!(matches!(
            err,
            FeedbackServiceError::Feedback(FeedbackError::Empty)
        ));
        assert!(service.recent(5).await.unwrap().is_empty());
    }
}
