use std::sync::Arc;

use quiz_core::model::Identity;
use storage::repository::{HistoryRepository, ResultRow};

use crate::error::PersistenceError;
use crate::scoring::AnonymousPolicy;

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Reads a user's past results from wherever they were written.
///
/// Signed-in users read their own rows from the remote history. Anonymous
/// users read wherever `AnonymousPolicy` sends their results; the local
/// store only ever holds this process's results.
#[derive(Clone)]
pub struct HistoryService {
    remote: Arc<dyn HistoryRepository>,
    local: Arc<dyn HistoryRepository>,
    policy: AnonymousPolicy,
}

impl HistoryService {
    #[must_use]
    pub fn new(remote: Arc<dyn HistoryRepository>, local: Arc<dyn HistoryRepository>) -> Self {
        Self {
            remote,
            local,
            policy: AnonymousPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AnonymousPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Most recent results for `identity`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the history cannot be read.
    pub async fn recent(
        &self,
        identity: &Identity,
        limit: u32,
    ) -> Result<Vec<ResultRow>, PersistenceError> {
        let rows = match (identity.owner_id(), self.policy) {
            (Some(owner), _) => self.remote.recent_results(Some(owner), limit).await?,
            (None, AnonymousPolicy::Remote) => self.remote.recent_results(None, limit).await?,
            (None, AnonymousPolicy::LocalOnly) => self.local.recent_results(None, limit).await?,
        };
        Ok(rows)
    }
}
