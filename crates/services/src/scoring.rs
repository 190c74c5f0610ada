use std::sync::Arc;

use quiz_core::model::ResultRecord;
use storage::repository::{HistoryRepository, StorageError};
use tracing::{debug, info, warn};

use crate::notice::{Notice, NoticeSender};

/// Where anonymous results go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnonymousPolicy {
    /// Keep anonymous results in the local, in-process store only.
    #[default]
    LocalOnly,
    /// Write anonymous results to the remote history with no owner.
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Remote,
    Local,
}

/// What happened to a result handed to `ResultService::record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Stored { id: i64, destination: Destination },
    /// The session already has a stored result.
    Duplicate,
    /// The write failed; the failure was logged and announced.
    Failed { reason: String },
}

/// Persists finished-session results on a best-effort basis.
///
/// `record` never returns an error: failures are logged and pushed to the
/// notice channel so the score stays visible regardless.
#[derive(Clone)]
pub struct ResultService {
    remote: Arc<dyn HistoryRepository>,
    local: Arc<dyn HistoryRepository>,
    policy: AnonymousPolicy,
    notices: Option<NoticeSender>,
}

impl ResultService {
    #[must_use]
    pub fn new(remote: Arc<dyn HistoryRepository>, local: Arc<dyn HistoryRepository>) -> Self {
        Self {
            remote,
            local,
            policy: AnonymousPolicy::default(),
            notices: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AnonymousPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_notices(mut self, notices: NoticeSender) -> Self {
        self.notices = Some(notices);
        self
    }

    #[must_use]
    pub fn policy(&self) -> AnonymousPolicy {
        self.policy
    }

    #[must_use]
    pub fn destination_for(&self, record: &ResultRecord) -> Destination {
        match (record.owner_id(), self.policy) {
            (Some(_), _) | (None, AnonymousPolicy::Remote) => Destination::Remote,
            (None, AnonymousPolicy::LocalOnly) => Destination::Local,
        }
    }

    pub async fn record(&self, record: ResultRecord) -> RecordOutcome {
        let destination = self.destination_for(&record);
        let repo = match destination {
            Destination::Remote => &self.remote,
            Destination::Local => &self.local,
        };

        match repo.append_result(&record).await {
            Ok(id) => {
                info!(
                    session_id = %record.session_id(),
                    topic = %record.topic(),
                    score = record.score(),
                    ?destination,
                    "stored session result"
                );
                if destination == Destination::Local {
                    self.notify(Notice::info(
                        "History saves locally. Sign in to keep your results.",
                    ));
                }
                RecordOutcome::Stored { id, destination }
            }
            Err(StorageError::Conflict) => {
                debug!(session_id = %record.session_id(), "result already stored");
                RecordOutcome::Duplicate
            }
            Err(err) => {
                warn!(
                    session_id = %record.session_id(),
                    topic = %record.topic(),
                    phase = "finished",
                    ?destination,
                    error = %err,
                    "failed to persist session result"
                );
                self.notify(Notice::error(format!(
                    "Your score was not saved: {err}"
                )));
                RecordOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn notify(&self, notice: Notice) {
        if let Some(tx) = &self.notices {
            if tx.send(notice).is_err() {
                debug!("notice receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::{NoticeLevel, notice_channel};
    use async_trait::async_trait;
    use quiz_core::model::{OwnerId, ScoreSummary, SessionConfigDraft, SessionId};
    use quiz_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, ResultRow};

    struct Failing;

    #[async_trait]
    impl HistoryRepository for Failing {
        async fn append_result(&self, _record: &ResultRecord) -> Result<i64, StorageError> {
            Err(StorageError::Connection("disk full".into()))
        }

        async fn recent_results(
            &self,
            _owner: Option<&OwnerId>,
            _limit: u32,
        ) -> Result<Vec<ResultRow>, StorageError> {
            Ok(Vec::new())
        }
    }

    fn record(owner: Option<&str>) -> ResultRecord {
        let config = SessionConfigDraft::for_topic("Accounting").validate().unwrap();
        ResultRecord::new(
            SessionId::new(),
            &config,
            ScoreSummary::from_counts(1, 5).unwrap(),
            owner.map(|o| OwnerId::new(o).unwrap()),
            fixed_now(),
        )
    }

    #[tokio::test]
    async fn signed_in_results_go_remote() {
        let remote = InMemoryRepository::new();
        let local = InMemoryRepository::new();
        let svc = ResultService::new(Arc::new(remote.clone()), Arc::new(local.clone()));

        let outcome = svc.record(record(Some("u1"))).await;
        assert!(matches!(
            outcome,
            RecordOutcome::Stored {
                destination: Destination::Remote,
                ..
            }
        ));
        let owner = OwnerId::new("u1").unwrap();
        assert_eq!(remote.recent_results(Some(&owner), 20).await.unwrap().len(), 1);
        assert!(local.recent_results(None, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn anonymous_results_stay_local_by_default() {
        let remote = InMemoryRepository::new();
        let local = InMemoryRepository::new();
        let (tx, mut rx) = notice_channel();
        let svc = ResultService::new(Arc::new(remote.clone()), Arc::new(local.clone()))
            .with_notices(tx);

        let outcome = svc.record(record(None)).await;
        assert!(matches!(
            outcome,
            RecordOutcome::Stored {
                destination: Destination::Local,
                ..
            }
        ));
        assert!(remote.recent_results(None, 20).await.unwrap().is_empty());
        assert_eq!(local.recent_results(None, 20).await.unwrap().len(), 1);
        assert_eq!(rx.try_recv().unwrap().level, NoticeLevel::Info);
    }

    #[tokio::test]
    async fn remote_policy_writes_anonymous_results_without_owner() {
        let remote = InMemoryRepository::new();
        let svc = ResultService::new(Arc::new(remote.clone()), Arc::new(InMemoryRepository::new()))
            .with_policy(AnonymousPolicy::Remote);

        svc.record(record(None)).await;
        let rows = remote.recent_results(None, 20).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].record.owner_id().is_none());
    }

    #[tokio::test]
    async fn second_write_of_same_session_is_a_duplicate() {
        let remote = InMemoryRepository::new();
        let svc = ResultService::new(Arc::new(remote.clone()), Arc::new(InMemoryRepository::new()));
        let rec = record(Some("u1"));

        svc.record(rec.clone()).await;
        assert_eq!(svc.record(rec).await, RecordOutcome::Duplicate);
    }

    #[tokio::test]
    async fn failures_are_reported_not_raised() {
        let (tx, mut rx) = notice_channel();
        let svc = ResultService::new(Arc::new(Failing), Arc::new(Failing)).with_notices(tx);

        let outcome = svc.record(record(Some("u1"))).await;
        assert!(matches!(outcome, RecordOutcome::Failed { .. }));
        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("disk full"));
    }
}
