use std::sync::Arc;

use quiz_core::model::Identity;
use storage::repository::{HistoryRepository, InMemoryRepository, Storage};
use tracing::info;

use crate::Clock;
use crate::error::AppServicesError;
use crate::feedback::FeedbackService;
use crate::generation::{GeminiClient, QuestionGenerator, RetryingGenerator};
use crate::history::HistoryService;
use crate::notice::NoticeSender;
use crate::resolver::QuestionSourceResolver;
use crate::scoring::{AnonymousPolicy, ResultService};
use crate::seeding::PoolSeedingService;
use crate::sessions::SessionDriver;

/// Assembles app-facing services over one storage backend and one generator.
///
/// Anonymous local history lives in an in-memory store owned by this value,
/// so it lasts as long as the process.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    resolver: QuestionSourceResolver,
    results: ResultService,
    history: Arc<HistoryService>,
    feedback: Arc<FeedbackService>,
    seeding: Arc<PoolSeedingService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the environment-configured
    /// generation client.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// generation settings are malformed.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        policy: AnonymousPolicy,
        notices: Option<NoticeSender>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let client = GeminiClient::from_env()?;
        if !client.enabled() {
            info!("QUIZ_AI_API_KEY not set; AI sessions and seeding are disabled");
        }
        Ok(Self::from_parts(
            storage,
            Arc::new(client),
            clock,
            policy,
            notices,
        ))
    }

    #[must_use]
    pub fn from_parts(
        storage: Storage,
        generator: Arc<dyn QuestionGenerator>,
        clock: Clock,
        policy: AnonymousPolicy,
        notices: Option<NoticeSender>,
    ) -> Self {
        let local: Arc<dyn HistoryRepository> = Arc::new(InMemoryRepository::new());
        let generator = RetryingGenerator::new(generator).with_clock(clock);

        let resolver = QuestionSourceResolver::new(generator.clone(), Arc::clone(&storage.pool));
        let mut results = ResultService::new(Arc::clone(&storage.history), Arc::clone(&local))
            .with_policy(policy);
        if let Some(notices) = notices {
            results = results.with_notices(notices);
        }
        let history =
            Arc::new(HistoryService::new(Arc::clone(&storage.history), local).with_policy(policy));
        let feedback = Arc::new(FeedbackService::new(clock, Arc::clone(&storage.feedback)));
        let seeding = Arc::new(PoolSeedingService::new(generator, storage.pool));

        Self {
            clock,
            resolver,
            results,
            history,
            feedback,
            seeding,
        }
    }

    /// A fresh session driver for `identity`, sharing this value's stores.
    #[must_use]
    pub fn session_driver(&self, identity: Identity) -> SessionDriver {
        SessionDriver::new(self.resolver.clone(), self.results.clone(), identity)
            .with_clock(self.clock)
    }

    #[must_use]
    pub fn results(&self) -> &ResultService {
        &self.results
    }

    #[must_use]
    pub fn history(&self) -> Arc<HistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn feedback(&self) -> Arc<FeedbackService> {
        Arc::clone(&self.feedback)
    }

    #[must_use]
    pub fn seeding(&self) -> Arc<PoolSeedingService> {
        Arc::clone(&self.seeding)
    }
}
