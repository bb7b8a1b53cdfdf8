use std::sync::Arc;

use tracing::{info, warn};

use flash_core::model::{CategoryId, SessionSummary};
use storage::StorageError;
use storage::repository::{FlashcardRepository, SessionSummaryRepository};

use super::service::{ExitConfirmation, PracticeSession, SessionState};
use crate::Clock;
use crate::error::PracticeError;

/// Result of advancing a session through the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeAdvance {
    pub state: SessionState,
    /// Present once the session completed.
    pub summary: Option<SessionSummary>,
    /// Whether the completion report reached the backend.
    pub reported: bool,
}

/// Orchestrates pool fetching, session start and completion reporting.
#[derive(Clone)]
pub struct PracticeLoopService {
    clock: Clock,
    flashcards: Arc<dyn FlashcardRepository>,
    summaries: Arc<dyn SessionSummaryRepository>,
    seed: Option<u64>,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        flashcards: Arc<dyn FlashcardRepository>,
        summaries: Arc<dyn SessionSummaryRepository>,
    ) -> Self {
        Self {
            clock,
            flashcards,
            summaries,
            seed: None,
        }
    }

    /// Use a fixed seed for every session started by this service.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Fetch the category's flashcards and start a session over them.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Storage` if the pool cannot be fetched and
    /// `PracticeError::Session` with `SessionError::EmptyPool` if it is empty.
    pub async fn start_session(
        &self,
        category_id: &CategoryId,
    ) -> Result<PracticeSession, PracticeError> {
        let pool = self.flashcards.list_by_category(category_id).await?;
        let now = self.clock.now();
        let session = match self.seed {
            Some(seed) => PracticeSession::start_seeded(category_id.clone(), pool, now, seed)?,
            None => PracticeSession::start(category_id.clone(), pool, now)?,
        };
        info!(
            category_id = %category_id,
            cards = session.total_cards(),
            "practice session started"
        );
        Ok(session)
    }

    /// Advance the session and report it once it completes.
    ///
    /// A failed report is logged and reflected in `PracticeAdvance::reported`;
    /// it never fails the advance.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Session` if the engine rejects the advance.
    pub async fn advance(
        &self,
        session: &mut PracticeSession,
    ) -> Result<PracticeAdvance, PracticeError> {
        let state = session.advance(self.clock.now())?;
        if state != SessionState::Completed {
            return Ok(PracticeAdvance {
                state,
                summary: None,
                reported: false,
            });
        }

        let summary = session.summary().cloned();
        let reported = match &summary {
            Some(summary) => {
                info!(
                    category_id = %summary.category_id(),
                    correct = summary.correct_answers(),
                    total = summary.total_cards(),
                    percentage = summary.score_percentage(),
                    duration_secs = summary.duration_secs(),
                    "practice session completed"
                );
                self.report_completion(summary).await.is_ok()
            }
            None => false,
        };

        Ok(PracticeAdvance {
            state,
            summary,
            reported,
        })
    }

    /// Send a completed session to the backend.
    ///
    /// # Errors
    ///
    /// Returns the `StorageError` from the repository after logging it.
    pub async fn report_completion(&self, summary: &SessionSummary) -> Result<(), StorageError> {
        self.summaries
            .append_summary(summary)
            .await
            .inspect_err(|err| warn!(error = %err, "failed to report practice session"))
    }

    /// Abandon the session without reporting.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Session` if the exit is not confirmed or the
    /// session is already over.
    pub fn exit_session(
        &self,
        session: &mut PracticeSession,
        confirmation: ExitConfirmation,
    ) -> Result<(), PracticeError> {
        let answered = session.score().total;
        session.exit(confirmation)?;
        info!(
            category_id = %session.category_id(),
            answered,
            "practice session abandoned"
        );
        Ok(())
    }
}
