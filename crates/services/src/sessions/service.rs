use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::fmt;

use flash_core::model::{CategoryId, Flashcard, Score, SessionSummary};

use super::options::generate_options;
use super::progress::SessionProgress;
use crate::error::SessionError;

/// Lifecycle of a practice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for an answer to the current question.
    InProgress,
    /// Current question answered; waiting for `advance`.
    Answered,
    /// Every question answered. Terminal.
    Completed,
    /// Left early through `exit`. Terminal, no report.
    Abandoned,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Abandoned)
    }
}

/// Explicit intent required to abandon a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitConfirmation {
    Confirmed,
    Declined,
}

/// Outcome of a scored submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerVerdict {
    pub correct: bool,
    /// The headword that was expected.
    pub expected: String,
    /// Score after this submission.
    pub score: Score,
}

#[derive(Debug, Default)]
struct Question {
    options: Vec<String>,
    submitted: Option<String>,
    verdict: Option<bool>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory multiple-choice practice run over one category's flashcards.
///
/// The question order is fixed at start. Each question gets its options once,
/// when it becomes current, and accepts exactly one scored answer before the
/// session can advance.
pub struct PracticeSession {
    category_id: CategoryId,
    cards: Vec<Flashcard>,
    position: usize,
    score: Score,
    question: Question,
    state: SessionState,
    started_at: DateTime<Utc>,
    summary: Option<SessionSummary>,
    rng: StdRng,
}

impl PracticeSession {
    /// Start a session over a uniformly shuffled copy of `pool`.
    ///
    /// `started_at` should come from the services layer clock to keep time deterministic.
    ///
    /// Cards with a blank headword are left out.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyPool` if no answerable card remains.
    pub fn start(
        category_id: CategoryId,
        pool: Vec<Flashcard>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let rng = StdRng::from_rng(&mut rand::rng());
        Self::start_with_rng(category_id, pool, started_at, rng)
    }

    /// Like [`PracticeSession::start`], with reproducible shuffling and sampling.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyPool` if no answerable card remains.
    pub fn start_seeded(
        category_id: CategoryId,
        pool: Vec<Flashcard>,
        started_at: DateTime<Utc>,
        seed: u64,
    ) -> Result<Self, SessionError> {
        Self::start_with_rng(category_id, pool, started_at, StdRng::seed_from_u64(seed))
    }

    fn start_with_rng(
        category_id: CategoryId,
        mut cards: Vec<Flashcard>,
        started_at: DateTime<Utc>,
        mut rng: StdRng,
    ) -> Result<Self, SessionError> {
        // A blank headword can never be answered.
        cards.retain(|card| !card.word.trim().is_empty());
        if cards.is_empty() {
            return Err(SessionError::EmptyPool);
        }

        cards.shuffle(&mut rng);
        let options = generate_options(&cards, 0, &mut rng);

        Ok(Self {
            category_id,
            cards,
            position: 0,
            score: Score::default(),
            question: Question {
                options,
                ..Question::default()
            },
            state: SessionState::InProgress,
            started_at,
            summary: None,
            rng,
        })
    }

    #[must_use]
    pub fn category_id(&self) -> &CategoryId {
        &self.category_id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.score
    }

    /// Zero-based index of the current question.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Questions in this session. Zero once abandoned.
    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.cards.len()
    }

    /// The fixed question order.
    #[must_use]
    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total_cards(),
            position: self.position,
            remaining: self.cards.len().saturating_sub(self.position),
            score: self.score,
            is_complete: self.is_complete(),
        }
    }

    /// The card being asked, unless the session is over.
    #[must_use]
    pub fn current_card(&self) -> Option<&Flashcard> {
        if self.state.is_terminal() {
            return None;
        }
        self.cards.get(self.position)
    }

    /// Question text: the first sense of the current card's translation.
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.current_card().map(Flashcard::prompt)
    }

    /// Options for the current question; empty once the session is over.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.question.options
    }

    /// The answer submitted for the current question, if any.
    #[must_use]
    pub fn submitted_answer(&self) -> Option<&str> {
        self.question.submitted.as_deref()
    }

    /// Verdict for the current question, if answered.
    #[must_use]
    pub fn verdict(&self) -> Option<bool> {
        self.question.verdict
    }

    /// Completion report; present only once the session is `Completed`.
    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Score an answer for the current question.
    ///
    /// The comparison trims whitespace and ignores case. The session does not
    /// move on until [`PracticeSession::advance`] is called.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session is over,
    /// `SessionError::DuplicateSubmission` if the question was already answered, and
    /// `SessionError::InvalidAnswer` for a blank answer.
    pub fn submit_answer(&mut self, chosen: &str) -> Result<AnswerVerdict, SessionError> {
        match self.state {
            SessionState::Completed | SessionState::Abandoned => return Err(SessionError::Closed),
            SessionState::Answered => return Err(SessionError::DuplicateSubmission),
            SessionState::InProgress => {}
        }

        let chosen = chosen.trim();
        if chosen.is_empty() {
            return Err(SessionError::InvalidAnswer);
        }
        let card = self.cards.get(self.position).ok_or(SessionError::Closed)?;

        let correct = card.matches_word(chosen);
        let expected = card.word.trim().to_owned();

        self.score.record(correct);
        self.question.submitted = Some(chosen.to_owned());
        self.question.verdict = Some(correct);
        self.state = SessionState::Answered;

        Ok(AnswerVerdict {
            correct,
            expected,
            score: self.score,
        })
    }

    /// Move past an answered question.
    ///
    /// Returns `Completed` after the last question, with a summary timed at
    /// `now`; otherwise `InProgress` with options generated for the new question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session is over and
    /// `SessionError::QuestionNotAnswered` if the current question has no answer yet.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<SessionState, SessionError> {
        match self.state {
            SessionState::Completed | SessionState::Abandoned => return Err(SessionError::Closed),
            SessionState::InProgress => return Err(SessionError::QuestionNotAnswered),
            SessionState::Answered => {}
        }

        let next = self.position + 1;
        if next >= self.cards.len() {
            let total_cards = u32::try_from(self.cards.len()).unwrap_or(u32::MAX);
            let summary = SessionSummary::new(
                self.category_id.clone(),
                total_cards,
                self.score,
                self.started_at,
                now.max(self.started_at),
            )?;
            self.position = self.cards.len();
            self.question = Question::default();
            self.summary = Some(summary);
            self.state = SessionState::Completed;
            return Ok(self.state);
        }

        self.position = next;
        self.question = Question {
            options: generate_options(&self.cards, next, &mut self.rng),
            ..Question::default()
        };
        self.state = SessionState::InProgress;
        Ok(self.state)
    }

    /// Abandon the session, discarding its cards and score without a report.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ExitNotConfirmed` unless `confirmation` is
    /// `Confirmed`, and `SessionError::Closed` if the session is already over.
    pub fn exit(&mut self, confirmation: ExitConfirmation) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::Closed);
        }
        if confirmation != ExitConfirmation::Confirmed {
            return Err(SessionError::ExitNotConfirmed);
        }

        self.cards = Vec::new();
        self.position = 0;
        self.score = Score::default();
        self.question = Question::default();
        self.state = SessionState::Abandoned;
        Ok(())
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("category_id", &self.category_id)
            .field("cards_len", &self.cards.len())
            .field("position", &self.position)
            .field("score", &self.score)
            .field("state", &self.state)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
