use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::flashcard::percentage;
use crate::model::CategoryId;
use crate::time::elapsed_secs;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("correct answers ({correct}) exceed scored answers ({total})")]
    ScoreOverflow { correct: u32, total: u32 },

    #[error("scored answers ({total}) exceed session length ({cards})")]
    TooManyAnswers { total: u32, cards: u32 },
}

/// Running tally of a practice session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
}

impl Score {
    /// Record one scored answer.
    pub fn record(&mut self, correct: bool) {
        self.total = self.total.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.total.saturating_sub(self.correct)
    }

    /// `correct / total` in whole percent; zero before any answer.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        percentage(self.correct, self.total)
    }
}

/// Aggregate report for a completed practice session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    category_id: CategoryId,
    total_cards: u32,
    score: Score,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Build a summary for a session that ran from `started_at` to `completed_at`.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError` if the time range is inverted or the score
    /// does not fit the session length.
    pub fn new(
        category_id: CategoryId,
        total_cards: u32,
        score: Score,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        if score.correct > score.total {
            return Err(SessionSummaryError::ScoreOverflow {
                correct: score.correct,
                total: score.total,
            });
        }
        if score.total > total_cards {
            return Err(SessionSummaryError::TooManyAnswers {
                total: score.total,
                cards: total_cards,
            });
        }

        Ok(Self {
            category_id,
            total_cards,
            score,
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn category_id(&self) -> &CategoryId {
        &self.category_id
    }

    #[must_use]
    pub fn total_cards(&self) -> u32 {
        self.total_cards
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.score
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.score.correct
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Session length in whole seconds.
    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        elapsed_secs(self.started_at, self.completed_at)
    }

    #[must_use]
    pub fn score_percentage(&self) -> u8 {
        self.score.percentage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn score_records_answers() {
        let mut score = Score::default();
        score.record(true);
        score.record(false);
        score.record(true);
        assert_eq!(score, Score { correct: 2, total: 3 });
        assert_eq!(score.incorrect(), 1);
        assert_eq!(score.percentage(), 67);
    }

    #[test]
    fn summary_reports_duration_and_percentage() {
        let start = fixed_now();
        let summary = SessionSummary::new(
            CategoryId::new("c1"),
            4,
            Score { correct: 3, total: 4 },
            start,
            start + Duration::milliseconds(95_400),
        )
        .unwrap();
        assert_eq!(summary.duration_secs(), 95);
        assert_eq!(summary.score_percentage(), 75);
    }

    #[test]
    fn summary_rejects_inverted_range() {
        let start = fixed_now();
        let err = SessionSummary::new(
            CategoryId::new("c1"),
            1,
            Score::default(),
            start,
            start - Duration::seconds(1),
        )
        .unwrap_err();
        assert_eq!(err, SessionSummaryError::InvalidTimeRange);
    }

    #[test]
    fn summary_rejects_inconsistent_score() {
        let now = fixed_now();
        let err = SessionSummary::new(
            CategoryId::new("c1"),
            2,
            Score { correct: 3, total: 3 },
            now,
            now,
        )
        .unwrap_err();
        assert!(matches!(err, SessionSummaryError::TooManyAnswers { .. }));
    }
}
