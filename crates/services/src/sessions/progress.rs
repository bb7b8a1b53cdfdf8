use flash_core::model::Score;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    /// Number of questions in the session.
    pub total: usize,
    /// Zero-based index of the current question; equals `total` once complete.
    pub position: usize,
    pub remaining: usize,
    pub score: Score,
    pub is_complete: bool,
}

impl SessionProgress {
    /// One-based question number for display, capped at `total`.
    #[must_use]
    pub fn question_number(&self) -> usize {
        (self.position + 1).min(self.total)
    }
}
