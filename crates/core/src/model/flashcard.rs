use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{CategoryId, FlashcardId};

/// Separator between alternative senses inside a translation.
pub const SENSE_SEPARATOR: char = ';';

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlashcardError {
    #[error("word cannot be empty")]
    EmptyWord,

    #[error("translation cannot be empty")]
    EmptyTranslation,

    #[error("times_correct ({correct}) exceeds times_practiced ({practiced})")]
    InvalidCounters { practiced: u32, correct: u32 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown difficulty: {0}")]
pub struct ParseDifficultyError(pub String);

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty label attached to a flashcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(ParseDifficultyError(s.to_owned())),
        }
    }
}

/// Learner level passed to the AI generator to tune vocabulary and examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnglishLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

//
// ─── FLASHCARD ─────────────────────────────────────────────────────────────────
//

/// A learnable unit: an English headword with its translation and hints.
///
/// Practice counters belong to the backend; client code treats them as
/// read-only snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    pub id: FlashcardId,
    pub category_id: CategoryId,
    pub word: String,
    pub translation: String,
    pub example: String,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub times_practiced: u32,
    pub times_correct: u32,
    pub last_practiced: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Flashcard {
    /// All non-empty senses of the translation, in order.
    pub fn senses(&self) -> impl Iterator<Item = &str> {
        self.translation
            .split(SENSE_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The first sense of the translation, used as the quiz prompt.
    #[must_use]
    pub fn prompt(&self) -> &str {
        self.senses().next().unwrap_or("")
    }

    /// Optional short hint: the explanation, if the card has one.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        let hint = self.explanation.trim();
        (!hint.is_empty()).then_some(hint)
    }

    /// Whether `answer` names this card's headword, ignoring case and
    /// surrounding whitespace.
    #[must_use]
    pub fn matches_word(&self, answer: &str) -> bool {
        normalize_answer(answer) == normalize_answer(&self.word)
    }

    /// Share of practice attempts answered correctly, in percent.
    #[must_use]
    pub fn accuracy_percent(&self) -> u8 {
        percentage(self.times_correct, self.times_practiced)
    }

    /// Checks the backend-owned counters are consistent.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError::InvalidCounters` if more correct answers than
    /// attempts are recorded.
    pub fn check_counters(&self) -> Result<(), FlashcardError> {
        if self.times_correct > self.times_practiced {
            return Err(FlashcardError::InvalidCounters {
                practiced: self.times_practiced,
                correct: self.times_correct,
            });
        }
        Ok(())
    }
}

/// Canonical form used when comparing answers.
#[must_use]
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// `part / whole` rounded to the nearest whole percent; zero when `whole` is zero.
#[must_use]
pub fn percentage(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = (u64::from(part) * 100 + u64::from(whole) / 2) / u64::from(whole);
    u8::try_from(pct.min(100)).unwrap_or(100)
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

/// User input for a new flashcard, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardDraft {
    pub category_id: CategoryId,
    pub word: String,
    pub translation: String,
    pub example: String,
    pub explanation: String,
    pub difficulty: Difficulty,
}

impl FlashcardDraft {
    #[must_use]
    pub fn new(
        category_id: CategoryId,
        word: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        Self {
            category_id,
            word: word.into(),
            translation: translation.into(),
            example: String::new(),
            explanation: String::new(),
            difficulty: Difficulty::default(),
        }
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = example.into();
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// Trim and validate the draft.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError::EmptyWord` or `FlashcardError::EmptyTranslation`
    /// when the required fields are blank.
    pub fn validate(self) -> Result<NewFlashcard, FlashcardError> {
        let word = self.word.trim().to_owned();
        if word.is_empty() {
            return Err(FlashcardError::EmptyWord);
        }
        let translation = self.translation.trim().to_owned();
        if translation.is_empty() {
            return Err(FlashcardError::EmptyTranslation);
        }

        Ok(NewFlashcard {
            category_id: self.category_id,
            word,
            translation,
            example: self.example.trim().to_owned(),
            explanation: self.explanation.trim().to_owned(),
            difficulty: self.difficulty,
        })
    }
}

/// A validated flashcard that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFlashcard {
    pub category_id: CategoryId,
    pub word: String,
    pub translation: String,
    pub example: String,
    pub explanation: String,
    pub difficulty: Difficulty,
}

impl NewFlashcard {
    #[must_use]
    pub fn assign_id(self, id: FlashcardId, created_at: DateTime<Utc>) -> Flashcard {
        Flashcard {
            id,
            category_id: self.category_id,
            word: self.word,
            translation: self.translation,
            example: self.example,
            explanation: self.explanation,
            difficulty: self.difficulty,
            times_practiced: 0,
            times_correct: 0,
            last_practiced: None,
            created_at: Some(created_at),
        }
    }
}

/// Partial update for an existing flashcard. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashcardPatch {
    pub category_id: Option<CategoryId>,
    pub word: Option<String>,
    pub translation: Option<String>,
    pub example: Option<String>,
    pub explanation: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl FlashcardPatch {
    /// Apply the patch to a copy of `card`.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError` if the patch blanks out a required field.
    pub fn apply(&self, card: &Flashcard) -> Result<Flashcard, FlashcardError> {
        let mut updated = card.clone();
        if let Some(word) = &self.word {
            let word = word.trim();
            if word.is_empty() {
                return Err(FlashcardError::EmptyWord);
            }
            word.clone_into(&mut updated.word);
        }
        if let Some(translation) = &self.translation {
            let translation = translation.trim();
            if translation.is_empty() {
                return Err(FlashcardError::EmptyTranslation);
            }
            translation.clone_into(&mut updated.translation);
        }
        if let Some(category_id) = &self.category_id {
            updated.category_id = category_id.clone();
        }
        if let Some(example) = &self.example {
            example.trim().clone_into(&mut updated.example);
        }
        if let Some(explanation) = &self.explanation {
            explanation.trim().clone_into(&mut updated.explanation);
        }
        if let Some(difficulty) = self.difficulty {
            updated.difficulty = difficulty;
        }
        Ok(updated)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn card(word: &str, translation: &str) -> Flashcard {
        FlashcardDraft::new(CategoryId::new("c1"), word, translation)
            .validate()
            .unwrap()
            .assign_id(FlashcardId::new("f1"), fixed_now())
    }

    #[test]
    fn prompt_uses_first_sense_only() {
        let card = card("happy", " vui vẻ ; hạnh phúc;");
        assert_eq!(card.prompt(), "vui vẻ");
        assert_eq!(card.senses().collect::<Vec<_>>(), vec!["vui vẻ", "hạnh phúc"]);
    }

    #[test]
    fn prompt_skips_leading_empty_sense() {
        let card = card("calm", ";bình tĩnh");
        assert_eq!(card.prompt(), "bình tĩnh");
    }

    #[test]
    fn matches_word_ignores_case_and_whitespace() {
        let card = card("happy", "vui");
        assert!(card.matches_word("  Happy "));
        assert!(!card.matches_word("happier"));
    }

    #[test]
    fn draft_requires_word_and_translation() {
        let err = FlashcardDraft::new(CategoryId::new("c"), "  ", "x")
            .validate()
            .unwrap_err();
        assert_eq!(err, FlashcardError::EmptyWord);

        let err = FlashcardDraft::new(CategoryId::new("c"), "w", "\t")
            .validate()
            .unwrap_err();
        assert_eq!(err, FlashcardError::EmptyTranslation);
    }

    #[test]
    fn new_flashcard_starts_unpracticed() {
        let card = card("sad", "buồn");
        assert_eq!(card.difficulty, Difficulty::Medium);
        assert_eq!(card.times_practiced, 0);
        assert_eq!(card.accuracy_percent(), 0);
        assert!(card.hint().is_none());
    }

    #[test]
    fn patch_rejects_blank_word() {
        let card = card("angry", "giận");
        let patch = FlashcardPatch {
            word: Some(" ".into()),
            ..FlashcardPatch::default()
        };
        assert_eq!(patch.apply(&card).unwrap_err(), FlashcardError::EmptyWord);
    }

    #[test]
    fn patch_updates_selected_fields() {
        let card = card("angry", "giận");
        let patch = FlashcardPatch {
            difficulty: Some(Difficulty::Hard),
            explanation: Some(" feeling anger ".into()),
            ..FlashcardPatch::default()
        };
        let updated = patch.apply(&card).unwrap();
        assert_eq!(updated.difficulty, Difficulty::Hard);
        assert_eq!(updated.hint(), Some("feeling anger"));
        assert_eq!(updated.word, "angry");
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn percentage_rounds_and_guards_zero() {
        assert_eq!(percentage(3, 4), 75);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn counters_must_be_consistent() {
        let mut card = card("calm", "bình tĩnh");
        card.times_practiced = 1;
        card.times_correct = 2;
        assert!(matches!(
            card.check_counters(),
            Err(FlashcardError::InvalidCounters { .. })
        ));
    }
}
