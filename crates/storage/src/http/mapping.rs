use chrono::{DateTime, NaiveDateTime, Utc};
use flash_core::model::{
    Category, CategoryDraft, CategoryId, Difficulty, EnglishLevel, Flashcard, FlashcardError,
    FlashcardId, FlashcardPatch, NewFlashcard, Role, SessionSummary, SignupDraft, User, UserId,
};
use serde::{Deserialize, Serialize};

use crate::repository::{AuthGrant, GenerateRequest, StorageError};

// ─── Inbound ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(super) struct FlashcardDto {
    #[serde(rename = "_id")]
    id: String,
    category_id: String,
    word: String,
    translation: String,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    times_practiced: u32,
    #[serde(default)]
    times_correct: u32,
    #[serde(default)]
    last_practiced: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl FlashcardDto {
    pub(super) fn into_flashcard(self) -> Result<Flashcard, StorageError> {
        // Unknown labels fall back to the default rather than failing the whole listing.
        let difficulty = self
            .difficulty
            .as_deref()
            .and_then(|raw| raw.parse::<Difficulty>().ok())
            .unwrap_or_default();
        let word = self.word.trim();
        if word.is_empty() {
            return Err(ser(FlashcardError::EmptyWord));
        }
        let mut card = Flashcard {
            id: FlashcardId::new(self.id),
            category_id: CategoryId::new(self.category_id),
            word: word.to_owned(),
            translation: self.translation,
            example: self.example.unwrap_or_default(),
            explanation: self.explanation.unwrap_or_default(),
            difficulty,
            times_practiced: self.times_practiced,
            times_correct: self.times_correct,
            last_practiced: parse_timestamp(self.last_practiced.as_deref())?,
            created_at: parse_timestamp(self.created_at.as_deref())?,
        };
        // Counters are display-only.
        if let Err(err) = card.check_counters() {
            tracing::warn!(flashcard_id = %card.id, %err, "clamping practice counters");
            card.times_correct = card.times_practiced;
        }
        Ok(card)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CategoryDto {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    flashcard_count: Option<u32>,
    #[serde(default)]
    created_at: Option<String>,
}

impl CategoryDto {
    pub(super) fn into_category(self) -> Result<Category, StorageError> {
        Ok(Category {
            id: CategoryId::new(self.id),
            name: self.name,
            description: self.description.unwrap_or_default(),
            color: self
                .color
                .unwrap_or_else(|| flash_core::model::DEFAULT_CATEGORY_COLOR.to_owned()),
            is_default: self.is_default,
            flashcard_count: self.flashcard_count,
            created_at: parse_timestamp(self.created_at.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct UserDto {
    #[serde(rename = "_id")]
    id: String,
    full_name: String,
    email: String,
    #[serde(default)]
    role: Role,
    #[serde(default = "active_by_default")]
    is_active: bool,
    #[serde(default)]
    profile_picture: Option<String>,
}

fn active_by_default() -> bool {
    true
}

impl UserDto {
    pub(super) fn into_user(self) -> User {
        User {
            id: UserId::new(self.id),
            full_name: self.full_name,
            email: self.email,
            role: self.role,
            is_active: self.is_active,
            profile_picture: self.profile_picture,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthResponse {
    user: UserDto,
    token: String,
}

impl AuthResponse {
    pub(super) fn into_grant(self) -> AuthGrant {
        AuthGrant {
            user: self.user.into_user(),
            token: self.token,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct FlashcardsEnvelope {
    pub(super) flashcards: Vec<FlashcardDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FlashcardEnvelope {
    pub(super) flashcard: FlashcardDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct CategoriesEnvelope {
    pub(super) categories: Vec<CategoryDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CategoryEnvelope {
    pub(super) category: CategoryDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct UsersEnvelope {
    pub(super) users: Vec<UserDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserEnvelope {
    pub(super) user: UserDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusEnvelope {
    pub(super) is_active: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Extract the human-readable message from an error body, if any.
pub(super) fn error_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed
        .error
        .or(parsed.message)
        .filter(|m| !m.trim().is_empty())
}

/// Convert a listing, skipping documents that cannot become a usable card.
pub(super) fn flashcards(dtos: Vec<FlashcardDto>) -> Vec<Flashcard> {
    dtos.into_iter()
        .filter_map(|dto| {
            let id = dto.id.clone();
            dto.into_flashcard()
                .inspect_err(|err| tracing::warn!(flashcard_id = %id, %err, "skipping flashcard"))
                .ok()
        })
        .collect()
}

pub(super) fn categories(dtos: Vec<CategoryDto>) -> Result<Vec<Category>, StorageError> {
    dtos.into_iter().map(CategoryDto::into_category).collect()
}

// ─── Outbound ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(super) struct SignupBody<'a> {
    #[serde(rename = "fullName")]
    full_name: &'a str,
    email: &'a str,
    password: &'a str,
    role: Role,
}

impl<'a> From<&'a SignupDraft> for SignupBody<'a> {
    fn from(draft: &'a SignupDraft) -> Self {
        Self {
            full_name: &draft.full_name,
            email: &draft.email,
            password: &draft.password,
            role: draft.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct LoginBody<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct CategoryBody<'a> {
    name: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
}

impl<'a> From<&'a CategoryDraft> for CategoryBody<'a> {
    fn from(draft: &'a CategoryDraft) -> Self {
        Self {
            name: &draft.name,
            description: &draft.description,
            color: draft.color.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct NewFlashcardBody<'a> {
    category_id: &'a str,
    word: &'a str,
    translation: &'a str,
    example: &'a str,
    explanation: &'a str,
    difficulty: Difficulty,
}

impl<'a> From<&'a NewFlashcard> for NewFlashcardBody<'a> {
    fn from(card: &'a NewFlashcard) -> Self {
        Self {
            category_id: card.category_id.as_str(),
            word: &card.word,
            translation: &card.translation,
            example: &card.example,
            explanation: &card.explanation,
            difficulty: card.difficulty,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct FlashcardPatchBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    category_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    word: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    difficulty: Option<Difficulty>,
}

impl<'a> From<&'a FlashcardPatch> for FlashcardPatchBody<'a> {
    fn from(patch: &'a FlashcardPatch) -> Self {
        Self {
            category_id: patch.category_id.as_ref().map(CategoryId::as_str),
            word: patch.word.as_deref(),
            translation: patch.translation.as_deref(),
            example: patch.example.as_deref(),
            explanation: patch.explanation.as_deref(),
            difficulty: patch.difficulty,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct GenerateBody<'a> {
    word: &'a str,
    category_id: &'a str,
    english_level: EnglishLevel,
}

impl<'a> From<&'a GenerateRequest> for GenerateBody<'a> {
    fn from(request: &'a GenerateRequest) -> Self {
        Self {
            word: request.word.trim(),
            category_id: request.category_id.as_str(),
            english_level: request.english_level,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SessionSummaryBody<'a> {
    category_id: &'a str,
    total_cards: u32,
    correct_answers: u32,
    session_duration: u64,
    score_percentage: u8,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl<'a> From<&'a SessionSummary> for SessionSummaryBody<'a> {
    fn from(summary: &'a SessionSummary) -> Self {
        Self {
            category_id: summary.category_id().as_str(),
            total_cards: summary.total_cards(),
            correct_answers: summary.correct_answers(),
            session_duration: summary.duration_secs(),
            score_percentage: summary.score_percentage(),
            started_at: summary.started_at(),
            completed_at: summary.completed_at(),
        }
    }
}

// ─── Helpers ───────────────────────────────────────────────────────────────────

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Parse RFC 3339 timestamps, or naive ISO timestamps which are taken as UTC.
fn parse_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, StorageError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| StorageError::Serialization(format!("invalid timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flash_core::model::Score;
    use flash_core::time::fixed_now;

    #[test]
    fn flashcard_dto_maps_backend_document() {
        let json = r#"{
            "_id": "65f0a1",
            "category_id": "c1",
            "word": "happy",
            "translation": "vui vẻ; hạnh phúc",
            "example": "She looks happy.",
            "difficulty": "easy",
            "times_practiced": 4,
            "times_correct": 3,
            "last_practiced": null,
            "created_at": "2024-03-01T10:15:30.123456"
        }"#;
        let dto: FlashcardDto = serde_json::from_str(json).unwrap();
        let card = dto.into_flashcard().unwrap();
        assert_eq!(card.id, FlashcardId::new("65f0a1"));
        assert_eq!(card.prompt(), "vui vẻ");
        assert_eq!(card.difficulty, Difficulty::Easy);
        assert_eq!(card.explanation, "");
        assert_eq!(card.accuracy_percent(), 75);
        assert!(card.created_at.is_some());
    }

    #[test]
    fn unknown_difficulty_defaults_to_medium() {
        let json = r#"{"_id":"x","category_id":"c","word":"w","translation":"t","difficulty":"insane"}"#;
        let card = serde_json::from_str::<FlashcardDto>(json)
            .unwrap()
            .into_flashcard()
            .unwrap();
        assert_eq!(card.difficulty, Difficulty::Medium);
    }

    #[test]
    fn inconsistent_counters_are_clamped() {
        let json = r#"{"_id":"x","category_id":"c","word":"w","translation":"t","times_practiced":1,"times_correct":2}"#;
        let card = serde_json::from_str::<FlashcardDto>(json)
            .unwrap()
            .into_flashcard()
            .unwrap();
        assert_eq!(card.times_practiced, 1);
        assert_eq!(card.times_correct, 1);
    }

    #[test]
    fn blank_headword_is_rejected() {
        let json = r#"{"_id":"x","category_id":"c","word":"   ","translation":"t"}"#;
        let err = serde_json::from_str::<FlashcardDto>(json)
            .unwrap()
            .into_flashcard()
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn listing_skips_unusable_documents() {
        let json = r#"[
            {"_id":"a","category_id":"c","word":"happy","translation":"vui"},
            {"_id":"b","category_id":"c","word":"","translation":"trống"},
            {"_id":"c","category_id":"c","word":" sad ","translation":"buồn","times_practiced":0,"times_correct":3}
        ]"#;
        let dtos: Vec<FlashcardDto> = serde_json::from_str(json).unwrap();
        let cards = flashcards(dtos);
        let words: Vec<&str> = cards.iter().map(|c| c.word.as_str()).collect();
        assert_eq!(words, ["happy", "sad"]);
        assert_eq!(cards[1].times_correct, 0);
    }

    #[test]
    fn rfc3339_timestamps_are_accepted() {
        let parsed = parse_timestamp(Some("2023-11-14T22:13:20Z")).unwrap();
        assert_eq!(parsed, Some(fixed_now()));
        assert!(parse_timestamp(Some("yesterday")).is_err());
        assert_eq!(parse_timestamp(Some("  ")).unwrap(), None);
    }

    #[test]
    fn user_dto_defaults_role_and_status() {
        let json = r#"{"_id":"u1","full_name":"Ana","email":"ana@example.com"}"#;
        let user = serde_json::from_str::<UserDto>(json).unwrap().into_user();
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);
    }

    #[test]
    fn signup_body_uses_camel_case_name() {
        let draft = SignupDraft::new("Ana", "ana@example.com", "secret1");
        let value = serde_json::to_value(SignupBody::from(&draft)).unwrap();
        assert_eq!(value["fullName"], "Ana");
        assert_eq!(value["role"], "user");
    }

    #[test]
    fn patch_body_omits_untouched_fields() {
        let patch = FlashcardPatch {
            difficulty: Some(Difficulty::Hard),
            ..FlashcardPatch::default()
        };
        let value = serde_json::to_value(FlashcardPatchBody::from(&patch)).unwrap();
        assert_eq!(value, serde_json::json!({ "difficulty": "hard" }));
    }

    #[test]
    fn summary_body_reports_duration_and_percentage() {
        let start = fixed_now();
        let summary = SessionSummary::new(
            CategoryId::new("c1"),
            4,
            Score { correct: 3, total: 4 },
            start,
            start + chrono::Duration::seconds(42),
        )
        .unwrap();
        let value = serde_json::to_value(SessionSummaryBody::from(&summary)).unwrap();
        assert_eq!(value["session_duration"], 42);
        assert_eq!(value["score_percentage"], 75);
        assert_eq!(value["total_cards"], 4);
    }

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(
            error_message(br#"{"error":"Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(error_message(b"<html>"), None);
    }
}
