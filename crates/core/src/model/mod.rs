mod category;
mod flashcard;
mod ids;
mod session;
mod user;

pub use ids::{CategoryId, FlashcardId, ParseIdError, UserId};

pub use category::{Category, CategoryDraft, CategoryError, DEFAULT_CATEGORY_COLOR};
pub use flashcard::{
    Difficulty, EnglishLevel, Flashcard, FlashcardDraft, FlashcardError, FlashcardPatch,
    NewFlashcard, ParseDifficultyError, SENSE_SEPARATOR, normalize_answer, percentage,
};
pub use session::{Score, SessionSummary, SessionSummaryError};
pub use user::{Credentials, MIN_PASSWORD_LEN, Role, SignupDraft, User, UserError};
