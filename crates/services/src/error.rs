//! Shared error types for the services crate.

use thiserror::Error;

use flash_core::model::{CategoryError, FlashcardError, SessionSummaryError, UserError};
use storage::StorageError;
use storage::http::ApiConfigError;

/// Errors emitted by the practice session engine.
///
/// Every rejected operation leaves the session exactly as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot start a session with an empty flashcard pool")]
    EmptyPool,
    #[error("current question has not been answered yet")]
    QuestionNotAnswered,
    #[error("current question has already been answered")]
    DuplicateSubmission,
    #[error("answer cannot be empty")]
    InvalidAnswer,
    #[error("exit was not confirmed")]
    ExitNotConfirmed,
    #[error("session is no longer active")]
    Closed,
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
}

/// Errors emitted by `PracticeLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CategoryService` and `FlashcardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Flashcard(#[from] FlashcardError),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error("default categories can only be changed by an admin")]
    DefaultCategory,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AuthService` and `AdminService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthServiceError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error("not logged in")]
    NotAuthenticated,
    #[error("admin access required")]
    Forbidden,
    #[error("admins cannot deactivate or delete their own account")]
    OwnAccount,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ApiConfigError),
}
