#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod catalog;
pub mod error;
pub mod sessions;

pub use flash_core::Clock;

pub use app_services::AppServices;
pub use auth_service::{AdminService, AuthService};
pub use catalog::{CatalogService, LocalCollection};
pub use error::{AppServicesError, AuthServiceError, CatalogError, PracticeError, SessionError};

pub use sessions::{
    AnswerVerdict, ExitConfirmation, PracticeAdvance, PracticeLoopService, PracticeSession,
    SessionProgress, SessionState,
};
