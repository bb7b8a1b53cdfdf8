use std::sync::Arc;

use storage::Storage;
use storage::http::ApiConfig;

use crate::Clock;
use crate::auth_service::{AdminService, AuthService};
use crate::catalog::CatalogService;
use crate::error::AppServicesError;
use crate::sessions::PracticeLoopService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    auth: Arc<AuthService>,
    admin: Arc<AdminService>,
    catalog: Arc<CatalogService>,
    practice: Arc<PracticeLoopService>,
}

impl AppServices {
    /// Wire every service to the given storage.
    #[must_use]
    pub fn new(storage: &Storage, clock: Clock) -> Self {
        let auth = AuthService::new(Arc::clone(&storage.identity), Arc::clone(&storage.tokens));
        let admin = AdminService::new(auth.clone(), Arc::clone(&storage.identity));
        let catalog = CatalogService::new(
            clock,
            Arc::clone(&storage.categories),
            Arc::clone(&storage.flashcards),
        );
        let practice = PracticeLoopService::new(
            clock,
            Arc::clone(&storage.flashcards),
            Arc::clone(&storage.session_summaries),
        );

        Self {
            auth: Arc::new(auth),
            admin: Arc::new(admin),
            catalog: Arc::new(catalog),
            practice: Arc::new(practice),
        }
    }

    /// Build services backed by the HTTP API configured through the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Config` if the API settings are invalid or the
    /// HTTP client cannot be built.
    pub fn from_env(clock: Clock) -> Result<Self, AppServicesError> {
        let config = ApiConfig::from_env()?;
        Self::http(&config, clock)
    }

    /// Build services backed by the HTTP API at `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Config` if the HTTP client cannot be built.
    pub fn http(config: &ApiConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::http(config)?;
        Ok(Self::new(&storage, clock))
    }

    /// Replace the practice workflow, e.g. to pin its seed.
    #[must_use]
    pub fn with_practice(mut self, practice: PracticeLoopService) -> Self {
        self.practice = Arc::new(practice);
        self
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn admin(&self) -> Arc<AdminService> {
        Arc::clone(&self.admin)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeLoopService> {
        Arc::clone(&self.practice)
    }
}
