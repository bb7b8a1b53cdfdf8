use async_trait::async_trait;
use chrono::Utc;
use flash_core::model::{
    Category, CategoryDraft, CategoryId, Credentials, EnglishLevel, Flashcard, FlashcardId,
    FlashcardPatch, NewFlashcard, SessionSummary, SignupDraft, User, UserId,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("not authenticated")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── REQUEST / RESPONSE SHAPES ─────────────────────────────────────────────────
//

/// Input for AI-assisted flashcard generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub word: String,
    pub category_id: CategoryId,
    pub english_level: EnglishLevel,
}

impl GenerateRequest {
    #[must_use]
    pub fn new(word: impl Into<String>, category_id: CategoryId) -> Self {
        Self {
            word: word.into(),
            category_id,
            english_level: EnglishLevel::default(),
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: EnglishLevel) -> Self {
        self.english_level = level;
        self
    }
}

/// Successful signup or login: the account plus its bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub user: User,
    pub token: String,
}

impl fmt::Debug for AuthGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGrant")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// List every category visible to the caller, defaults included.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached or rejects the call.
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError>;

    /// Create a category from a validated draft.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the category cannot be stored.
    async fn create_category(&self, draft: &CategoryDraft) -> Result<Category, StorageError>;

    /// Replace name, description and color of a category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn update_category(
        &self,
        id: &CategoryId,
        draft: &CategoryDraft,
    ) -> Result<Category, StorageError>;

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_category(&self, id: &CategoryId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait FlashcardRepository: Send + Sync {
    /// List all flashcards of the caller.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached or rejects the call.
    async fn list_flashcards(&self) -> Result<Vec<Flashcard>, StorageError>;

    /// Fetch the practice pool of a category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown category and
    /// `StorageError::Network` when the backend is unreachable.
    async fn list_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Flashcard>, StorageError>;

    /// Fetch a single flashcard.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_flashcard(&self, id: &FlashcardId) -> Result<Flashcard, StorageError>;

    /// Store a validated flashcard; the backend assigns the id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the flashcard cannot be stored.
    async fn create_flashcard(&self, card: &NewFlashcard) -> Result<Flashcard, StorageError>;

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn update_flashcard(
        &self,
        id: &FlashcardId,
        patch: &FlashcardPatch,
    ) -> Result<Flashcard, StorageError>;

    /// Delete a flashcard.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_flashcard(&self, id: &FlashcardId) -> Result<(), StorageError>;

    /// Ask the backend's AI generator to author and store a flashcard for a word.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if generation fails or the result cannot be stored.
    async fn generate_flashcard(&self, request: &GenerateRequest)
    -> Result<Flashcard, StorageError>;
}

#[async_trait]
pub trait SessionSummaryRepository: Send + Sync {
    /// Report a completed practice session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the report cannot be delivered.
    async fn append_summary(&self, summary: &SessionSummary) -> Result<(), StorageError>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is taken, or other storage errors.
    async fn signup(&self, draft: &SignupDraft) -> Result<AuthGrant, StorageError>;

    /// Exchange credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unauthorized` for bad credentials and
    /// `StorageError::Forbidden` for deactivated accounts.
    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, StorageError>;

    /// Resolve the account behind a token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unauthorized` if the token is unknown or expired.
    async fn check_auth(&self, token: &str) -> Result<User, StorageError>;

    /// List all accounts (admin only).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Forbidden` for non-admin callers.
    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    /// Create an account on behalf of someone else (admin only).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is taken, or other storage errors.
    async fn create_user(&self, draft: &SignupDraft) -> Result<User, StorageError>;

    /// Flip an account between active and deactivated; returns the new state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn toggle_user_status(&self, id: &UserId) -> Result<bool, StorageError>;

    /// Delete an account (admin only).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_user(&self, id: &UserId) -> Result<(), StorageError>;
}

/// Key-value slot for the bearer token.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str);
    fn clear(&self);
}

/// Process-local token slot; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.slot().clone()
    }

    fn set(&self, token: &str) {
        *self.slot() = Some(token.to_owned());
    }

    fn clear(&self) {
        *self.slot() = None;
    }
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    categories: Vec<Category>,
    flashcards: Vec<Flashcard>,
    summaries: Vec<SessionSummary>,
    accounts: Vec<Account>,
    tokens: HashMap<String, UserId>,
}

struct Account {
    user: User,
    password: String,
}

/// Simple in-memory backend for testing and prototyping.
///
/// Entities keep insertion order, which makes listings deterministic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a category as-is, keeping its id and default flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Network` if the state lock is poisoned.
    pub fn seed_category(&self, category: Category) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.categories.retain(|c| c.id != category.id);
        state.categories.push(category);
        Ok(())
    }

    /// Insert or replace a flashcard as-is.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Network` if the state lock is poisoned.
    pub fn seed_flashcard(&self, card: Flashcard) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.flashcards.retain(|c| c.id != card.id);
        state.flashcards.push(card);
        Ok(())
    }

    /// Completed sessions reported so far.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Network` if the state lock is poisoned.
    pub fn summaries(&self) -> Result<Vec<SessionSummary>, StorageError> {
        Ok(self.lock()?.summaries.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Network(e.to_string()))
    }

    fn mint(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }

    fn grant(&self, state: &mut MemoryState, user: &User) -> AuthGrant {
        let token = self.mint("token");
        state.tokens.insert(token.clone(), user.id.clone());
        AuthGrant {
            user: user.clone(),
            token,
        }
    }

    fn register(&self, state: &mut MemoryState, draft: &SignupDraft) -> Result<User, StorageError> {
        if state.accounts.iter().any(|a| a.user.email == draft.email) {
            return Err(StorageError::Conflict("User already exists".into()));
        }
        let user = User {
            id: UserId::new(self.mint("user")),
            full_name: draft.full_name.clone(),
            email: draft.email.clone(),
            role: draft.role,
            is_active: true,
            profile_picture: None,
        };
        state.accounts.push(Account {
            user: user.clone(),
            password: draft.password.clone(),
        });
        Ok(user)
    }
}

#[async_trait]
impl CategoryRepository for InMemoryRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .categories
            .iter()
            .map(|c| {
                let count = state
                    .flashcards
                    .iter()
                    .filter(|f| f.category_id == c.id)
                    .count();
                Category {
                    flashcard_count: u32::try_from(count).ok(),
                    ..c.clone()
                }
            })
            .collect())
    }

    async fn create_category(&self, draft: &CategoryDraft) -> Result<Category, StorageError> {
        let id = CategoryId::new(self.mint("category"));
        let category = draft.clone().into_category(id, Utc::now());
        self.lock()?.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        draft: &CategoryDraft,
    ) -> Result<Category, StorageError> {
        let mut state = self.lock()?;
        let existing = state
            .categories
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or(StorageError::NotFound)?;
        existing.name.clone_from(&draft.name);
        existing.description.clone_from(&draft.description);
        if let Some(color) = &draft.color {
            existing.color.clone_from(color);
        }
        Ok(existing.clone())
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let before = state.categories.len();
        state.categories.retain(|c| &c.id != id);
        if state.categories.len() == before {
            return Err(StorageError::NotFound);
        }
        state.flashcards.retain(|f| &f.category_id != id);
        Ok(())
    }
}

#[async_trait]
impl FlashcardRepository for InMemoryRepository {
    async fn list_flashcards(&self) -> Result<Vec<Flashcard>, StorageError> {
        Ok(self.lock()?.flashcards.clone())
    }

    async fn list_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Flashcard>, StorageError> {
        let state = self.lock()?;
        if !state.categories.iter().any(|c| &c.id == category_id) {
            return Err(StorageError::NotFound);
        }
        Ok(state
            .flashcards
            .iter()
            .filter(|f| &f.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn get_flashcard(&self, id: &FlashcardId) -> Result<Flashcard, StorageError> {
        self.lock()?
            .flashcards
            .iter()
            .find(|f| &f.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn create_flashcard(&self, card: &NewFlashcard) -> Result<Flashcard, StorageError> {
        let id = FlashcardId::new(self.mint("flashcard"));
        let created = card.clone().assign_id(id, Utc::now());
        self.lock()?.flashcards.push(created.clone());
        Ok(created)
    }

    async fn update_flashcard(
        &self,
        id: &FlashcardId,
        patch: &FlashcardPatch,
    ) -> Result<Flashcard, StorageError> {
        let mut state = self.lock()?;
        let existing = state
            .flashcards
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or(StorageError::NotFound)?;
        let updated = patch
            .apply(existing)
            .map_err(|e| StorageError::Api {
                status: 400,
                message: e.to_string(),
            })?;
        *existing = updated.clone();
        Ok(updated)
    }

    async fn delete_flashcard(&self, id: &FlashcardId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let before = state.flashcards.len();
        state.flashcards.retain(|f| &f.id != id);
        if state.flashcards.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn generate_flashcard(
        &self,
        request: &GenerateRequest,
    ) -> Result<Flashcard, StorageError> {
        let word = request.word.trim();
        if word.is_empty() {
            return Err(StorageError::Api {
                status: 400,
                message: "Word is required".into(),
            });
        }
        if !self
            .lock()?
            .categories
            .iter()
            .any(|c| c.id == request.category_id)
        {
            return Err(StorageError::NotFound);
        }
        // No model behind the in-memory backend: echo the word back as its own gloss.
        let draft = flash_core::model::FlashcardDraft::new(
            request.category_id.clone(),
            word,
            word,
        )
        .with_explanation(format!("Generated entry for \"{word}\""));
        let card = draft.validate().map_err(|e| StorageError::Api {
            status: 400,
            message: e.to_string(),
        })?;
        self.create_flashcard(&card).await
    }
}

#[async_trait]
impl SessionSummaryRepository for InMemoryRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<(), StorageError> {
        self.lock()?.summaries.push(summary.clone());
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for InMemoryRepository {
    async fn signup(&self, draft: &SignupDraft) -> Result<AuthGrant, StorageError> {
        let mut state = self.lock()?;
        let user = self.register(&mut state, draft)?;
        Ok(self.grant(&mut state, &user))
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, StorageError> {
        let mut state = self.lock()?;
        let user = state
            .accounts
            .iter()
            .find(|a| a.user.email == credentials.email && a.password == credentials.password)
            .map(|a| a.user.clone())
            .ok_or(StorageError::Unauthorized)?;
        if !user.is_active {
            return Err(StorageError::Forbidden);
        }
        Ok(self.grant(&mut state, &user))
    }

    async fn check_auth(&self, token: &str) -> Result<User, StorageError> {
        let state = self.lock()?;
        let user_id = state.tokens.get(token).ok_or(StorageError::Unauthorized)?;
        state
            .accounts
            .iter()
            .find(|a| &a.user.id == user_id)
            .map(|a| a.user.clone())
            .ok_or(StorageError::Unauthorized)
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        Ok(self
            .lock()?
            .accounts
            .iter()
            .map(|a| a.user.clone())
            .collect())
    }

    async fn create_user(&self, draft: &SignupDraft) -> Result<User, StorageError> {
        let mut state = self.lock()?;
        self.register(&mut state, draft)
    }

    async fn toggle_user_status(&self, id: &UserId) -> Result<bool, StorageError> {
        let mut state = self.lock()?;
        let account = state
            .accounts
            .iter_mut()
            .find(|a| &a.user.id == id)
            .ok_or(StorageError::NotFound)?;
        account.user.is_active = !account.user.is_active;
        Ok(account.user.is_active)
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let before = state.accounts.len();
        state.accounts.retain(|a| &a.user.id != id);
        if state.accounts.len() == before {
            return Err(StorageError::NotFound);
        }
        state.tokens.retain(|_, owner| owner != id);
        Ok(())
    }
}

/// Aggregates the remote collaborators behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub categories: Arc<dyn CategoryRepository>,
    pub flashcards: Arc<dyn FlashcardRepository>,
    pub session_summaries: Arc<dyn SessionSummaryRepository>,
    pub identity: Arc<dyn IdentityProvider>,
    pub tokens: Arc<dyn TokenStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(&InMemoryRepository::new())
    }

    /// Wire every collaborator to the same in-memory backend.
    #[must_use]
    pub fn from_repository(repo: &InMemoryRepository) -> Self {
        Self {
            categories: Arc::new(repo.clone()),
            flashcards: Arc::new(repo.clone()),
            session_summaries: Arc::new(repo.clone()),
            identity: Arc::new(repo.clone()),
            tokens: Arc::new(MemoryTokenStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flash_core::model::{FlashcardDraft, Role};

    async fn seeded() -> (InMemoryRepository, Category) {
        let repo = InMemoryRepository::new();
        let draft = CategoryDraft::new("Emotions").validate().unwrap();
        let category = repo.create_category(&draft).await.unwrap();
        (repo, category)
    }

    #[tokio::test]
    async fn pool_is_scoped_to_category() {
        let (repo, emotions) = seeded().await;
        let other = repo
            .create_category(&CategoryDraft::new("Food").validate().unwrap())
            .await
            .unwrap();

        for (word, category) in [("happy", &emotions), ("bread", &other), ("sad", &emotions)] {
            let card = FlashcardDraft::new(category.id.clone(), word, "x")
                .validate()
                .unwrap();
            repo.create_flashcard(&card).await.unwrap();
        }

        let pool = repo.list_by_category(&emotions.id).await.unwrap();
        let words: Vec<_> = pool.iter().map(|c| c.word.as_str()).collect();
        assert_eq!(words, vec!["happy", "sad"]);

        let listed = repo.list_categories().await.unwrap();
        assert_eq!(listed[0].flashcard_count, Some(2));
    }

    #[tokio::test]
    async fn unknown_category_pool_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .list_by_category(&CategoryId::new("missing"))
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::NotFound);
    }

    #[tokio::test]
    async fn deleting_category_drops_its_flashcards() {
        let (repo, category) = seeded().await;
        let card = FlashcardDraft::new(category.id.clone(), "calm", "x")
            .validate()
            .unwrap();
        repo.create_flashcard(&card).await.unwrap();

        repo.delete_category(&category.id).await.unwrap();
        assert!(repo.list_flashcards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_checks_password_and_status() {
        let repo = InMemoryRepository::new();
        let draft = SignupDraft::new("Ana", "ana@example.com", "secret1")
            .with_role(Role::Admin)
            .validate()
            .unwrap();
        let grant = repo.signup(&draft).await.unwrap();
        assert_eq!(repo.check_auth(&grant.token).await.unwrap().email, "ana@example.com");

        let wrong = Credentials::new("ana@example.com", "nope").unwrap();
        assert_eq!(repo.login(&wrong).await.unwrap_err(), StorageError::Unauthorized);

        repo.toggle_user_status(&grant.user.id).await.unwrap();
        let right = Credentials::new("ana@example.com", "secret1").unwrap();
        assert_eq!(repo.login(&right).await.unwrap_err(), StorageError::Forbidden);
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let repo = InMemoryRepository::new();
        let draft = SignupDraft::new("Ana", "ana@example.com", "secret1")
            .validate()
            .unwrap();
        repo.signup(&draft).await.unwrap();
        assert!(matches!(
            repo.signup(&draft).await.unwrap_err(),
            StorageError::Conflict(_)
        ));
    }

    #[test]
    fn token_store_round_trips() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(), None);
        store.set("abc");
        assert_eq!(store.get().as_deref(), Some("abc"));
        store.clear();
        assert_eq!(store.get(), None);
    }
}
