use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use uuid::Uuid;

use flash_core::model::{
    Category, CategoryDraft, CategoryId, Flashcard, FlashcardDraft, FlashcardId, FlashcardPatch,
    User,
};
use storage::repository::{CategoryRepository, FlashcardRepository, GenerateRequest};

use super::local::LocalCollection;
use crate::Clock;
use crate::error::CatalogError;

#[derive(Debug, Default)]
struct CatalogState {
    categories: LocalCollection<Category>,
    flashcards: LocalCollection<Flashcard>,
}

/// Categories and flashcards of the signed-in user, kept in sync with the backend.
///
/// Mutations show up locally right away under a provisional entry, then get
/// confirmed with the server's version or rolled back when the request fails.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    categories: Arc<dyn CategoryRepository>,
    flashcards: Arc<dyn FlashcardRepository>,
    state: Arc<Mutex<CatalogState>>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        categories: Arc<dyn CategoryRepository>,
        flashcards: Arc<dyn FlashcardRepository>,
    ) -> Self {
        Self {
            clock,
            categories,
            flashcards,
            state: Arc::new(Mutex::new(CatalogState::default())),
        }
    }

    //
    // ─── SNAPSHOTS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        self.state().categories.items().to_vec()
    }

    #[must_use]
    pub fn flashcards(&self) -> Vec<Flashcard> {
        self.state().flashcards.items().to_vec()
    }

    #[must_use]
    pub fn flashcards_in(&self, category_id: &CategoryId) -> Vec<Flashcard> {
        self.state()
            .flashcards
            .items()
            .iter()
            .filter(|card| &card.category_id == category_id)
            .cloned()
            .collect()
    }

    /// Number of mutations still waiting for the backend.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        let state = self.state();
        state.categories.pending_count() + state.flashcards.pending_count()
    }

    //
    // ─── CATEGORIES ────────────────────────────────────────────────────────────
    //

    /// Reload every category from the backend.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the listing fails; local state is kept.
    pub async fn refresh_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let fresh = self.categories.list_categories().await?;
        self.state().categories.replace_all(fresh.clone());
        Ok(fresh)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Category` for invalid input and
    /// `CatalogError::Storage` if the backend rejects it.
    pub async fn create_category(&self, draft: CategoryDraft) -> Result<Category, CatalogError> {
        let draft = draft.validate()?;
        let provisional = draft
            .clone()
            .into_category(CategoryId::new(provisional_id()), self.clock.now());
        let key = provisional.id.clone();
        self.state().categories.begin_create(provisional);

        match self.categories.create_category(&draft).await {
            Ok(created) => {
                self.state().categories.confirm(&key, created.clone());
                Ok(created)
            }
            Err(err) => {
                self.state().categories.rollback(&key);
                warn!(error = %err, "category create rolled back");
                Err(err.into())
            }
        }
    }

    /// Replace a category's name, description and color.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DefaultCategory` when a non-admin edits a default
    /// category, `CatalogError::Category` for invalid input and
    /// `CatalogError::Storage` if the backend rejects it.
    pub async fn update_category(
        &self,
        actor: &User,
        id: &CategoryId,
        draft: CategoryDraft,
    ) -> Result<Category, CatalogError> {
        let draft = draft.validate()?;
        let existing = self.guard_default(actor, id)?;

        if let Some(existing) = existing {
            let provisional = Category {
                name: draft.name.clone(),
                description: draft.description.clone(),
                color: draft.color.clone().unwrap_or(existing.color.clone()),
                ..existing
            };
            self.state().categories.begin_update(provisional);
        }

        match self.categories.update_category(id, &draft).await {
            Ok(updated) => {
                self.state().categories.confirm(id, updated.clone());
                Ok(updated)
            }
            Err(err) => {
                self.state().categories.rollback(id);
                warn!(category_id = %id, error = %err, "category update rolled back");
                Err(err.into())
            }
        }
    }

    /// Delete a category together with its flashcards.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DefaultCategory` when a non-admin deletes a default
    /// category and `CatalogError::Storage` if the backend rejects it.
    pub async fn delete_category(&self, actor: &User, id: &CategoryId) -> Result<(), CatalogError> {
        self.guard_default(actor, id)?;
        self.state().categories.begin_remove(id);

        match self.categories.delete_category(id).await {
            Ok(()) => {
                let mut state = self.state();
                state.categories.confirm_removal(id);
                state
                    .flashcards
                    .replace_matching(|card| &card.category_id == id, Vec::new());
                Ok(())
            }
            Err(err) => {
                self.state().categories.rollback(id);
                warn!(category_id = %id, error = %err, "category delete rolled back");
                Err(err.into())
            }
        }
    }

    fn guard_default(&self, actor: &User, id: &CategoryId) -> Result<Option<Category>, CatalogError> {
        let existing = self.state().categories.get(id).cloned();
        if existing.as_ref().is_some_and(|c| c.is_default) && !actor.is_admin() {
            return Err(CatalogError::DefaultCategory);
        }
        Ok(existing)
    }

    //
    // ─── FLASHCARDS ────────────────────────────────────────────────────────────
    //

    /// Reload every flashcard from the backend.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the listing fails; local state is kept.
    pub async fn refresh_flashcards(&self) -> Result<Vec<Flashcard>, CatalogError> {
        let fresh = self.flashcards.list_flashcards().await?;
        self.state().flashcards.replace_all(fresh.clone());
        Ok(fresh)
    }

    /// Reload the flashcards of a single category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the listing fails; local state is kept.
    pub async fn refresh_category_flashcards(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Flashcard>, CatalogError> {
        let fresh = self.flashcards.list_by_category(category_id).await?;
        self.state()
            .flashcards
            .replace_matching(|card| &card.category_id == category_id, fresh.clone());
        Ok(fresh)
    }

    /// Fetch one flashcard and merge it into local state.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the fetch fails.
    pub async fn get_flashcard(&self, id: &FlashcardId) -> Result<Flashcard, CatalogError> {
        let card = self.flashcards.get_flashcard(id).await?;
        self.state().flashcards.upsert_confirmed(card.clone());
        Ok(card)
    }

    /// Create a flashcard.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Flashcard` for invalid input and
    /// `CatalogError::Storage` if the backend rejects it.
    pub async fn create_flashcard(&self, draft: FlashcardDraft) -> Result<Flashcard, CatalogError> {
        let new_card = draft.validate()?;
        let provisional = new_card
            .clone()
            .assign_id(FlashcardId::new(provisional_id()), self.clock.now());
        let key = provisional.id.clone();
        self.state().flashcards.begin_create(provisional);

        match self.flashcards.create_flashcard(&new_card).await {
            Ok(created) => {
                self.state().flashcards.confirm(&key, created.clone());
                Ok(created)
            }
            Err(err) => {
                self.state().flashcards.rollback(&key);
                warn!(error = %err, "flashcard create rolled back");
                Err(err.into())
            }
        }
    }

    /// Apply a partial update to a flashcard.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Flashcard` if the patch blanks a required field and
    /// `CatalogError::Storage` if the backend rejects it.
    pub async fn update_flashcard(
        &self,
        id: &FlashcardId,
        patch: FlashcardPatch,
    ) -> Result<Flashcard, CatalogError> {
        let existing = self.state().flashcards.get(id).cloned();
        if let Some(existing) = existing {
            let provisional = patch.apply(&existing)?;
            self.state().flashcards.begin_update(provisional);
        }

        match self.flashcards.update_flashcard(id, &patch).await {
            Ok(updated) => {
                self.state().flashcards.confirm(id, updated.clone());
                Ok(updated)
            }
            Err(err) => {
                self.state().flashcards.rollback(id);
                warn!(flashcard_id = %id, error = %err, "flashcard update rolled back");
                Err(err.into())
            }
        }
    }

    /// Delete a flashcard.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the backend rejects it.
    pub async fn delete_flashcard(&self, id: &FlashcardId) -> Result<(), CatalogError> {
        self.state().flashcards.begin_remove(id);

        match self.flashcards.delete_flashcard(id).await {
            Ok(()) => {
                self.state().flashcards.confirm_removal(id);
                Ok(())
            }
            Err(err) => {
                self.state().flashcards.rollback(id);
                warn!(flashcard_id = %id, error = %err, "flashcard delete rolled back");
                Err(err.into())
            }
        }
    }

    /// Ask the backend to write a flashcard for `request.word` and add it locally.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if generation fails.
    pub async fn generate_flashcard(
        &self,
        request: &GenerateRequest,
    ) -> Result<Flashcard, CatalogError> {
        let card = self.flashcards.generate_flashcard(request).await?;
        debug!(flashcard_id = %card.id, word = %card.word, "generated flashcard added");
        self.state().flashcards.upsert_confirmed(card.clone());
        Ok(card)
    }

    fn state(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn provisional_id() -> String {
    format!("pending-{}", Uuid::new_v4())
}
