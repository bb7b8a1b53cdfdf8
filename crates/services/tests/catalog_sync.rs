use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use flash_core::model::{
    Category, CategoryDraft, CategoryId, Flashcard, FlashcardDraft, FlashcardId, FlashcardPatch,
    NewFlashcard, Role, User, UserId,
};
use flash_core::time::fixed_now;
use services::{CatalogError, CatalogService, Clock};
use storage::StorageError;
use storage::repository::{
    CategoryRepository, FlashcardRepository, GenerateRequest, InMemoryRepository,
};

/// Delegates to the in-memory backend until told to fail every mutation.
#[derive(Clone)]
struct FlakyBackend {
    inner: InMemoryRepository,
    failing: Arc<AtomicBool>,
}

impl FlakyBackend {
    fn new(inner: InMemoryRepository) -> Self {
        Self {
            inner,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    fn go_offline(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Network("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for FlakyBackend {
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        self.inner.list_categories().await
    }

    async fn create_category(&self, draft: &CategoryDraft) -> Result<Category, StorageError> {
        self.check()?;
        self.inner.create_category(draft).await
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        draft: &CategoryDraft,
    ) -> Result<Category, StorageError> {
        self.check()?;
        self.inner.update_category(id, draft).await
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<(), StorageError> {
        self.check()?;
        self.inner.delete_category(id).await
    }
}

#[async_trait]
impl FlashcardRepository for FlakyBackend {
    async fn list_flashcards(&self) -> Result<Vec<Flashcard>, StorageError> {
        self.inner.list_flashcards().await
    }

    async fn list_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Flashcard>, StorageError> {
        self.inner.list_by_category(category_id).await
    }

    async fn get_flashcard(&self, id: &FlashcardId) -> Result<Flashcard, StorageError> {
        self.inner.get_flashcard(id).await
    }

    async fn create_flashcard(&self, card: &NewFlashcard) -> Result<Flashcard, StorageError> {
        self.check()?;
        self.inner.create_flashcard(card).await
    }

    async fn update_flashcard(
        &self,
        id: &FlashcardId,
        patch: &FlashcardPatch,
    ) -> Result<Flashcard, StorageError> {
        self.check()?;
        self.inner.update_flashcard(id, patch).await
    }

    async fn delete_flashcard(&self, id: &FlashcardId) -> Result<(), StorageError> {
        self.check()?;
        self.inner.delete_flashcard(id).await
    }

    async fn generate_flashcard(
        &self,
        request: &GenerateRequest,
    ) -> Result<Flashcard, StorageError> {
        self.check()?;
        self.inner.generate_flashcard(request).await
    }
}

fn user(role: Role) -> User {
    User {
        id: UserId::new("u1"),
        full_name: "Lan Tran".into(),
        email: "lan@example.com".into(),
        role,
        is_active: true,
        profile_picture: None,
    }
}

fn default_category() -> Category {
    Category {
        is_default: true,
        ..CategoryDraft::new("Everyday")
            .validate()
            .unwrap()
            .into_category(CategoryId::new("everyday"), fixed_now())
    }
}

fn catalog(backend: &FlakyBackend) -> CatalogService {
    CatalogService::new(
        Clock::fixed(fixed_now()),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
    )
}

#[tokio::test]
async fn confirmed_create_replaces_provisional_entry() {
    let backend = FlakyBackend::new(InMemoryRepository::new());
    let catalog = catalog(&backend);

    let created = catalog
        .create_category(CategoryDraft::new("Travel"))
        .await
        .unwrap();

    let local = catalog.categories();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].id, created.id);
    assert!(!created.id.as_str().starts_with("pending-"));
    assert_eq!(catalog.pending_count(), 0);
}

#[tokio::test]
async fn failed_mutations_roll_back() {
    let repo = InMemoryRepository::new();
    repo.seed_category(default_category()).unwrap();
    let backend = FlakyBackend::new(repo);
    let catalog = catalog(&backend);
    catalog.refresh_categories().await.unwrap();

    let card = catalog
        .create_flashcard(FlashcardDraft::new(CategoryId::new("everyday"), "bread", "bánh mì"))
        .await
        .unwrap();

    backend.go_offline();

    let err = catalog
        .create_flashcard(FlashcardDraft::new(CategoryId::new("everyday"), "milk", "sữa"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Storage(StorageError::Network(_))));

    let patch = FlashcardPatch {
        word: Some("loaf".into()),
        ..FlashcardPatch::default()
    };
    catalog.update_flashcard(&card.id, patch).await.unwrap_err();
    catalog.delete_flashcard(&card.id).await.unwrap_err();

    let local = catalog.flashcards();
    assert_eq!(local, vec![card]);
    assert_eq!(catalog.pending_count(), 0);
}

#[tokio::test]
async fn patch_that_blanks_word_is_rejected_locally() {
    let repo = InMemoryRepository::new();
    repo.seed_category(default_category()).unwrap();
    let backend = FlakyBackend::new(repo);
    let catalog = catalog(&backend);
    let card = catalog
        .create_flashcard(FlashcardDraft::new(CategoryId::new("everyday"), "bread", "bánh mì"))
        .await
        .unwrap();

    let patch = FlashcardPatch {
        word: Some("  ".into()),
        ..FlashcardPatch::default()
    };
    let err = catalog.update_flashcard(&card.id, patch).await.unwrap_err();
    assert!(matches!(err, CatalogError::Flashcard(_)));
    assert_eq!(catalog.flashcards()[0].word, "bread");
}

#[tokio::test]
async fn default_categories_are_admin_only() {
    let repo = InMemoryRepository::new();
    repo.seed_category(default_category()).unwrap();
    let backend = FlakyBackend::new(repo);
    let catalog = catalog(&backend);
    catalog.refresh_categories().await.unwrap();
    let id = CategoryId::new("everyday");

    let err = catalog
        .update_category(&user(Role::User), &id, CategoryDraft::new("Mine now"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::DefaultCategory));
    let err = catalog
        .delete_category(&user(Role::User), &id)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::DefaultCategory));

    let renamed = catalog
        .update_category(&user(Role::Admin), &id, CategoryDraft::new("Daily life"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Daily life");
    assert_eq!(catalog.categories()[0].name, "Daily life");
}

#[tokio::test]
async fn deleting_category_drops_its_local_flashcards() {
    let backend = FlakyBackend::new(InMemoryRepository::new());
    let catalog = catalog(&backend);
    let travel = catalog
        .create_category(CategoryDraft::new("Travel"))
        .await
        .unwrap();
    catalog
        .create_flashcard(FlashcardDraft::new(travel.id.clone(), "ticket", "vé"))
        .await
        .unwrap();

    catalog
        .delete_category(&user(Role::User), &travel.id)
        .await
        .unwrap();
    assert!(catalog.categories().is_empty());
    assert!(catalog.flashcards_in(&travel.id).is_empty());
}

#[tokio::test]
async fn generated_flashcard_lands_in_its_category() {
    let backend = FlakyBackend::new(InMemoryRepository::new());
    let catalog = catalog(&backend);
    let travel = catalog
        .create_category(CategoryDraft::new("Travel"))
        .await
        .unwrap();

    let card = catalog
        .generate_flashcard(&GenerateRequest::new("passport", travel.id.clone()))
        .await
        .unwrap();
    assert_eq!(card.word, "passport");

    let fresh = catalog.refresh_category_flashcards(&travel.id).await.unwrap();
    assert_eq!(fresh, vec![card.clone()]);
    assert_eq!(catalog.flashcards_in(&travel.id), vec![card]);
}
