use async_trait::async_trait;
use flash_core::model::{CategoryId, Flashcard, FlashcardId, FlashcardPatch, NewFlashcard};

use super::ApiClient;
use super::mapping::{
    self, FlashcardDto, FlashcardEnvelope, FlashcardPatchBody, FlashcardsEnvelope, GenerateBody,
    NewFlashcardBody,
};
use crate::repository::{FlashcardRepository, GenerateRequest, StorageError};

#[async_trait]
impl FlashcardRepository for ApiClient {
    async fn list_flashcards(&self) -> Result<Vec<Flashcard>, StorageError> {
        let envelope: FlashcardsEnvelope = self.send_json(self.get("flashcards")).await?;
        Ok(mapping::flashcards(envelope.flashcards))
    }

    async fn list_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Flashcard>, StorageError> {
        let path = format!("categories/{category_id}/flashcards");
        let envelope: FlashcardsEnvelope = self.send_json(self.get(&path)).await?;
        Ok(mapping::flashcards(envelope.flashcards))
    }

    async fn get_flashcard(&self, id: &FlashcardId) -> Result<Flashcard, StorageError> {
        let dto: FlashcardDto = self.send_json(self.get(&format!("flashcards/{id}"))).await?;
        dto.into_flashcard()
    }

    async fn create_flashcard(&self, card: &NewFlashcard) -> Result<Flashcard, StorageError> {
        let request = self.post("flashcards").json(&NewFlashcardBody::from(card));
        let envelope: FlashcardEnvelope = self.send_json(request).await?;
        envelope.flashcard.into_flashcard()
    }

    async fn update_flashcard(
        &self,
        id: &FlashcardId,
        patch: &FlashcardPatch,
    ) -> Result<Flashcard, StorageError> {
        let request = self
            .put(&format!("flashcards/{id}"))
            .json(&FlashcardPatchBody::from(patch));
        let envelope: FlashcardEnvelope = self.send_json(request).await?;
        envelope.flashcard.into_flashcard()
    }

    async fn delete_flashcard(&self, id: &FlashcardId) -> Result<(), StorageError> {
        self.send(self.delete(&format!("flashcards/{id}"))).await?;
        Ok(())
    }

    async fn generate_flashcard(
        &self,
        request: &GenerateRequest,
    ) -> Result<Flashcard, StorageError> {
        tracing::info!(word = %request.word, category = %request.category_id, "requesting AI flashcard");
        let http = self
            .post("flashcards/generate")
            .json(&GenerateBody::from(request));
        let envelope: FlashcardEnvelope = self.send_json(http).await?;
        envelope.flashcard.into_flashcard()
    }
}
