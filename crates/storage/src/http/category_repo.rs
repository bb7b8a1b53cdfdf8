use async_trait::async_trait;
use flash_core::model::{Category, CategoryDraft, CategoryId};

use super::ApiClient;
use super::mapping::{self, CategoriesEnvelope, CategoryBody, CategoryEnvelope};
use crate::repository::{CategoryRepository, StorageError};

#[async_trait]
impl CategoryRepository for ApiClient {
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let envelope: CategoriesEnvelope = self.send_json(self.get("categories")).await?;
        mapping::categories(envelope.categories)
    }

    async fn create_category(&self, draft: &CategoryDraft) -> Result<Category, StorageError> {
        let request = self.post("categories").json(&CategoryBody::from(draft));
        let envelope: CategoryEnvelope = self.send_json(request).await?;
        envelope.category.into_category()
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        draft: &CategoryDraft,
    ) -> Result<Category, StorageError> {
        let request = self
            .put(&format!("categories/{id}"))
            .json(&CategoryBody::from(draft));
        let envelope: CategoryEnvelope = self.send_json(request).await?;
        envelope.category.into_category()
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<(), StorageError> {
        self.send(self.delete(&format!("categories/{id}"))).await?;
        Ok(())
    }
}
