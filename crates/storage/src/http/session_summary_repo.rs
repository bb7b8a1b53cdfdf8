use async_trait::async_trait;
use flash_core::model::SessionSummary;

use super::ApiClient;
use super::mapping::SessionSummaryBody;
use crate::repository::{SessionSummaryRepository, StorageError};

#[async_trait]
impl SessionSummaryRepository for ApiClient {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<(), StorageError> {
        let request = self
            .post("practice-sessions")
            .json(&SessionSummaryBody::from(summary));
        self.send(request).await?;
        Ok(())
    }
}
