use async_trait::async_trait;
use flash_core::model::{Credentials, SignupDraft, User, UserId};

use super::ApiClient;
use super::mapping::{
    AuthResponse, LoginBody, SignupBody, StatusEnvelope, UserDto, UserEnvelope, UsersEnvelope,
};
use crate::repository::{AuthGrant, IdentityProvider, StorageError};

#[async_trait]
impl IdentityProvider for ApiClient {
    async fn signup(&self, draft: &SignupDraft) -> Result<AuthGrant, StorageError> {
        let request = self.post("auth/signup").json(&SignupBody::from(draft));
        let response: AuthResponse = self.send_json(request).await?;
        Ok(response.into_grant())
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, StorageError> {
        let request = self.post("auth/login").json(&LoginBody {
            email: &credentials.email,
            password: &credentials.password,
        });
        let response: AuthResponse = self.send_json(request).await?;
        Ok(response.into_grant())
    }

    async fn check_auth(&self, token: &str) -> Result<User, StorageError> {
        let request = self.client.get(self.url("auth/check")).bearer_auth(token);
        let user: UserDto = self.send_json(request).await?;
        Ok(user.into_user())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let envelope: UsersEnvelope = self.send_json(self.get("admin/users")).await?;
        Ok(envelope.users.into_iter().map(UserDto::into_user).collect())
    }

    async fn create_user(&self, draft: &SignupDraft) -> Result<User, StorageError> {
        let request = self.post("admin/users").json(&SignupBody::from(draft));
        let envelope: UserEnvelope = self.send_json(request).await?;
        Ok(envelope.user.into_user())
    }

    async fn toggle_user_status(&self, id: &UserId) -> Result<bool, StorageError> {
        let request = self.put(&format!("admin/users/{id}/toggle-status"));
        let envelope: StatusEnvelope = self.send_json(request).await?;
        Ok(envelope.is_active)
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), StorageError> {
        self.send(self.delete(&format!("admin/users/{id}"))).await?;
        Ok(())
    }
}
