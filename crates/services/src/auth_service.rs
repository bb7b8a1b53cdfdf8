use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use flash_core::model::{Credentials, SignupDraft, User, UserId};
use storage::StorageError;
use storage::repository::{IdentityProvider, TokenStore};

use crate::error::AuthServiceError;

/// Signed-in user and bearer token lifecycle.
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    tokens: Arc<dyn TokenStore>,
    current: Arc<Mutex<Option<User>>>,
}

impl AuthService {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            identity,
            tokens,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Register a new account and sign in with it.
    ///
    /// # Errors
    ///
    /// Returns `AuthServiceError::User` for invalid input and
    /// `AuthServiceError::Storage` if the backend refuses the signup.
    pub async fn signup(&self, draft: SignupDraft) -> Result<User, AuthServiceError> {
        let draft = draft.validate()?;
        let grant = self.identity.signup(&draft).await?;
        self.tokens.set(&grant.token);
        info!(user_id = %grant.user.id, "signed up");
        Ok(self.remember(grant.user))
    }

    /// Sign in and keep the token for later requests.
    ///
    /// # Errors
    ///
    /// Returns `AuthServiceError::Storage` with `StorageError::Unauthorized` for
    /// wrong credentials and `StorageError::Forbidden` for a deactivated account.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthServiceError> {
        let grant = self.identity.login(credentials).await?;
        self.tokens.set(&grant.token);
        info!(user_id = %grant.user.id, role = ?grant.user.role, "logged in");
        Ok(self.remember(grant.user))
    }

    /// Resolve the stored token to a user.
    ///
    /// Returns `Ok(None)` when there is no token or the backend rejects it, in
    /// which case the token is dropped.
    ///
    /// # Errors
    ///
    /// Returns `AuthServiceError::Storage` for failures other than a rejected token.
    pub async fn check_auth(&self) -> Result<Option<User>, AuthServiceError> {
        let Some(token) = self.tokens.get() else {
            *self.slot() = None;
            return Ok(None);
        };

        match self.identity.check_auth(&token).await {
            Ok(user) => Ok(Some(self.remember(user))),
            Err(StorageError::Unauthorized | StorageError::Forbidden) => {
                warn!("stored token rejected");
                self.logout();
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Forget the token and the current user.
    pub fn logout(&self) {
        self.tokens.clear();
        *self.slot() = None;
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.slot().clone()
    }

    /// The current user.
    ///
    /// # Errors
    ///
    /// Returns `AuthServiceError::NotAuthenticated` when nobody is signed in.
    pub fn require_user(&self) -> Result<User, AuthServiceError> {
        self.current_user().ok_or(AuthServiceError::NotAuthenticated)
    }

    /// The current user, who must be an admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthServiceError::NotAuthenticated` when nobody is signed in and
    /// `AuthServiceError::Forbidden` for a regular user.
    pub fn require_admin(&self) -> Result<User, AuthServiceError> {
        let user = self.require_user()?;
        if !user.is_admin() {
            return Err(AuthServiceError::Forbidden);
        }
        Ok(user)
    }

    fn remember(&self, user: User) -> User {
        *self.slot() = Some(user.clone());
        user
    }

    fn slot(&self) -> MutexGuard<'_, Option<User>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// User management for admins.
#[derive(Clone)]
pub struct AdminService {
    auth: AuthService,
    identity: Arc<dyn IdentityProvider>,
}

impl AdminService {
    #[must_use]
    pub fn new(auth: AuthService, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { auth, identity }
    }

    /// # Errors
    ///
    /// Returns `AuthServiceError::Forbidden` for non-admins and
    /// `AuthServiceError::Storage` if the listing fails.
    pub async fn list_users(&self) -> Result<Vec<User>, AuthServiceError> {
        self.auth.require_admin()?;
        Ok(self.identity.list_users().await?)
    }

    /// Create an account on someone else's behalf.
    ///
    /// # Errors
    ///
    /// Returns `AuthServiceError::Forbidden` for non-admins,
    /// `AuthServiceError::User` for invalid input and
    /// `AuthServiceError::Storage` if the backend refuses it.
    pub async fn create_user(&self, draft: SignupDraft) -> Result<User, AuthServiceError> {
        self.auth.require_admin()?;
        let draft = draft.validate()?;
        let user = self.identity.create_user(&draft).await?;
        info!(user_id = %user.id, role = ?user.role, "user created");
        Ok(user)
    }

    /// Flip a user's active flag and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `AuthServiceError::Forbidden` for non-admins,
    /// `AuthServiceError::OwnAccount` when targeting oneself and
    /// `AuthServiceError::Storage` if the backend refuses it.
    pub async fn toggle_user_status(&self, id: &UserId) -> Result<bool, AuthServiceError> {
        self.guard_other(id)?;
        let is_active = self.identity.toggle_user_status(id).await?;
        info!(user_id = %id, is_active, "user status toggled");
        Ok(is_active)
    }

    /// # Errors
    ///
    /// Returns `AuthServiceError::Forbidden` for non-admins,
    /// `AuthServiceError::OwnAccount` when targeting oneself and
    /// `AuthServiceError::Storage` if the backend refuses it.
    pub async fn delete_user(&self, id: &UserId) -> Result<(), AuthServiceError> {
        self.guard_other(id)?;
        self.identity.delete_user(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    fn guard_other(&self, id: &UserId) -> Result<(), AuthServiceError> {
        let admin = self.auth.require_admin()?;
        if &admin.id == id {
            return Err(AuthServiceError::OwnAccount);
        }
        Ok(())
    }
}
