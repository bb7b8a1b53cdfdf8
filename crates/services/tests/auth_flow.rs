use flash_core::model::{Credentials, Role, SignupDraft, UserError};
use services::{AppServices, AuthServiceError, Clock};
use storage::{Storage, StorageError};
use storage::repository::InMemoryRepository;

fn services() -> (AppServices, Storage) {
    let storage = Storage::from_repository(&InMemoryRepository::new());
    (AppServices::new(&storage, Clock::default()), storage)
}

#[tokio::test]
async fn signup_login_and_logout() {
    let (services, storage) = services();
    let auth = services.auth();

    let user = auth
        .signup(SignupDraft::new("Lan Tran", "Lan@Example.com", "secret1"))
        .await
        .unwrap();
    assert_eq!(user.email, "lan@example.com");
    assert!(storage.tokens.get().is_some());
    assert_eq!(auth.check_auth().await.unwrap(), Some(user.clone()));

    auth.logout();
    assert!(storage.tokens.get().is_none());
    assert_eq!(auth.check_auth().await.unwrap(), None);

    let credentials = Credentials::new("lan@example.com", "secret1").unwrap();
    let again = auth.login(&credentials).await.unwrap();
    assert_eq!(again.id, user.id);
    assert_eq!(auth.current_user(), Some(user));
}

#[tokio::test]
async fn invalid_signup_never_reaches_backend() {
    let (services, _) = services();
    let err = services
        .auth()
        .signup(SignupDraft::new("Lan", "not-an-email", "secret1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::User(UserError::InvalidEmail)));
}

#[tokio::test]
async fn rejected_token_is_cleared() {
    let (services, storage) = services();
    storage.tokens.set("forged");

    assert_eq!(services.auth().check_auth().await.unwrap(), None);
    assert!(storage.tokens.get().is_none());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (services, _) = services();
    let auth = services.auth();
    auth.signup(SignupDraft::new("Lan", "lan@example.com", "secret1"))
        .await
        .unwrap();
    auth.logout();

    let credentials = Credentials::new("lan@example.com", "wrong-pass").unwrap();
    let err = auth.login(&credentials).await.unwrap_err();
    assert!(matches!(
        err,
        AuthServiceError::Storage(StorageError::Unauthorized)
    ));
    assert!(auth.require_user().is_err());
}

#[tokio::test]
async fn admin_manages_other_accounts_only() {
    let (services, _) = services();
    let auth = services.auth();
    let admin = services.admin();

    let root = auth
        .signup(SignupDraft::new("Root", "root@example.com", "secret1").with_role(Role::Admin))
        .await
        .unwrap();
    let student = admin
        .create_user(SignupDraft::new("Minh", "minh@example.com", "secret2"))
        .await
        .unwrap();
    assert_eq!(admin.list_users().await.unwrap().len(), 2);

    assert!(!admin.toggle_user_status(&student.id).await.unwrap());
    let err = admin.toggle_user_status(&root.id).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::OwnAccount));

    auth.logout();
    let blocked = Credentials::new("minh@example.com", "secret2").unwrap();
    let err = auth.login(&blocked).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::Storage(StorageError::Forbidden)));

    let root_login = Credentials::new("root@example.com", "secret1").unwrap();
    auth.login(&root_login).await.unwrap();
    admin.delete_user(&student.id).await.unwrap();
    assert_eq!(admin.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn regular_users_cannot_administer() {
    let (services, _) = services();
    services
        .auth()
        .signup(SignupDraft::new("Minh", "minh@example.com", "secret2"))
        .await
        .unwrap();

    let err = services.admin().list_users().await.unwrap_err();
    assert!(matches!(err, AuthServiceError::Forbidden));
}
