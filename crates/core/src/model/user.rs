use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

/// Shortest password the backend accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("all fields are required")]
    MissingField,

    #[error("invalid email format")]
    InvalidEmail,

    #[error("password must be at least 6 characters")]
    PasswordTooShort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Authenticated account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub profile_picture: Option<String>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Normalize and check the credentials are present.
    ///
    /// # Errors
    ///
    /// Returns `UserError::MissingField` when email or password is blank.
    pub fn new(email: &str, password: impl Into<String>) -> Result<Self, UserError> {
        let email = normalize_email(email);
        let password = password.into();
        if email.is_empty() || password.is_empty() {
            return Err(UserError::MissingField);
        }
        Ok(Self { email, password })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Registration form; also used by admins creating accounts.
#[derive(Clone, PartialEq, Eq)]
pub struct SignupDraft {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl SignupDraft {
    #[must_use]
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            password: password.into(),
            role: Role::User,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Apply the same checks the backend enforces on signup.
    ///
    /// # Errors
    ///
    /// Returns `UserError` for blank fields, a malformed email, or a short password.
    pub fn validate(self) -> Result<Self, UserError> {
        let full_name = self.full_name.trim().to_owned();
        let email = normalize_email(&self.email);
        if full_name.is_empty() || email.is_empty() || self.password.is_empty() {
            return Err(UserError::MissingField);
        }
        if !is_valid_email(&email) {
            return Err(UserError::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(UserError::PasswordTooShort);
        }
        Ok(Self {
            full_name,
            email,
            password: self.password,
            role: self.role,
        })
    }
}

impl std::fmt::Debug for SignupDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupDraft")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// local@domain.tld with a TLD of at least two letters.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || ".-".contains(c));
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());
    local_ok && host_ok && tld_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_normalizes_email() {
        let draft = SignupDraft::new(" Ana ", " Ana@Example.COM ", "secret1")
            .validate()
            .unwrap();
        assert_eq!(draft.email, "ana@example.com");
        assert_eq!(draft.full_name, "Ana");
        assert_eq!(draft.role, Role::User);
    }

    #[test]
    fn signup_rejects_bad_input() {
        let missing = SignupDraft::new("", "a@b.co", "secret1").validate();
        assert_eq!(missing.unwrap_err(), UserError::MissingField);

        let email = SignupDraft::new("Ana", "ana@localhost", "secret1").validate();
        assert_eq!(email.unwrap_err(), UserError::InvalidEmail);

        let short = SignupDraft::new("Ana", "ana@example.com", "12345").validate();
        assert_eq!(short.unwrap_err(), UserError::PasswordTooShort);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("a@b.co", "hunter22").unwrap();
        assert!(!format!("{creds:?}").contains("hunter22"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
