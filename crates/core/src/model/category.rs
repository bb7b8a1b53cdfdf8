use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::CategoryId;

/// Accent color used when a category is created without one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CategoryError {
    #[error("category name cannot be empty")]
    EmptyName,

    #[error("invalid color {0:?}, expected #RRGGBB")]
    InvalidColor(String),
}

/// A named grouping of flashcards.
///
/// Default categories are provisioned by the backend for every user; the rest
/// are user-created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub color: String,
    pub is_default: bool,
    pub flashcard_count: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
}

/// User input for creating or replacing a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub description: String,
    pub color: Option<String>,
}

impl CategoryDraft {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            color: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Trim fields, fill the default color, and validate.
    ///
    /// # Errors
    ///
    /// Returns `CategoryError::EmptyName` for a blank name and
    /// `CategoryError::InvalidColor` for anything but `#RRGGBB`.
    pub fn validate(self) -> Result<Self, CategoryError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }

        let color = match self.color {
            Some(color) => {
                let color = color.trim().to_owned();
                if !is_hex_color(&color) {
                    return Err(CategoryError::InvalidColor(color));
                }
                color
            }
            None => DEFAULT_CATEGORY_COLOR.to_owned(),
        };

        Ok(Self {
            name,
            description: self.description.trim().to_owned(),
            color: Some(color),
        })
    }

    #[must_use]
    pub fn into_category(self, id: CategoryId, created_at: DateTime<Utc>) -> Category {
        Category {
            id,
            name: self.name,
            description: self.description,
            color: self
                .color
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_owned()),
            is_default: false,
            flashcard_count: Some(0),
            created_at: Some(created_at),
        }
    }
}

fn is_hex_color(raw: &str) -> bool {
    raw.len() == 7
        && raw.starts_with('#')
        && raw[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_fills_default_color() {
        let draft = CategoryDraft::new("  Emotions ").validate().unwrap();
        assert_eq!(draft.name, "Emotions");
        assert_eq!(draft.color.as_deref(), Some(DEFAULT_CATEGORY_COLOR));
    }

    #[test]
    fn draft_rejects_blank_name() {
        let err = CategoryDraft::new(" ").validate().unwrap_err();
        assert_eq!(err, CategoryError::EmptyName);
    }

    #[test]
    fn draft_rejects_bad_color() {
        let err = CategoryDraft::new("Food")
            .with_color("blue")
            .validate()
            .unwrap_err();
        assert_eq!(err, CategoryError::InvalidColor("blue".into()));

        assert!(CategoryDraft::new("Food").with_color("#10b981").validate().is_ok());
    }
}
