use thiserror::Error;

use crate::model::{CategoryError, FlashcardError, ParseDifficultyError, UserError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Flashcard(#[from] FlashcardError),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Difficulty(#[from] ParseDifficultyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryDraft, Difficulty};

    fn parse_level(raw: &str) -> Result<Difficulty, Error> {
        Ok(raw.parse::<Difficulty>()?)
    }

    #[test]
    fn model_errors_convert() {
        let err: Error = CategoryDraft::new("").validate().unwrap_err().into();
        assert!(matches!(err, Error::Category(CategoryError::EmptyName)));

        let err = parse_level("extreme").unwrap_err();
        assert!(matches!(err, Error::Difficulty(_)));
        assert!(err.to_string().contains("extreme"));
    }
}
