use thiserror::Error;

/// Failure to obtain the food reference data.
///
/// Cloneable so a single failed load can be handed to every caller that was
/// waiting on it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("food data unavailable from {origin}: {reason}")]
    DataUnavailable { origin: String, reason: String },
}

impl StoreError {
    pub fn unavailable(origin: impl Into<String>, reason: impl ToString) -> Self {
        StoreError::DataUnavailable {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

/// Brace text the annotation parser matched but could not classify.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("malformed ingredient annotation '{raw}': {reason}")]
    MalformedAnnotation { raw: String, reason: &'static str },
}

/// Rejected `day-meal-version[=servings]` selection text.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MealKeyError {
    #[error("meal key '{0}' must look like day-meal-version")]
    Format(String),
    #[error("unknown day '{0}'")]
    UnknownDay(String),
    #[error("unknown meal '{0}'")]
    UnknownMeal(String),
    #[error("unknown meal version {0}")]
    UnknownVersion(u32),
    #[error("invalid serving count '{0}'")]
    ServingCount(String),
}
