//! Error types for the recipe session engine.
//!
//! Only caller mistakes surface here. Orphaned comments are a data-quality
//! condition handled by the tree builder, and a failed completion chime is
//! logged and swallowed by the timer manager.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Serving count that is zero, negative or not a number
    #[error("servings must be a positive whole number, got {0:?}")]
    InvalidServings(String),

    /// Timer duration that would not yield at least one second
    #[error("timer duration for step {step} must be positive, got {minutes} minutes")]
    InvalidDuration { step: u32, minutes: f64 },

    /// Step with no timer attached in the loaded recipe
    #[error("step {0} has no timer")]
    UnknownStep(u32),

    #[error("no recipe is loaded")]
    NoRecipeLoaded,

    /// Recipe snapshot rejected at load time
    #[error("invalid recipe data: {0}")]
    InvalidRecipe(String),

    #[error("comment content cannot be empty")]
    EmptyComment,

    /// Reply target missing from the current comment list
    #[error("comment {0} not found")]
    UnknownComment(i64),

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),

    #[error("ingredient {0:?} is not part of this recipe")]
    UnknownIngredient(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
