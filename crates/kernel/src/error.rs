//! Taxonomy error types.

use thiserror::Error;

/// Errors surfaced by the tag registry and category lifecycle operations.
///
/// `NotFound`, `DuplicateKey`, and `InvalidMerge` are caller errors and are
/// returned to the admin UI verbatim. `Storage` aborts the enclosing
/// transaction; prior state is left intact and callers may retry.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("tag or category not found")]
    NotFound,

    #[error("a tag with value `{value}` already exists in category `{category}`")]
    DuplicateKey { category: String, value: String },

    #[error("invalid merge: {0}")]
    InvalidMerge(String),

    #[error("storage error")]
    Storage(#[from] sqlx::Error),
}

impl TaxonomyError {
    /// Map a storage error to `DuplicateKey` when it is a unique-constraint
    /// violation on the given `(category, value)` pair.
    pub fn on_unique_violation(err: sqlx::Error, category: &str, value: &str) -> Self {
        let is_unique = err
            .as_database_error()
            .is_some_and(|db| matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation));

        if is_unique {
            TaxonomyError::DuplicateKey {
                category: category.to_string(),
                value: value.to_string(),
            }
        } else {
            TaxonomyError::Storage(err)
        }
    }
}

/// Result type alias using TaxonomyError.
pub type TaxonomyResult<T> = Result<T, TaxonomyError>;
