use thiserror::Error;

/// Errors reported by the tracking core. Every variant is recoverable: operations
/// that fail leave the tracker, the category registry, and the affected application
/// untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("no running process found for '{0}'")]
    ProcessNotFound(String),

    #[error("application '{0}' was never added to the tracker")]
    ApplicationNotFound(String),

    #[error("invalid category name '{0}': must be 1-50 characters and not all whitespace")]
    InvalidCategoryName(String),

    #[error("category '{0}' is not registered")]
    CategoryNotFound(String),
}
