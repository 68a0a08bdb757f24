//! Convenience result type alias for voicetime.

use crate::error::AppError;

/// A specialized `Result` type for voicetime operations.
pub type AppResult<T> = Result<T, AppError>;
