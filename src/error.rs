#![allow(dead_code)]

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Coarse error class, for callers that only need to pick an HTTP status
/// or a retry policy rather than match on the specific variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Store,
    Cancelled,
}

/// Unified error type for the lease/payment lifecycle engine.
///
/// The four conflict variants are kept distinct (rather than nested under
/// a single `Conflict(String)`) so callers can match exhaustively and
/// surface a specific remediation per case.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unit unavailable: {0}")]
    UnitUnavailable(String),

    #[error("tenant has active lease: {0}")]
    TenantHasActiveLease(String),

    #[error("lease not renewable: {0}")]
    LeaseNotRenewable(String),

    #[error("payment not payable: {0}")]
    PaymentNotPayable(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::UnitUnavailable(_)
            | AppError::TenantHasActiveLease(_)
            | AppError::LeaseNotRenewable(_)
            | AppError::PaymentNotPayable(_) => ErrorKind::Conflict,
            AppError::StoreError(_) => ErrorKind::Store,
            AppError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }
}

/// Checked at every I/O boundary of the repository and service layers.
/// Returns `Err(AppError::Cancelled)` once `cancel` has been triggered,
/// by an explicit stop request or by cancellation of the caller's
/// context.
pub fn check_cancelled(cancel: &CancellationToken) -> AppResult<()> {
    if cancel.is_cancelled() {
        Err(AppError::Cancelled)
    } else {
        Ok(())
    }
}

/// Maps a low-level `sqlx` failure onto the taxonomy above, logging the
/// underlying error before it is discarded.
pub fn map_db_error(error: sqlx::Error) -> AppError {
    tracing::error!(db_error = %error, "database operation failed");
    match &error {
        sqlx::Error::RowNotFound => AppError::NotFound("record not found".to_string()),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AppError::ValidationError("duplicate value violates a unique constraint".to_string())
        }
        _ => AppError::StoreError("database operation failed".to_string()),
    }
}

pub type AppResult<T> = Result<T, AppError>;
