//! Service error taxonomy.
//!
//! Four categories cover every failure the service surfaces: bad input,
//! missing entities, natural-key races, and store failures. Cache and audit
//! failures are absorbed where they occur and never reach this type.

use sea_orm::DbErr;
use std::fmt;

#[derive(Debug)]
pub enum ServiceError {
    /// Bad or missing input; the caller can fix the request.
    Validation(String),
    /// Flag, feature, or promotion source absent (or owned by another tenant).
    NotFound(String),
    /// Concurrent upsert lost the natural-key race.
    Conflict(String),
    /// Underlying store failure. Details are logged, not surfaced.
    Database(DbErr),
}

impl ServiceError {
    /// Stable category identifier included in error responses.
    pub fn category(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Database(_) => "internal_error",
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation(msg) => write!(f, "{}", msg),
            ServiceError::NotFound(msg) => write!(f, "{}", msg),
            ServiceError::Conflict(msg) => write!(f, "{}", msg),
            // Store error codes stay in the internal log.
            ServiceError::Database(_) => write!(f, "An internal error occurred."),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        // A unique-violation on the (tenant, feature, environment) key means
        // a concurrent writer won the race for the same triple.
        let msg = err.to_string();
        if msg.contains("duplicate key") || msg.contains("unique constraint") {
            ServiceError::Conflict(
                "A concurrent change to the same flag was committed first.".to_string(),
            )
        } else {
            ServiceError::Database(err)
        }
    }
}
