//! Shared types for the flag subsystem.

use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

/// Deployment stage a flag is scoped to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Environment::Dev),
            "staging" => Ok(Environment::Staging),
            "prod" => Ok(Environment::Prod),
            other => Err(ServiceError::Validation(format!(
                "Unknown environment '{}'. Expected one of: dev, staging, prod.",
                other
            ))),
        }
    }
}

/// Rollout strategy with its strategy-specific payload.
///
/// The stored representation is a strategy name plus an optional JSON value;
/// this type is the validated in-memory form. `User` is a recognized
/// strategy with no targeting data yet.
#[derive(Clone, Debug, PartialEq)]
pub enum Rollout {
    Boolean,
    Percentage { percentage: i64 },
    User,
}

pub const STRATEGY_BOOLEAN: &str = "BOOLEAN";
pub const STRATEGY_PERCENTAGE: &str = "PERCENTAGE";
pub const STRATEGY_USER: &str = "USER";

impl Rollout {
    /// Validate a strategy name and payload from an inbound upsert.
    ///
    /// Strict: unknown strategies are rejected, PERCENTAGE requires an
    /// integer `percentage` in 0..=100, and strategies without a payload
    /// reject one.
    pub fn from_parts(
        strategy: &str,
        strategy_value: Option<serde_json::Value>,
    ) -> Result<Self, ServiceError> {
        match strategy {
            STRATEGY_BOOLEAN | STRATEGY_USER => {
                if strategy_value.is_some() {
                    return Err(ServiceError::Validation(format!(
                        "Strategy {} does not take a strategy_value.",
                        strategy
                    )));
                }
                if strategy == STRATEGY_BOOLEAN {
                    Ok(Rollout::Boolean)
                } else {
                    Ok(Rollout::User)
                }
            }
            STRATEGY_PERCENTAGE => {
                let value = strategy_value.ok_or_else(|| {
                    ServiceError::Validation(
                        "Strategy PERCENTAGE requires a strategy_value with a 'percentage' field."
                            .to_string(),
                    )
                })?;
                let percentage = value
                    .get("percentage")
                    .and_then(|p| p.as_i64())
                    .ok_or_else(|| {
                        ServiceError::Validation(
                            "strategy_value.percentage must be an integer.".to_string(),
                        )
                    })?;
                if !(0..=100).contains(&percentage) {
                    return Err(ServiceError::Validation(
                        "strategy_value.percentage must be between 0 and 100.".to_string(),
                    ));
                }
                Ok(Rollout::Percentage { percentage })
            }
            other => Err(ServiceError::Validation(format!(
                "Unknown strategy '{}'. Expected one of: BOOLEAN, PERCENTAGE, USER.",
                other
            ))),
        }
    }

    /// Decode a stored strategy/payload pair.
    ///
    /// Lenient: stored rows are trusted to have passed the upsert boundary,
    /// so a missing or malformed percentage decodes to 0 rather than failing
    /// the read path.
    pub fn from_stored(strategy: &str, strategy_value: Option<&serde_json::Value>) -> Self {
        match strategy {
            STRATEGY_PERCENTAGE => {
                let percentage = strategy_value
                    .and_then(|v| v.get("percentage"))
                    .and_then(|p| p.as_i64())
                    .filter(|p| (0..=100).contains(p))
                    .unwrap_or(0);
                Rollout::Percentage { percentage }
            }
            STRATEGY_USER => Rollout::User,
            STRATEGY_BOOLEAN => Rollout::Boolean,
            other => {
                log::warn!("Unknown stored strategy '{}', treating as BOOLEAN", other);
                Rollout::Boolean
            }
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Rollout::Boolean => STRATEGY_BOOLEAN,
            Rollout::Percentage { .. } => STRATEGY_PERCENTAGE,
            Rollout::User => STRATEGY_USER,
        }
    }

    /// Stored payload for this rollout, if any.
    pub fn strategy_value(&self) -> Option<serde_json::Value> {
        match self {
            Rollout::Percentage { percentage } => Some(json!({ "percentage": percentage })),
            Rollout::Boolean | Rollout::User => None,
        }
    }
}

/// Where an evaluated page came from
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSource {
    Cache,
    Database,
}

/// One flag's final decision for this read
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedFlag {
    pub id: i32,
    pub feature: String,
    pub description: Option<String>,
    pub enabled: bool,
}

/// The cached payload for one (tenant, environment) key: the canonical
/// first page and the total row count it was built from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedFlagPage {
    pub items: Vec<EvaluatedFlag>,
    pub total: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

/// Evaluated flag page returned to callers
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlagPage {
    pub source: PageSource,
    pub items: Vec<EvaluatedFlag>,
    pub pagination: Pagination,
}
