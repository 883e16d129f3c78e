//! Error types for action registration.

use thiserror::Error;

/// Registration and configuration errors.
///
/// A failed lookup is not an error: lookups return `None`.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The path pattern contains invalid macro syntax.
    #[error("malformed path pattern '{pattern}': {reason}")]
    MalformedPattern {
        /// The pattern as declared.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The same method and pattern were registered twice.
    #[error("duplicate route: {method} {pattern}")]
    DuplicateRoute {
        /// HTTP method, or `*` for method-agnostic routes.
        method: String,
        /// The pattern as declared.
        pattern: String,
    },

    /// The alias is already bound to another pattern.
    #[error("duplicate alias '{alias}' (already bound to {pattern})")]
    DuplicateAlias {
        /// The rejected alias.
        alias: String,
        /// The pattern the alias already points to.
        pattern: String,
    },

    /// A mutation was attempted after the registry started serving.
    #[error("action registry is closed for registration")]
    RegistryClosed,

    /// Conflicting registrations were rejected and the configuration
    /// requires a clean startup.
    #[error("startup aborted after {conflicts} conflicting registration(s)")]
    StartupAborted {
        /// Number of rejected registrations.
        conflicts: usize,
    },

    /// The router configuration could not be parsed.
    #[error("invalid router configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl RouterError {
    pub(crate) fn malformed(pattern: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for registration operations.
pub type Result<T> = std::result::Result<T, RouterError>;
