//! Error types for the Kibana provider.
//!
//! [`DiffError`] covers everything that can go wrong while comparing two
//! stored values. It never escapes the suppression entry points: every
//! variant is folded into a "different" verdict. [`ProviderError`] is the
//! error surface of configuration and resource operations.

use thiserror::Error;

/// Reasons two documents could not be proven equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// The text is not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The two NDJSON documents hold a different number of records.
    #[error("Record count mismatch: {old} old record(s), {new} new record(s)")]
    Cardinality {
        /// Number of records on the old side.
        old: usize,
        /// Number of records on the new side.
        new: usize,
    },

    /// A record is not an object or has no string identity field.
    #[error("Record {index} has no string '{key}' field")]
    MissingIdentity {
        /// The identity key that was looked up.
        key: String,
        /// Zero-based position of the record in its sequence.
        index: usize,
    },

    /// Two records of the same sequence share an identity.
    #[error("Duplicate record identity: {id}")]
    DuplicateIdentity {
        /// The repeated identity value.
        id: String,
    },

    /// An old record has no counterpart in the new sequence.
    #[error("No new record matches identity: {id}")]
    UnmatchedIdentity {
        /// The identity value that found no match.
        id: String,
    },
}

impl DiffError {
    /// Whether this error comes from identity matching.
    pub fn is_identity_error(&self) -> bool {
        matches!(
            self,
            Self::MissingIdentity { .. }
                | Self::DuplicateIdentity { .. }
                | Self::UnmatchedIdentity { .. }
        )
    }
}

impl From<serde_json::Error> for DiffError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Errors that can occur in provider configuration and resource operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested object was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The Kibana server could not be reached or refused the call.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Invalid request from the caller.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Get the error message as a string.
    ///
    /// Returns a reference to the error message for any variant.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Unavailable(msg) => msg,
            Self::InvalidRequest(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_error_display() {
        let err = DiffError::Cardinality { old: 1, new: 2 };
        assert_eq!(
            format!("{}", err),
            "Record count mismatch: 1 old record(s), 2 new record(s)"
        );

        let err = DiffError::MissingIdentity {
            key: "id".to_string(),
            index: 3,
        };
        assert_eq!(format!("{}", err), "Record 3 has no string 'id' field");

        let err = DiffError::UnmatchedIdentity {
            id: "x".to_string(),
        };
        assert_eq!(format!("{}", err), "No new record matches identity: x");
    }

    #[test]
    fn test_identity_classification() {
        assert!(DiffError::DuplicateIdentity { id: "a".into() }.is_identity_error());
        assert!(DiffError::UnmatchedIdentity { id: "a".into() }.is_identity_error());
        assert!(!DiffError::Parse("eof".into()).is_identity_error());
        assert!(!DiffError::Cardinality { old: 0, new: 1 }.is_identity_error());
    }

    #[test]
    fn test_parse_error_from_serde() {
        let err: DiffError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, DiffError::Parse(_)));
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::NotFound("dashboard-1".to_string());
        assert_eq!(format!("{}", err), "Resource not found: dashboard-1");

        let err = ProviderError::Configuration("missing url".to_string());
        assert_eq!(format!("{}", err), "Configuration error: missing url");

        let err = ProviderError::UnknownResource("kibana_alert".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: kibana_alert");
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Unavailable("connection refused".to_string());
        assert_eq!(err.message(), "connection refused");

        let err = ProviderError::InvalidRequest("bad request".to_string());
        assert_eq!(err.message(), "bad request");
    }
}
