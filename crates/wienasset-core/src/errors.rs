//! Error types shared across the workspace

use thiserror::Error;

/// Core errors raised outside transaction assembly
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Broad class of a failed build, used by callers to decide what to change
/// before trying again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// A required argument is missing or malformed
    Validation,
    /// Amounts exceed holdings or the payload cannot fit
    Capacity,
    /// Not enough currency or asset units among the candidates
    Funding,
    /// Reuse of a spent output or colored value spent as plain currency
    Integrity,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Capacity => "capacity",
            Self::Funding => "funding",
            Self::Integrity => "integrity",
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_class_names() {
        assert_eq!(ErrorClass::Validation.as_str(), "validation");
        assert_eq!(ErrorClass::Integrity.as_str(), "integrity");
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: Error = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
