use thiserror::Error;

/// Why a domain entity was rejected.
///
/// Every variant names the offending field so a dropped record can be
/// audited with a reason a human can act on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    Missing(&'static str),

    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("malformed record: {0}")]
    Malformed(String),
}

impl ValidationError {
    pub(crate) fn out_of_range(
        field: &'static str,
        value: impl ToString,
        expected: &'static str,
    ) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
