use crate::time::TimeField;

/// A domain object could not be built from the values given to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing mandatory value for \"{0}\"")]
    MissingField(&'static str),

    #[error("Attribute keys must not contain \".\" or \"$\": {0:?}")]
    ReservedAttributeKey(String),

    #[error("Could not parse date time string for {field}: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Unknown date format {0}")]
    UnknownTimeStyle(String),

    #[error("Attribute {0} not a date")]
    NotATimestamp(String),

    #[error("Attribute {0} has no value")]
    TimestampNotSet(TimeField),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Could not parse payload: {0}")]
    Parse(#[from] serde_json::Error),
}
