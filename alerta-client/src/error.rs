use alerta_model::{ModelError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a non-success HTTP status.
    #[error("Request failed with HTTP {status_code}: {body}")]
    Transport { status_code: u16, body: String },

    /// The response envelope reported `"status": "error"`.
    #[error("{message}")]
    Service { message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Response is missing \"{0}\"")]
    MissingField(&'static str),
}

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        Self::Model(err.into())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Model(err.into())
    }
}
