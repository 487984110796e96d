#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    ConfigError(#[from] crate::config::ConfigError),

    #[error(transparent)]
    ClientError(#[from] alerta_client::ClientError),

    #[error(transparent)]
    ValidationError(#[from] alerta_model::ValidationError),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    StdIo(#[from] std::io::Error),

    #[error("Attribute must be given as KEY=VALUE: {0:?}")]
    InvalidAttribute(String),
}
