use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory service unreachable: {0}")]
    Unreachable(String),

    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    #[error("Directory query failed: {0}")]
    Query(String),

    #[error("Host environment detection failed: {0}")]
    Detection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for DirectoryError {
    fn from(err: serde_json::Error) -> Self {
        DirectoryError::Parse(err.to_string())
    }
}
