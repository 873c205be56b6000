use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Request failed after {attempts} attempt(s): {message}")]
    Network { attempts: u32, message: String },

    #[error("Remote returned 404 for user '{username}'.")]
    NotFound { username: String },

    #[error("No such user: '{username}'.")]
    NoSuchUser { username: String },

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    #[error("Failed to write {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AppError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Process exit code reported to the CI runner.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 1,
            Self::Network { .. } => 2,
            Self::NotFound { .. } | Self::NoSuchUser { .. } => 3,
            Self::MalformedResponse(_) => 4,
            Self::Filesystem { .. } => 5,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}
