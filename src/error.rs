use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Job root does not exist: {0}")]
    RootNotFound(String),

    #[error("Job root is not a directory: {0}")]
    NotADirectory(String),

    #[error("Cannot list directory {path}: {source}")]
    ListDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot read script {path}: {source}")]
    ReadScript {
        path: String,
        source: std::io::Error,
    },

    #[error("Task '{0}' has no script content")]
    MissingScript(String),

    #[error("No backend command configured")]
    NoBackend,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Invalid parameter '{0}', expected KEY=VALUE")]
    InvalidParam(String),
}

pub type Result<T> = std::result::Result<T, Error>;
