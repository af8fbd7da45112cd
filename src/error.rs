use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum GadgetError {
    #[error("Gadget {gadget} is not bound to a gadget space")]
    Unbound { gadget: String },

    #[error("Gadget {gadget} is already bound to a gadget space")]
    AlreadyBound { gadget: String },

    #[error("No USB Device Controller (UDC) available")]
    NoUdcAvailable,

    #[error("Already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration {config} references undeclared function {function}")]
    UnknownFunction { config: String, function: String },

    #[error("No keyboard mapping for character {0:?}")]
    UnmappedChar(char),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GadgetError {
    /// Wrap an I/O error with the path it happened at.
    ///
    /// `AlreadyExists` is lifted into the control-surface conflict variant so
    /// callers can tell it apart from other host failures.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::AlreadyExists {
            GadgetError::AlreadyExists { path }
        } else {
            GadgetError::Io { path, source }
        }
    }

    /// Whether this is a control-surface conflict (a path that already exists)
    pub fn is_conflict(&self) -> bool {
        matches!(self, GadgetError::AlreadyExists { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GadgetError>;
