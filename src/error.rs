use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by a cache invocation
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid flags or arguments. Raised before any side effect.
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more cached variables could not be read back.
    #[error(
        "The following variables could not be loaded from the cache at '{}': {}",
        .path.display(),
        .names.join(", ")
    )]
    MissingVariables { path: PathBuf, names: Vec<String> },

    /// The cell ran but did not define every variable it promised.
    #[error(
        "Variable(s) {} could not be found in the interactive namespace",
        quoted(.names)
    )]
    MissingNamespaceVariable { names: Vec<String> },

    /// The cell itself failed; the host's error is passed through untouched.
    #[error(transparent)]
    Execution(anyhow::Error),

    #[error("Failed to save variable '{name}' to '{}'", .path.display())]
    Save {
        name: String,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("An output capture is already active on this console")]
    CaptureActive,
}

impl CacheError {
    /// Names carried by the missing-variable kinds, empty otherwise
    pub fn missing_names(&self) -> &[String] {
        match self {
            CacheError::MissingVariables { names, .. }
            | CacheError::MissingNamespaceVariable { names } => names,
            _ => &[],
        }
    }
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}
