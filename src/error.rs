use thiserror::Error;

/// Rejected settings or scenario values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f32,
    },
    #[error("boid settings need at least one state")]
    NoStates,
    #[error("state `{0}` has no rules")]
    EmptyState(String),
    #[error("system `{system}` targets unknown system {target}")]
    UnknownTarget { system: String, target: usize },
    #[error("rule `{rule}` references unknown object {object}")]
    UnknownObject { rule: String, object: usize },
    #[error("collider or effector references unknown object {0}")]
    DanglingObject(usize),
}

/// Failures while reading or writing scenarios and snapshots.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot encoding failed: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("scenario parse failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PersistError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
