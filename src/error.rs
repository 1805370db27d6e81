use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the generation pipeline.
///
/// Missing assets and malformed label sidecars are hard failures: they
/// indicate a broken precondition or an upstream generation bug, never
/// transient bad input.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("no {kind} assets found under {} (fetch assets first)", .dir.display())]
    MissingAssets { kind: &'static str, dir: PathBuf },

    #[error("failed to load font {}", .0.display())]
    BadFont(PathBuf),

    #[error("malformed label line {line} in {}: {reason}", .path.display())]
    MalformedLabel {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("unknown shape label {0:?}")]
    UnknownShape(String),

    #[error("invalid config file: {0}")]
    Config(#[from] serde_json::Error),

    #[error("bad config value: {0}")]
    BadConfig(String),

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("training program exited with status {0}")]
    TrainerFailed(std::process::ExitStatus),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GenError>;
