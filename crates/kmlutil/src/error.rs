use kmlutil_lib::KmlError;

/// Errors that end a run
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Kml(#[from] KmlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
