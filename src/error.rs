use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeprintError {
    #[error("Malformed model definition at node '{node}': {reason}")]
    ModelLoad { node: String, reason: String },

    #[error("Invalid constraints: {0}")]
    Validation(String),

    #[error(
        "No identity satisfying the given constraints could be generated. \
         Relax or change some of the requirements you specified."
    )]
    StrictGeneration,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, ForgeprintError>;
