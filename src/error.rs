use thiserror::Error;

/// Errors raised by persistence and export paths. Simulation itself never fails.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("GIF encoding failed: {0}")]
    Gif(#[from] gif::EncodingError),

    #[error("could not determine the user {0} directory")]
    NoDirectory(&'static str),

    #[error("image of {width}x{height} is too large for GIF (max 65535 per side)")]
    TooLarge { width: u32, height: u32 },

    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, FieldError>;
