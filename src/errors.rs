use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrLensError {
    #[error("Invalid dimension: {name} must be positive and finite, got {value}")]
    InvalidDimension { name: &'static str, value: f64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Permission not granted: {0}")]
    PermissionDenied(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Launch error: {0}")]
    Launch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Scan cancelled")]
    Cancelled,
}

pub type QrLensResult<T> = Result<T, QrLensError>;
