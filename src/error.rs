use thiserror::Error;

#[derive(Error, Debug)]
pub enum JimakuError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Subtitle parsing failed: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Batch index {0} is out of range")]
    InvalidBatch(usize),
}

pub type Result<T> = std::result::Result<T, JimakuError>;
