use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum PetError {
    #[error("Capture Error: {0}")]
    Capture(#[from] CaptureError),
    #[error("Perception Error: {0}")]
    Perception(#[from] PerceptionError),
    #[error("Config Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("UI Error: {0}")]
    Ui(String),
}

// Capture Error Type
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to enumerate displays: {0}")]
    Enumerate(String),
    #[error("No displays available")]
    NoDisplays,
    #[error("Failed to grab display {1}: {0}")]
    Grab(String, usize),
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Failed to persist debug snapshot: {0}")]
    DebugSink(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PerceptionError {
    #[error("Inference request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Inference endpoint returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("Response contained no message content")]
    EmptyResponse,
    #[error("Failed to parse analysis: {0}")]
    Malformed(String),
}
