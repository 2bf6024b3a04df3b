use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Event API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode event page: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

#[derive(Error, Debug)]
pub enum ScrollError {
    #[error("Scroll transition failed: {0}")]
    Hook(#[from] anyhow::Error),

    #[error("Transition queue is closed")]
    QueueClosed,
}
