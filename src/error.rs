use std::time::Duration;

/// Encoding-level decode failure. Shape mismatches (missing `ts`/`value`)
/// are tolerated by the decoder and are not errors.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not a JSON document: {0}")]
    InvalidEncoding(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("store write timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("bus connection lost: {0}")]
    Disconnected(#[from] rumqttc::ConnectionError),
}
