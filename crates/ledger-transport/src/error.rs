use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failure: {0}")]
    ConnectionFailed(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("server reported an error: {code}: {message}")]
    ServerError { code: String, message: String },

    #[error("connection closed while a request was in flight")]
    ConnectionClosed,

    #[error("not connected to group")]
    NotConnected,
}
