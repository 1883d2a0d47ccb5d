//! Client-side errors of the realtime channel client.

/// Why a realtime session ended or a command could not be sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Connecting or sending failed at the transport level.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The server stopped answering keepalives or dropped the socket.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The server sent something the client did not expect, such as a
    /// rejected `auth`.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error;
        match err {
            Error::ConnectionClosed | Error::AlreadyClosed => Self::ConnectionLost(err.to_string()),
            Error::Protocol(_) | Error::Capacity(_) => {
                Self::Protocol(err.to_string())
            }
            other => Self::NetworkError(other.to_string()),
        }
    }
}
