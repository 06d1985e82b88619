use std::error::Error;
use std::fmt::{Display, Formatter};

pub type IpcResult<T> = Result<T, IpcError>;

/// Failure of one host round-trip or of its response contract.
#[derive(Debug)]
pub enum IpcError {
    /// Host answered with a non-null error message.
    Remote(String),
    /// Response envelope or mutation ack does not have the agreed shape.
    MalformedResponse(String),
    /// The call primitive itself failed before any response was produced.
    Transport(String),
    /// Response payload does not decode into the requested model.
    Decode(serde_json::Error),
}

impl Display for IpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(message) => write!(f, "remote operation failed: {message}"),
            Self::MalformedResponse(details) => write!(f, "malformed response: {details}"),
            Self::Transport(message) => write!(f, "transport failure: {message}"),
            Self::Decode(err) => write!(f, "response decode failed: {err}"),
        }
    }
}

impl Error for IpcError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Remote(_) | Self::MalformedResponse(_) | Self::Transport(_) => None,
        }
    }
}

impl From<serde_json::Error> for IpcError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}
