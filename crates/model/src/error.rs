use std::fmt::{self, Display};

/// The kind of error that occurred while running a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend answered with a non-success status.
    Transport,
    /// The backend answered without the expected stream.
    Protocol,
    /// The turn was cancelled by the user.
    Cancelled,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "Transport error"),
            ErrorKind::Protocol => write!(f, "Protocol error"),
            ErrorKind::Cancelled => write!(f, "Cancelled"),
            ErrorKind::Other => write!(f, "Other error"),
        }
    }
}
