use std::io;
use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the proxy core.
///
/// Every kind carries a signed outcome code (see [`Error::code`]) because the
/// action interpreter reports failures as negative outcomes to its caller
/// while the sequence keeps running.
#[derive(Error, Debug)]
pub enum Error {
    /// Internal defect: a contract the route compiler must uphold was broken
    #[error("BUG: {0}")]
    Bug(String),

    /// Name resolution failed for a forwarding target
    #[error("cannot resolve address: {0}")]
    BadAddress(String),

    /// A bounded buffer would overflow
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// Malformed SIP URI
    #[error("invalid SIP URI: {0}")]
    InvalidUri(String),

    /// Malformed or missing message field
    #[error("{0}")]
    Unspecified(String),

    /// Route table misconfiguration
    #[error("configuration error: {0}")]
    Config(String),

    /// Input/output error on the send path
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a new Bug error
    pub fn bug<S: Into<String>>(msg: S) -> Self {
        Self::Bug(msg.into())
    }

    /// Create a new BadAddress error
    pub fn bad_address<S: Into<String>>(msg: S) -> Self {
        Self::BadAddress(msg.into())
    }

    /// Create a new Capacity error
    pub fn capacity<S: Into<String>>(msg: S) -> Self {
        Self::Capacity(msg.into())
    }

    /// Create a new InvalidUri error
    pub fn invalid_uri<S: Into<String>>(msg: S) -> Self {
        Self::InvalidUri(msg.into())
    }

    /// Create a new Unspecified error
    pub fn unspecified<S: Into<String>>(msg: S) -> Self {
        Self::Unspecified(msg.into())
    }

    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Signed outcome code reported to the action interpreter.
    ///
    /// Always negative; `0` is reserved for "stop the sequence" and positive
    /// values mean "continue".
    pub fn code(&self) -> i32 {
        match self {
            Error::Bug(_) => -1,
            Error::BadAddress(_) => -2,
            Error::Capacity(_) => -3,
            Error::InvalidUri(_) | Error::Unspecified(_) => -4,
            Error::Config(_) => -5,
            Error::Io(_) => -6,
        }
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Unspecified(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Unspecified(s)
    }
}
