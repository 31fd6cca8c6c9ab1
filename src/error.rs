// Error types shared by the arithmetic, hash, RSA and codec layers

use std::io;
use std::path::PathBuf;

/// Errors raised by the signing toolkit.
///
/// Lower layers never swallow these; callers decide how to report them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Text input that is not a number, or a number outside its domain
    /// (not prime, not greater than one).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A caller passed arguments that make the operation meaningless,
    /// e.g. an empty sampling range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A hash or signature outside `[0, n)`.
    #[error("{what} must be in [0, n), got {value} with n = {modulus}")]
    Range {
        what: &'static str,
        value: String,
        modulus: String,
    },

    /// No modular inverse exists.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// Malformed signed file.
    #[error("format error: {0}")]
    Format(String),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("file is in use by another process: {}", .0.display())]
    InUse(PathBuf),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for toolkit operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify an I/O failure on `path` into not-found / in-use where possible.
    pub fn from_io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.into()),
            io::ErrorKind::PermissionDenied | io::ErrorKind::WouldBlock => {
                Error::InUse(path.into())
            }
            _ => Error::Io(err),
        }
    }
}
