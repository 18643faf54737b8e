//! Error types for AtlasFS

use thiserror::Error;

/// Error taxonomy shared by the naming and storage servers.
///
/// Every kind carries a human-readable message and knows its wire
/// representation: the Java-style `exception_type` tag and the HTTP status
/// the servers answer with. None of these terminate a server; they all
/// surface as structured 4xx responses.
#[derive(Debug, Error)]
pub enum DfsError {
    /// Malformed input, most commonly an empty path.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// The path, a required ancestor, or the expected kind of node is absent.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A registration collided with an existing one.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The operation needs storage capacity that is not registered.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A read or write range falls outside the file.
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(String),

    /// The disk refused an operation for a reason other than absence.
    #[error("i/o failure: {0}")]
    Io(String),
}

impl DfsError {
    /// The `exception_type` tag this kind serializes as.
    pub fn exception_type(&self) -> &'static str {
        match self {
            DfsError::IllegalArgument(_) => "IllegalArgumentException",
            DfsError::FileNotFound(_) => "FileNotFoundException",
            DfsError::Conflict(_) | DfsError::IllegalState(_) => "IllegalStateException",
            DfsError::IndexOutOfBounds(_) => "IndexOutOfBoundsException",
            DfsError::Io(_) => "IOException",
        }
    }

    /// The HTTP status this kind is answered with.
    ///
    /// Conflict-class errors are 409; everything else is 404, including
    /// IllegalArgument (the wire predates this implementation).
    pub fn http_status(&self) -> u16 {
        match self {
            DfsError::Conflict(_) | DfsError::IllegalState(_) => 409,
            _ => 404,
        }
    }

    /// The message carried in `exception_info`.
    pub fn info(&self) -> &str {
        match self {
            DfsError::IllegalArgument(msg)
            | DfsError::FileNotFound(msg)
            | DfsError::Conflict(msg)
            | DfsError::IllegalState(msg)
            | DfsError::IndexOutOfBounds(msg)
            | DfsError::Io(msg) => msg,
        }
    }
}

impl From<std::io::Error> for DfsError {
    /// Classifies disk errors at the boundary: absence is FileNotFound,
    /// anything else is an I/O failure.
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => {
                DfsError::FileNotFound("the file or directory does not exist.".to_string())
            }
            _ => DfsError::Io(err.to_string()),
        }
    }
}

/// Failures talking to a storage node.
///
/// These never cross the HTTP surface; callers either swallow them
/// (replication and invalidation are best-effort) or translate them into a
/// [`DfsError`] at the call site.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request never produced a response.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The node answered with a structured exception.
    #[error("storage node returned {exception_type}: {exception_info}")]
    Remote {
        exception_type: String,
        exception_info: String,
    },

    /// The response arrived but could not be interpreted.
    #[error("invalid payload from {url}: {message}")]
    Payload { url: String, message: String },
}

/// Result type alias for AtlasFS operations
pub type DfsResult<T> = Result<T, DfsError>;
