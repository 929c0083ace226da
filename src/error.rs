use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a verification before a verdict is reached.
///
/// A checksum that simply differs is not an error: that outcome is a
/// completed [`crate::Verification`] with `is_valid == false`.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The digest part of the token is not 32 hex characters
    #[error("md5 part of ETag failed validation: {0:?}")]
    MalformedDigest(String),

    /// The token split into more than `<digest>-<count>`
    #[error("the ETag split into too many parts; expected at most 2, got {0}")]
    TooManyComponents(usize),

    /// The suffix after the dash is not a non-negative integer
    #[error("failed to parse ETag chunk count: {0:?}")]
    InvalidChunkCount(String),

    #[error("failed to open {path:?} for reading: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file ended before a chunk was fully read
    #[error("short read on chunk {index}: expected {expected} bytes, got {actual}")]
    ShortRead {
        index: u32,
        expected: u64,
        actual: u64,
    },

    /// The local file cannot have produced the remote chunk layout
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("aggregation incomplete: received {received} of {expected} chunk digests")]
    Incomplete { received: u32, expected: u32 },

    #[error("chunk {0} was reported twice or lies outside the plan")]
    DuplicateChunk(u32),

    #[error("{0} thread panicked")]
    ThreadPanicked(String),

    /// The metadata collaborator could not produce the remote token
    #[error("failed to retrieve object metadata: {0}")]
    Source(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VerifyError {
    /// True for errors raised while parsing the remote token, before any hashing.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            VerifyError::MalformedDigest(_)
                | VerifyError::TooManyComponents(_)
                | VerifyError::InvalidChunkCount(_)
        )
    }
}
