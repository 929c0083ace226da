//! S3 ETag model.
//!
//! An ETag is either the MD5 of the whole object (`<md5>`) or, for multipart
//! uploads, the MD5 of the concatenated raw part digests followed by the part
//! count (`<md5>-<parts>`), e.g. `1d066c8a194f8f00b833ecc50d699cd9-996`.

use crate::error::VerifyError;
use std::fmt;
use std::str::FromStr;

/// Raw MD5 digest length in bytes.
pub const DIGEST_LEN: usize = 16;

/// A parsed or locally computed ETag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ETag {
    digest: [u8; DIGEST_LEN],
    chunk_count: u32,
}

impl ETag {
    /// Plain (single-part) ETag.
    pub fn single(digest: [u8; DIGEST_LEN]) -> Self {
        Self {
            digest,
            chunk_count: 0,
        }
    }

    /// Multipart ETag. A `chunk_count` of zero yields a plain ETag.
    pub fn multipart(digest: [u8; DIGEST_LEN], chunk_count: u32) -> Self {
        Self {
            digest,
            chunk_count,
        }
    }

    /// Parse a token as returned by the storage API, quoted or not.
    pub fn parse(raw: &str) -> Result<Self, VerifyError> {
        let value = raw.trim().trim_matches('"');
        let parts: Vec<&str> = value.split('-').collect();

        let digest = parse_digest(parts[0])?;
        match parts.len() {
            1 => Ok(Self::single(digest)),
            2 => Ok(Self::multipart(digest, parse_chunk_count(parts[1])?)),
            n => Err(VerifyError::TooManyComponents(n)),
        }
    }

    pub fn is_chunked(&self) -> bool {
        self.chunk_count > 0
    }

    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Lowercase hex form of the digest part.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

fn parse_digest(s: &str) -> Result<[u8; DIGEST_LEN], VerifyError> {
    let mut digest = [0u8; DIGEST_LEN];
    if s.len() != DIGEST_LEN * 2 || hex::decode_to_slice(s, &mut digest).is_err() {
        return Err(VerifyError::MalformedDigest(s.to_string()));
    }
    Ok(digest)
}

fn parse_chunk_count(s: &str) -> Result<u32, VerifyError> {
    // u32::from_str would also take a leading '+'
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VerifyError::InvalidChunkCount(s.to_string()));
    }
    s.parse()
        .map_err(|_| VerifyError::InvalidChunkCount(s.to_string()))
}

impl FromStr for ETag {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_chunked() {
            write!(f, "{}-{}", self.digest_hex(), self.chunk_count)
        } else {
            f.write_str(&self.digest_hex())
        }
    }
}
