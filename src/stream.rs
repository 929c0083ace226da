use crate::chunk::{finalize, MIB};
use crate::error::VerifyError;
use crate::etag::DIGEST_LEN;
use indicatif::ProgressBar;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read size for whole-file hashing. Only affects throughput and memory.
pub const DEFAULT_STREAM_BLOCK_SIZE: usize = 5 * MIB as usize;

/// MD5 of a whole file in one sequential pass.
pub fn hash_stream(
    path: &Path,
    block_size: usize,
    progress: Option<&ProgressBar>,
) -> Result<[u8; DIGEST_LEN], VerifyError> {
    if block_size == 0 {
        return Err(VerifyError::InvalidConfig(
            "stream block size must be greater than zero".to_string(),
        ));
    }
    let mut file = File::open(path).map_err(|source| VerifyError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; block_size];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buf[..n]);
        if let Some(pb) = progress {
            pb.inc(n as u64);
        }
    }
    Ok(finalize(hasher))
}
