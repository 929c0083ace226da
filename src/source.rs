use crate::error::VerifyError;

/// What the storage provider reports about an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Raw ETag token, quoted or unquoted.
    pub etag: String,
    /// Declared object size in bytes.
    pub object_size: u64,
    /// Length of part 1 for multipart objects, when the provider reports it.
    pub part_size: Option<u64>,
}

impl RemoteObject {
    pub fn new(etag: impl Into<String>, object_size: u64) -> Self {
        Self {
            etag: etag.into(),
            object_size,
            part_size: None,
        }
    }

    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = Some(part_size);
        self
    }
}

/// Anything able to look up remote object metadata (an S3 HEAD request, a
/// manifest, values typed on the command line).
pub trait MetadataSource: Send + Sync {
    fn fetch(&self) -> Result<RemoteObject, VerifyError>;
}

/// Metadata known up front.
#[derive(Debug, Clone)]
pub struct StaticSource {
    object: RemoteObject,
}

impl StaticSource {
    pub fn new(object: RemoteObject) -> Self {
        Self { object }
    }
}

impl MetadataSource for StaticSource {
    fn fetch(&self) -> Result<RemoteObject, VerifyError> {
        Ok(self.object.clone())
    }
}
