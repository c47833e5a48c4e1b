use crate::errors::OmFilesError;
use std::fs::File;
use std::io::Write;

/// Append-only byte sink the encoder flushes to. The file format is written
/// strictly front to back, so no seeking is required.
pub trait OmFileWriterBackend {
    fn write(&mut self, data: &[u8]) -> Result<(), OmFilesError>;
    fn synchronize(&self) -> Result<(), OmFilesError>;
}

impl OmFileWriterBackend for &mut File {
    fn write(&mut self, data: &[u8]) -> Result<(), OmFilesError> {
        self.write_all(data)
            .map_err(|e| OmFilesError::FileWriterError {
                errno: e.raw_os_error().unwrap_or(0),
                error: e.to_string(),
            })?;
        Ok(())
    }

    fn synchronize(&self) -> Result<(), OmFilesError> {
        self.sync_all().map_err(|e| OmFilesError::FileWriterError {
            errno: e.raw_os_error().unwrap_or(0),
            error: e.to_string(),
        })?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: Vec<u8>,
}

impl InMemoryBackend {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Length in bytes
    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl OmFileWriterBackend for &mut InMemoryBackend {
    fn write(&mut self, data: &[u8]) -> Result<(), OmFilesError> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn synchronize(&self) -> Result<(), OmFilesError> {
        // No-op for in-memory backend
        Ok(())
    }
}
