use crate::backend::backends::OmFileWriterBackend;
use crate::core::header::OmHeader;
use crate::errors::OmFilesError;

/// Output staging buffer. Compressed chunks are placed here before being
/// flushed to a backend; `total_bytes_written` keeps counting across flushes
/// and is the source of truth for all recorded byte offsets.
pub struct OmWriteBuffer {
    buffer: Vec<u8>,
    write_position: u64,
    pub total_bytes_written: u64,
}

impl OmWriteBuffer {
    /// Creates a new `OmWriteBuffer` with the specified capacity.
    pub fn new(capacity: u64) -> Self {
        Self {
            buffer: vec![0u8; capacity as usize],
            write_position: 0,
            total_bytes_written: 0,
        }
    }

    /// Increments the write position by the given number of bytes.
    pub fn increment_write_position(&mut self, bytes: u64) {
        self.write_position += bytes;
        self.total_bytes_written += bytes;
    }

    /// Returns the remaining capacity in the buffer.
    pub fn remaining_capacity(&self) -> u64 {
        (self.buffer.len() as u64) - self.write_position
    }

    /// Returns a mutable slice starting at the current write position.
    pub fn buffer_at_write_position(&mut self) -> &mut [u8] {
        &mut self.buffer[(self.write_position as usize)..]
    }

    /// Ensures the buffer has room for at least `minimum_capacity` more bytes.
    pub fn reallocate(&mut self, minimum_capacity: u64) {
        let needed_capacity = self.write_position + minimum_capacity;
        if (self.buffer.len() as u64) < needed_capacity {
            self.buffer.resize(needed_capacity as usize, 0);
        }
    }

    /// Writes a slice of bytes to the buffer, growing it if necessary.
    pub fn write_bytes(&mut self, data: &[u8]) {
        let len = data.len() as u64;
        self.reallocate(len);
        let start = self.write_position as usize;
        self.buffer[start..start + data.len()].copy_from_slice(data);
        self.increment_write_position(len);
    }

    /// Writes an integer to the buffer in little-endian order.
    pub fn write_u64_le(&mut self, value: u64) {
        let bytes = value.to_le_bytes();
        self.write_bytes(&bytes);
    }

    /// Stages the 3 byte file prefix and flushes it to the backend.
    pub fn write_header<Backend: OmFileWriterBackend>(
        &mut self,
        backend: &mut Backend,
    ) -> Result<(), OmFilesError> {
        self.write_bytes(&OmHeader::as_bytes());
        self.write_to_file(backend)
    }

    /// Writes the buffer contents to the backend and resets the write position.
    pub fn write_to_file<Backend: OmFileWriterBackend>(
        &mut self,
        backend: &mut Backend,
    ) -> Result<(), OmFilesError> {
        if self.write_position == 0 {
            return Ok(());
        }
        let data = &self.buffer[..(self.write_position as usize)];
        backend.write(data)?;
        self.write_position = 0;
        Ok(())
    }
}
