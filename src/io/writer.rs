use crate::backend::backends::{InMemoryBackend, OmFileWriterBackend};
use crate::core::compression::CompressionType;
use crate::errors::OmFilesError;
use crate::io::encoder::OmFileEncoder;
use crate::io::write_buffer::OmWriteBuffer;
use crate::utils::divide_rounded_up_u64;
use ndarray::ArrayViewD;
use std::fs::File;
use std::ops::Range;
use std::path::Path;

/// Number of flushed payload bytes after which the backend is synchronized
/// when fsync is requested. Keeps the amount of dirty pages bounded when
/// writing large files.
const FSYNC_FLUSH_SIZE: u64 = 32 * 1024 * 1024;

/// High-level writer driving a complete header, data, trailer cycle.
///
/// Data is supplied by a closure which is handed the current position in
/// dimension 0 and returns a slab covering one or more whole chunk rows
/// (or all remaining rows of the last, partial group).
pub struct OmFileWriter {
    pub dimensions: Vec<u64>,
    pub chunk_dimensions: Vec<u64>,
    pub compression: CompressionType,
    pub scalefactor: f32,
}

impl OmFileWriter {
    pub fn new(
        dimensions: Vec<u64>,
        chunk_dimensions: Vec<u64>,
        compression: CompressionType,
        scalefactor: f32,
    ) -> Self {
        Self {
            dimensions,
            chunk_dimensions,
            compression,
            scalefactor,
        }
    }

    /// Write a new compressed file to `backend`.
    ///
    /// `supply_chunk` must return a slab whose element count is an even
    /// multiple of one chunk row, or all remaining elements for the final
    /// call. If `fsync` is true, the backend is synchronized after every
    /// 32 MB of data and once after the trailer.
    pub fn write<'a, Backend: OmFileWriterBackend>(
        &self,
        backend: &mut Backend,
        fsync: bool,
        supply_chunk: impl Fn(u64) -> Result<&'a [f32], OmFilesError>,
    ) -> Result<(), OmFilesError> {
        let mut encoder = OmFileEncoder::new(
            self.dimensions.clone(),
            self.chunk_dimensions.clone(),
            self.compression,
            self.scalefactor,
        )?;
        let mut out = OmWriteBuffer::new(encoder.output_buffer_capacity());

        out.write_header(backend)?;

        let dim0 = self.dimensions[0];
        let chunk0 = self.chunk_dimensions[0];
        let elements_per_row: u64 = self.dimensions[1..].iter().product();
        let n_dim0_chunks = divide_rounded_up_u64(dim0, chunk0);

        let mut bytes_written_since_last_flush = 0u64;
        let mut c0 = 0u64;
        while c0 < n_dim0_chunks {
            let dim0_position = c0 * chunk0;
            let slab = supply_chunk(dim0_position)?;

            if slab.is_empty() || slab.len() as u64 % elements_per_row != 0 {
                return Err(OmFilesError::ChunkHasWrongNumberOfElements);
            }
            let rows = slab.len() as u64 / elements_per_row;
            if dim0_position + rows > dim0 {
                return Err(OmFilesError::ChunkHasWrongNumberOfElements);
            }
            if rows % chunk0 != 0 && dim0_position + rows != dim0 {
                // Anything but the last slab must end on a chunk boundary
                return Err(OmFilesError::ChunkHasWrongNumberOfElements);
            }

            let mut slab_dimensions = self.dimensions.clone();
            slab_dimensions[0] = rows;
            let slab_read: Vec<Range<u64>> = slab_dimensions.iter().map(|&d| 0..d).collect();

            let staged_before = out.total_bytes_written;
            encoder.write_data(slab, &slab_dimensions, &slab_read, backend, &mut out)?;

            if fsync {
                bytes_written_since_last_flush += out.total_bytes_written - staged_before;
                if bytes_written_since_last_flush >= FSYNC_FLUSH_SIZE {
                    // Make sure to write to disk, otherwise we get a
                    // lot of dirty pages and might overload kernel page cache
                    backend.synchronize()?;
                    bytes_written_since_last_flush = 0;
                }
            }

            c0 += divide_rounded_up_u64(rows, chunk0);
        }

        encoder.write_trailer(&mut out, backend)?;
        if fsync {
            backend.synchronize()?;
        }
        Ok(())
    }

    /// Write a standard-layout ndarray in one go. The array shape must match
    /// the file dimensions.
    pub fn write_ndarray<Backend: OmFileWriterBackend>(
        &self,
        backend: &mut Backend,
        fsync: bool,
        array: ArrayViewD<'_, f32>,
    ) -> Result<(), OmFilesError> {
        if array.ndim() != self.dimensions.len() {
            return Err(OmFilesError::MismatchingCubeDimensionLength);
        }
        if array
            .shape()
            .iter()
            .zip(&self.dimensions)
            .any(|(&a, &d)| a as u64 != d)
        {
            return Err(OmFilesError::ChunkHasWrongNumberOfElements);
        }
        let data = array.as_slice().ok_or(OmFilesError::ArrayNotContiguous)?;
        self.write(backend, fsync, |_| Ok(data))
    }

    /// Write new or overwrite a compressed file. Data is first written to a
    /// temporary file which is renamed into place once complete, so a
    /// crashed writer never leaves a truncated file under the final name.
    pub fn write_to_file<'a>(
        &self,
        file: &str,
        overwrite: bool,
        supply_chunk: impl Fn(u64) -> Result<&'a [f32], OmFilesError>,
    ) -> Result<(), OmFilesError> {
        if !overwrite && Path::new(file).exists() {
            return Err(OmFilesError::FileExistsAlready {
                filename: file.to_string(),
            });
        }
        let file_temp = format!("{}~", file);
        if Path::new(&file_temp).exists() {
            std::fs::remove_file(&file_temp).map_err(|e| OmFilesError::CannotOpenFile {
                filename: file_temp.clone(),
                errno: e.raw_os_error().unwrap_or(0),
                error: e.to_string(),
            })?;
        }
        let mut file_handle =
            File::create(&file_temp).map_err(|e| OmFilesError::CannotOpenFile {
                filename: file_temp.clone(),
                errno: e.raw_os_error().unwrap_or(0),
                error: e.to_string(),
            })?;
        self.write(&mut (&mut file_handle), true, supply_chunk)?;
        std::fs::rename(&file_temp, file).map_err(|e| OmFilesError::CannotOpenFile {
            filename: file_temp,
            errno: e.raw_os_error().unwrap_or(0),
            error: e.to_string(),
        })?;
        Ok(())
    }

    pub fn write_all_to_file(
        &self,
        file: &str,
        all: &[f32],
        overwrite: bool,
    ) -> Result<(), OmFilesError> {
        self.write_to_file(file, overwrite, |_| Ok(all))
    }

    pub fn write_in_memory<'a>(
        &self,
        supply_chunk: impl Fn(u64) -> Result<&'a [f32], OmFilesError>,
    ) -> Result<InMemoryBackend, OmFilesError> {
        let mut data = InMemoryBackend::new(Vec::new());
        self.write(&mut (&mut data), true, supply_chunk)?;
        Ok(data)
    }

    pub fn write_all_in_memory(&self, all: &[f32]) -> Result<InMemoryBackend, OmFilesError> {
        self.write_in_memory(|_| Ok(all))
    }
}
