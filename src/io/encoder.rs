use std::cmp::min;
use std::ops::Range;

use crate::backend::backends::OmFileWriterBackend;
use crate::core::compression::{p4nenc128v16_bound, CompressionType};
use crate::core::delta2d::delta2d_encode;
use crate::core::header::OmHeader;
use crate::core::pfor::pack16;
use crate::core::quantize::quantize;
use crate::errors::OmFilesError;
use crate::io::write_buffer::OmWriteBuffer;
use crate::utils::divide_rounded_up_u64;

/// Streaming encoder for a single n-dimensional array.
///
/// The caller pushes rectangular slabs of data in chunk order via
/// [`write_data`](Self::write_data); chunks are compressed one at a time and
/// flushed to the backend immediately. The byte offset of every chunk is
/// collected in a lookup table which [`write_trailer`](Self::write_trailer)
/// appends at the end of the file, followed by the dimensions, the chunk
/// shape, the rank and the table's own start offset.
pub struct OmFileEncoder {
    pub scalefactor: f32,
    pub compression: CompressionType,
    pub dims: Vec<u64>,
    pub chunks: Vec<u64>,

    /// Byte offset of the end of each compressed chunk, relative to the end
    /// of the 3 byte header. Chunk `i` spans `offsets[i-1]..offsets[i]` with
    /// an implicit leading zero. Later, to decompress chunk 1234, a reader
    /// looks up here where it starts and ends.
    chunk_offset_bytes: Vec<u64>,

    /// Next chunk to be written, linear over the chunk grid in row-major
    /// order. Strictly increasing, terminal value is the chunk count.
    chunk_index: u64,

    /// Holds one chunk's quantized values between gather and compression.
    chunk_buffer: Vec<i16>,

    /// Set after a backend or buffer failure. All further calls must fail,
    /// the file is incomplete and cannot be recovered by this encoder.
    failed: bool,
}

impl OmFileEncoder {
    pub fn new(
        dimensions: Vec<u64>,
        chunk_dimensions: Vec<u64>,
        compression: CompressionType,
        scalefactor: f32,
    ) -> Result<Self, OmFilesError> {
        if dimensions.is_empty() || dimensions.iter().any(|&d| d == 0) {
            return Err(OmFilesError::DimensionMustBeLargerThan0);
        }
        if dimensions.len() != chunk_dimensions.len() {
            return Err(OmFilesError::MismatchingCubeDimensionLength);
        }
        if chunk_dimensions.iter().any(|&c| c == 0) {
            return Err(OmFilesError::DimensionMustBeLargerThan0);
        }
        if !scalefactor.is_finite() || scalefactor == 0.0 {
            return Err(OmFilesError::InvalidScaleFactor);
        }

        let elements_per_chunk: u64 = chunk_dimensions.iter().product();
        let chunk_size_byte = elements_per_chunk * 4;
        if chunk_size_byte > 1024 * 1024 * 4 {
            println!(
                "WARNING: Chunk size greater than 4 MB ({} MB)!",
                chunk_size_byte as f32 / 1024.0 / 1024.0
            );
        }

        let n_chunks: u64 = dimensions
            .iter()
            .zip(&chunk_dimensions)
            .map(|(&d, &c)| divide_rounded_up_u64(d, c))
            .product();

        Ok(Self {
            scalefactor,
            compression,
            dims: dimensions,
            chunks: chunk_dimensions,
            chunk_offset_bytes: vec![0; n_chunks as usize],
            chunk_index: 0,
            chunk_buffer: vec![0; elements_per_chunk as usize],
            failed: false,
        })
    }

    /// Return the total number of chunks in this file
    pub fn number_of_chunks(&self) -> u64 {
        self.dims
            .iter()
            .zip(&self.chunks)
            .map(|(&dim, &chunk)| divide_rounded_up_u64(dim, chunk))
            .product()
    }

    pub fn elements_per_chunk(&self) -> u64 {
        self.chunks.iter().product()
    }

    /// Size of the output buffer this encoder needs: at least 1 MB, enough
    /// for one worst-case compressed chunk and enough to stage the trailer.
    pub fn output_buffer_capacity(&self) -> u64 {
        let chunk_bound = p4nenc128v16_bound(self.elements_per_chunk() as usize) as u64;
        let trailer_size = (self.number_of_chunks() + 2 * self.dims.len() as u64 + 2) * 8;
        (1024 * 1024).max(chunk_bound).max(trailer_size)
    }

    /// Compresses all chunks covered by `array_read` and flushes each one to
    /// the backend as soon as it is staged.
    ///
    /// `array` is a dense buffer of shape `array_dimensions`; `array_read`
    /// selects the hyper-rectangle to consume. On all axes except the fastest
    /// the read extent must cover whole chunks. Slabs must arrive in chunk
    /// order across calls; positions within the file grid are tracked by the
    /// encoder, not derived from the read window.
    pub fn write_data<Backend: OmFileWriterBackend>(
        &mut self,
        array: &[f32],
        array_dimensions: &[u64],
        array_read: &[Range<u64>],
        backend: &mut Backend,
        out: &mut OmWriteBuffer,
    ) -> Result<(), OmFilesError> {
        if self.failed {
            return Err(OmFilesError::WriterNoLongerUsable);
        }

        let rank = self.dims.len();
        if array_dimensions.len() != rank || array_read.len() != rank {
            return Err(OmFilesError::MismatchingCubeDimensionLength);
        }
        if array.len() as u64 != array_dimensions.iter().product::<u64>() {
            return Err(OmFilesError::ChunkHasWrongNumberOfElements);
        }
        for (i, range) in array_read.iter().enumerate() {
            if range.end > array_dimensions[i] || range.end <= range.start {
                return Err(OmFilesError::OffsetAndCountExceedDimension {
                    offset: range.start,
                    count: range.end.saturating_sub(range.start),
                    dimension: array_dimensions[i],
                });
            }
        }
        for i in 0..rank - 1 {
            // Slower axes must supply whole chunks. The only allowed partial
            // extent is the file's own trailing partial chunk on that axis.
            let count = array_read[i].end - array_read[i].start;
            let rem = count % self.chunks[i];
            if rem != 0 && rem != self.dims[i] % self.chunks[i] {
                return Err(OmFilesError::ArrayReadNotChunkAligned { axis: i });
            }
        }

        let number_of_chunks_in_array: u64 = array_read
            .iter()
            .zip(&self.chunks)
            .map(|(r, &c)| divide_rounded_up_u64(r.end - r.start, c))
            .product();
        if self.chunk_index + number_of_chunks_in_array > self.number_of_chunks() {
            return Err(OmFilesError::TooManyChunksWritten {
                expected: self.number_of_chunks(),
            });
        }

        let array_offset: Vec<u64> = array_read.iter().map(|r| r.start).collect();
        let array_count: Vec<u64> = array_read.iter().map(|r| r.end - r.start).collect();

        for c_offset in 0..number_of_chunks_in_array {
            if let Err(e) = self.write_next_chunk(array, array_dimensions, &array_offset, &array_count, c_offset, out)
            {
                self.failed = true;
                return Err(e);
            }
            // Flush after every chunk so the backend sees data as early as
            // possible and the staging buffer never has to hold two chunks.
            if let Err(e) = out.write_to_file(backend) {
                self.failed = true;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Appends the lookup table, dimensions, chunk shape, rank and the
    /// table's start offset, then flushes. All values are little-endian
    /// 64 bit integers; offsets carry the same bias as the chunk offsets,
    /// readers subtract the header length symmetrically.
    pub fn write_trailer<Backend: OmFileWriterBackend>(
        &mut self,
        out: &mut OmWriteBuffer,
        backend: &mut Backend,
    ) -> Result<(), OmFilesError> {
        if self.failed {
            return Err(OmFilesError::WriterNoLongerUsable);
        }

        let lut_start = out.total_bytes_written - OmHeader::LENGTH as u64;
        for &offset in &self.chunk_offset_bytes {
            out.write_u64_le(offset);
        }
        for &dim in &self.dims {
            out.write_u64_le(dim);
        }
        for &chunk in &self.chunks {
            out.write_u64_le(chunk);
        }
        out.write_u64_le(self.dims.len() as u64);
        out.write_u64_le(lut_start);

        if let Err(e) = out.write_to_file(backend) {
            self.failed = true;
            return Err(e);
        }
        Ok(())
    }

    /// Gathers, quantizes and compresses the single chunk at `chunk_index`,
    /// staging its payload into `out` and recording its end offset.
    fn write_next_chunk(
        &mut self,
        array: &[f32],
        array_dimensions: &[u64],
        array_offset: &[u64],
        array_count: &[u64],
        c_offset: u64,
        out: &mut OmWriteBuffer,
    ) -> Result<(), OmFilesError> {
        let rank = self.dims.len();

        // Decompose the global chunk index over the file grid and the call
        // offset over the grid of chunks covered by this read window. The
        // former yields the chunk extents, the latter the source origin.
        let mut lengths = vec![0u64; rank];
        let mut origin = vec![0u64; rank];
        let mut rolling_multiply = 1u64;
        let mut rolling_multiply_read = 1u64;
        for i in (0..rank).rev() {
            let n_chunks_in_this_dimension = divide_rounded_up_u64(self.dims[i], self.chunks[i]);
            let n_read_chunks = divide_rounded_up_u64(array_count[i], self.chunks[i]);
            let c0 = (self.chunk_index / rolling_multiply) % n_chunks_in_this_dimension;
            let c0_read = (c_offset / rolling_multiply_read) % n_read_chunks;

            lengths[i] = min((c0 + 1) * self.chunks[i], self.dims[i]) - c0 * self.chunks[i];
            origin[i] = array_offset[i] + c0_read * self.chunks[i];

            debug_assert!(lengths[i] <= array_count[i]);
            debug_assert_eq!(
                lengths[i],
                min((c0_read + 1) * self.chunks[i], array_count[i]) - c0_read * self.chunks[i]
            );

            rolling_multiply *= n_chunks_in_this_dimension;
            rolling_multiply_read *= n_read_chunks;
        }

        // The fastest axis is contiguous in both the source and the chunk
        // buffer. The run extends across every slower axis that is fully
        // spanned by the read window and the source array alike; it degrades
        // to a single row as soon as one axis is read partially.
        let mut outer_rank = rank - 1;
        let mut linear_read_count = lengths[rank - 1];
        while outer_rank > 0
            && array_count[outer_rank] == lengths[outer_rank]
            && array_dimensions[outer_rank] == lengths[outer_rank]
        {
            outer_rank -= 1;
            linear_read_count *= lengths[outer_rank];
        }

        let mut stride = vec![1u64; rank];
        for i in (0..rank - 1).rev() {
            stride[i] = stride[i + 1] * array_dimensions[i + 1];
        }
        let base: u64 = origin.iter().zip(&stride).map(|(&o, &s)| o * s).sum();

        // Walk the slow axes with one explicit loop variable per axis and
        // copy one linear run per step through the quantizer.
        let mut index = vec![0u64; outer_rank];
        let mut write_coordinate = 0usize;
        'gather: loop {
            let read_coordinate =
                (base + index.iter().zip(&stride).map(|(&e, &s)| e * s).sum::<u64>()) as usize;
            for i in 0..linear_read_count as usize {
                self.chunk_buffer[write_coordinate + i] =
                    quantize(array[read_coordinate + i], self.scalefactor, self.compression);
            }
            write_coordinate += linear_read_count as usize;

            let mut axis = outer_rank;
            loop {
                if axis == 0 {
                    break 'gather;
                }
                axis -= 1;
                index[axis] += 1;
                if index[axis] < lengths[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }

        let length_in_chunk: u64 = lengths.iter().product();
        debug_assert_eq!(write_coordinate as u64, length_in_chunk);
        let length_last = lengths[rank - 1];

        delta2d_encode(
            (length_in_chunk / length_last) as usize,
            length_last as usize,
            &mut self.chunk_buffer[..length_in_chunk as usize],
        );

        let minimum_buffer = p4nenc128v16_bound(length_in_chunk as usize) as u64;
        if out.remaining_capacity() < minimum_buffer {
            return Err(OmFilesError::WriteBufferTooSmall);
        }
        let write_length = pack16(
            &self.chunk_buffer[..length_in_chunk as usize],
            out.buffer_at_write_position(),
        );
        out.increment_write_position(write_length as u64);

        self.chunk_offset_bytes[self.chunk_index as usize] =
            out.total_bytes_written - OmHeader::LENGTH as u64;
        self.chunk_index += 1;
        Ok(())
    }
}
