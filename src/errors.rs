use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum OmFilesError {
    #[error("Cannot open file '{filename}': errno {errno}, error: {error}")]
    CannotOpenFile {
        filename: String,
        errno: i32,
        error: String,
    },
    #[error("File writer error: errno {errno}, error: {error}")]
    FileWriterError { errno: i32, error: String },
    #[error("File exists already: {filename}")]
    FileExistsAlready { filename: String },
    #[error("Chunk has wrong number of elements")]
    ChunkHasWrongNumberOfElements,
    #[error(
        "Offset and count exceed dimension: offset {offset}, count {count}, dimension {dimension}"
    )]
    OffsetAndCountExceedDimension {
        offset: u64,
        count: u64,
        dimension: u64,
    },
    #[error("Mismatching cube dimension length")]
    MismatchingCubeDimensionLength,
    #[error("Read range is not aligned to chunk boundaries on axis {axis}")]
    ArrayReadNotChunkAligned { axis: usize },
    #[error("More chunks supplied than the file can hold: at most {expected}")]
    TooManyChunksWritten { expected: u64 },
    #[error("Dimension must be larger than 0")]
    DimensionMustBeLargerThan0,
    #[error("Scale factor must be finite and non-zero")]
    InvalidScaleFactor,
    #[error("Write buffer too small for the next compressed chunk")]
    WriteBufferTooSmall,
    #[error("Writer is no longer usable after a previous failure")]
    WriterNoLongerUsable,
    #[error("Array not contiguous")]
    ArrayNotContiguous,
}
