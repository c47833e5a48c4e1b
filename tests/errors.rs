use omfiles_encoder::backend::backends::{InMemoryBackend, OmFileWriterBackend};
use omfiles_encoder::core::compression::CompressionType;
use omfiles_encoder::errors::OmFilesError;
use omfiles_encoder::io::encoder::OmFileEncoder;
use omfiles_encoder::io::write_buffer::OmWriteBuffer;
use omfiles_encoder::io::writer::OmFileWriter;
use std::borrow::BorrowMut;


fn error_string<T>(result: Result<T, OmFilesError>) -> String {
    result.err().unwrap().to_string()
}

fn new_encoder(dims: Vec<u64>, chunks: Vec<u64>) -> OmFileEncoder {
    OmFileEncoder::new(dims, chunks, CompressionType::PforDelta2dInt16, 1.0).unwrap()
}

/// Rejects every write with an I/O error.
struct FailingBackend;

impl OmFileWriterBackend for FailingBackend {
    fn write(&mut self, _data: &[u8]) -> Result<(), OmFilesError> {
        Err(OmFilesError::FileWriterError {
            errno: 5,
            error: "Input/output error".to_string(),
        })
    }

    fn synchronize(&self) -> Result<(), OmFilesError> {
        Ok(())
    }
}

#[test]
fn test_mismatching_cube_dimension_length() {
    let result = OmFileEncoder::new(
        vec![10, 10],
        vec![5],
        CompressionType::PforDelta2dInt16,
        1.0,
    );
    assert_eq!(error_string(result), "Mismatching cube dimension length");
}

#[test]
fn test_dimension_must_be_larger_than_0() {
    let result = OmFileEncoder::new(vec![10, 0], vec![5, 5], CompressionType::PforDelta2dInt16, 1.0);
    assert_eq!(error_string(result), "Dimension must be larger than 0");

    let result = OmFileEncoder::new(vec![], vec![], CompressionType::PforDelta2dInt16, 1.0);
    assert_eq!(error_string(result), "Dimension must be larger than 0");

    let result = OmFileEncoder::new(vec![10, 10], vec![5, 0], CompressionType::PforDelta2dInt16, 1.0);
    assert_eq!(error_string(result), "Dimension must be larger than 0");
}

#[test]
fn test_invalid_scale_factor() {
    for scalefactor in [0.0, f32::NAN, f32::INFINITY] {
        let result = OmFileEncoder::new(
            vec![10],
            vec![5],
            CompressionType::PforDelta2dInt16,
            scalefactor,
        );
        assert_eq!(
            error_string(result),
            "Scale factor must be finite and non-zero"
        );
    }
}

#[test]
fn test_chunk_has_wrong_number_of_elements() {
    let mut encoder = new_encoder(vec![10, 10], vec![5, 5]);
    let mut out = OmWriteBuffer::new(encoder.output_buffer_capacity());
    let mut backend = InMemoryBackend::new(vec![]);
    let mut backend_ref = backend.borrow_mut();

    // 99 elements for a 10x10 slab
    let data = vec![1.0f32; 99];
    let result = encoder.write_data(&data, &[10, 10], &[0..10, 0..10], &mut backend_ref, &mut out);
    assert_eq!(error_string(result), "Chunk has wrong number of elements");
}

#[test]
fn test_offset_and_count_exceed_dimension() {
    let mut encoder = new_encoder(vec![10, 10], vec![5, 5]);
    let mut out = OmWriteBuffer::new(encoder.output_buffer_capacity());
    let mut backend = InMemoryBackend::new(vec![]);
    let mut backend_ref = backend.borrow_mut();

    let data = vec![1.0f32; 100];
    let result = encoder.write_data(&data, &[10, 10], &[0..10, 2..12], &mut backend_ref, &mut out);
    assert_eq!(
        result,
        Err(OmFilesError::OffsetAndCountExceedDimension {
            offset: 2,
            count: 10,
            dimension: 10
        })
    );

    // Empty ranges are rejected as well
    let result = encoder.write_data(&data, &[10, 10], &[0..10, 4..4], &mut backend_ref, &mut out);
    assert!(matches!(
        result,
        Err(OmFilesError::OffsetAndCountExceedDimension { .. })
    ));
}

#[test]
fn test_array_read_not_chunk_aligned() {
    let mut encoder = new_encoder(vec![10, 10], vec![5, 5]);
    let mut out = OmWriteBuffer::new(encoder.output_buffer_capacity());
    let mut backend = InMemoryBackend::new(vec![]);
    let mut backend_ref = backend.borrow_mut();

    // 3 rows do not cover a whole chunk on the slow axis
    let data = vec![1.0f32; 100];
    let result = encoder.write_data(&data, &[10, 10], &[0..3, 0..10], &mut backend_ref, &mut out);
    assert_eq!(
        result,
        Err(OmFilesError::ArrayReadNotChunkAligned { axis: 0 })
    );

    // The fastest axis is exempt: a 7 element read covers the full 5 and
    // the trailing 2 element chunk of this file
    let mut encoder = new_encoder(vec![10, 7], vec![5, 5]);
    let mut out = OmWriteBuffer::new(encoder.output_buffer_capacity());
    let data = vec![1.0f32; 35];
    let result = encoder.write_data(&data, &[5, 7], &[0..5, 0..7], &mut backend_ref, &mut out);
    assert!(result.is_ok());
}

#[test]
fn test_too_many_chunks_written() {
    let mut encoder = new_encoder(vec![4, 4], vec![2, 2]);
    let mut out = OmWriteBuffer::new(encoder.output_buffer_capacity());
    let mut backend = InMemoryBackend::new(vec![]);
    let mut backend_ref = backend.borrow_mut();

    let data = vec![1.0f32; 16];
    encoder
        .write_data(&data, &[4, 4], &[0..4, 0..4], &mut backend_ref, &mut out)
        .unwrap();
    let result = encoder.write_data(&data, &[4, 4], &[0..4, 0..4], &mut backend_ref, &mut out);
    assert_eq!(result, Err(OmFilesError::TooManyChunksWritten { expected: 4 }));
}

#[test]
fn test_validation_errors_leave_encoder_usable() {
    let mut encoder = new_encoder(vec![4, 4], vec![2, 2]);
    let mut out = OmWriteBuffer::new(encoder.output_buffer_capacity());
    let mut backend = InMemoryBackend::new(vec![]);
    let mut backend_ref = backend.borrow_mut();

    out.write_header(&mut backend_ref).unwrap();

    let data = vec![1.0f32; 16];
    let result = encoder.write_data(&data, &[4, 4], &[0..4, 0..5], &mut backend_ref, &mut out);
    assert!(result.is_err());

    // The corrected call succeeds and produces a complete file
    encoder
        .write_data(&data, &[4, 4], &[0..4, 0..4], &mut backend_ref, &mut out)
        .unwrap();
    encoder.write_trailer(&mut out, &mut backend_ref).unwrap();

    let decoded = test_utils::decode_all(
        backend.as_bytes(),
        CompressionType::PforDelta2dInt16,
        1.0,
    );
    assert_eq!(decoded, data);
}

#[test]
fn test_sink_failure_poisons_encoder() {
    let mut encoder = new_encoder(vec![4, 4], vec![2, 2]);
    let mut out = OmWriteBuffer::new(encoder.output_buffer_capacity());
    let mut failing = FailingBackend;

    let data = vec![1.0f32; 16];
    let result = encoder.write_data(&data, &[4, 4], &[0..4, 0..4], &mut failing, &mut out);
    assert!(matches!(result, Err(OmFilesError::FileWriterError { .. })));

    // Even with a healthy backend, the encoder must keep failing
    let mut backend = InMemoryBackend::new(vec![]);
    let mut backend_ref = backend.borrow_mut();
    let result = encoder.write_data(&data, &[4, 4], &[0..4, 0..4], &mut backend_ref, &mut out);
    assert_eq!(result, Err(OmFilesError::WriterNoLongerUsable));
    let result = encoder.write_trailer(&mut out, &mut backend_ref);
    assert_eq!(result, Err(OmFilesError::WriterNoLongerUsable));
}

#[test]
fn test_empty_supply_chunk_is_rejected() {
    let empty: Vec<f32> = vec![];
    let result = OmFileWriter::new(
        vec![5, 5],
        vec![2, 2],
        CompressionType::PforDelta2dInt16,
        1.0,
    )
    .write_in_memory(|_| Ok(empty.as_slice()));
    assert_eq!(error_string(result), "Chunk has wrong number of elements");
}

#[test]
fn test_supply_chunk_with_too_many_elements() {
    let data: Vec<f32> = (0..30).map(|x| x as f32).collect();
    let result = OmFileWriter::new(
        vec![5, 5],
        vec![2, 2],
        CompressionType::PforDelta2dInt16,
        1.0,
    )
    .write_in_memory(|_| Ok(data.as_slice()));
    assert_eq!(error_string(result), "Chunk has wrong number of elements");
}
