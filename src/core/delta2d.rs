use num_traits::{WrappingAdd, WrappingSub};

/// Decodes a 2D delta-encoded buffer by adding each row to its successor.
///
/// # Parameters
///
/// * `length0` - The length of the first dimension of the buffer.
/// * `length1` - The length of the second dimension of the buffer.
/// * `chunk_buffer` - A mutable reference to the buffer to be decoded.
#[inline(always)]
pub fn delta2d_decode<T: WrappingAdd + Copy>(
    length0: usize,
    length1: usize,
    chunk_buffer: &mut [T],
) {
    if length0 <= 1 {
        return;
    }
    for d0 in 1..length0 {
        for d1 in 0..length1 {
            let index = d0 * length1 + d1;
            let prev_index = (d0 - 1) * length1 + d1;
            chunk_buffer[index] = chunk_buffer[index].wrapping_add(&chunk_buffer[prev_index]);
        }
    }
}

/// Encodes a buffer in place by replacing each row after the first with its
/// element-wise difference from the preceding row. Arithmetic wraps around,
/// the decoder wraps back symmetrically.
///
/// # Parameters
///
/// * `length0` - The length of the first dimension of the buffer.
/// * `length1` - The length of the second dimension of the buffer.
/// * `chunk_buffer` - A mutable reference to the buffer to be encoded.
#[inline(always)]
pub fn delta2d_encode<T: WrappingSub + Copy>(
    length0: usize,
    length1: usize,
    chunk_buffer: &mut [T],
) {
    if length0 <= 1 {
        return;
    }
    for d0 in (1..length0).rev() {
        for d1 in 0..length1 {
            let index = d0 * length1 + d1;
            let prev_index = (d0 - 1) * length1 + d1;
            chunk_buffer[index] = chunk_buffer[index].wrapping_sub(&chunk_buffer[prev_index]);
        }
    }
}
