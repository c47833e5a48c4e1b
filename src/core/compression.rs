use crate::utils::divide_rounded_up;

/// Compression applied to each chunk. Both variants quantize f32 values to
/// 16 bit integers, delta encode them in 2D and bit-pack them with zig-zag
/// coding. The logarithmic variant applies `log10(1 + x)` before scaling to
/// spend precision on small magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    PforDelta2dInt16 = 0,
    PforDelta2dInt16Logarithmic = 3,
}

/// Worst case output size of `pack16` for `n` 16 bit values: two payload
/// bytes per value plus one width byte per 128 value block, with additional
/// slack so the output buffer never has to be sized exactly.
/// https://github.com/powturbo/TurboPFor-Integer-Compression/issues/59
pub fn p4nenc128v16_bound(n: usize) -> usize {
    (n + 32) * 2 + divide_rounded_up(n, 128)
}
