use crate::core::compression::CompressionType;

/// Sentinel code for missing values. Zig-zag coding cannot represent
/// `i16::MIN` cleanly, so the maximum value is reserved for NaN instead.
pub const NAN_SENTINEL: i16 = i16::MAX;

/// Converts a single f32 value into its 16 bit code.
///
/// NaN maps to [`NAN_SENTINEL`]. All other values are scaled, rounded half
/// away from zero and saturated into `i16::MIN..=i16::MAX - 1`. The upper
/// bound stays one below the sentinel so that a saturating value can never be
/// mistaken for a missing one after decoding.
#[inline(always)]
pub fn quantize(value: f32, scalefactor: f32, compression: CompressionType) -> i16 {
    if value.is_nan() {
        return NAN_SENTINEL;
    }
    let scaled = match compression {
        CompressionType::PforDelta2dInt16 => value * scalefactor,
        CompressionType::PforDelta2dInt16Logarithmic => (1.0 + value).log10() * scalefactor,
    };
    scaled
        .round()
        .clamp(i16::MIN as f32, (i16::MAX - 1) as f32) as i16
}

/// The matching inverse of [`quantize`].
#[inline(always)]
pub fn dequantize(code: i16, scalefactor: f32, compression: CompressionType) -> f32 {
    if code == NAN_SENTINEL {
        return f32::NAN;
    }
    match compression {
        CompressionType::PforDelta2dInt16 => code as f32 / scalefactor,
        CompressionType::PforDelta2dInt16Logarithmic => {
            10f32.powf(code as f32 / scalefactor) - 1.0
        }
    }
}
