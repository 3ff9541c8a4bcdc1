//! Conversion of raw sample blobs into normalized `f64` amplitudes.

use crate::{Aup3Error, Result, SampleFormat};

const INT16_SCALE: f64 = 32_768.0;
const INT24_SCALE: f64 = 8_388_608.0;

/// Decodes `count` little-endian samples of `format` from `blob`.
///
/// Integer samples are divided by `2^(bits - 1)`, so the most negative value maps
/// to exactly `-1.0`. Float samples are widened without rescaling.
///
/// 24-bit blobs are normally packed, but a blob of exactly `count * 4` bytes is
/// read as 24-bit values held in 32-bit containers, which is how Audacity keeps
/// them in memory.
pub fn decode(blob: &[u8], format: SampleFormat, count: usize) -> Result<Vec<f64>> {
    let expected = count.checked_mul(format.byte_width()).ok_or(Aup3Error::CorruptBlock {
        expected: usize::MAX,
        actual: blob.len(),
    })?;

    if format == SampleFormat::Int24 && blob.len() != expected && Some(blob.len()) == count.checked_mul(4) {
        return Ok(blob
            .chunks_exact(4)
            .map(|x| sign_extend_24(i32::from_le_bytes([x[0], x[1], x[2], x[3]])) as f64 / INT24_SCALE)
            .collect());
    }

    if blob.len() != expected {
        return Err(Aup3Error::CorruptBlock {
            expected,
            actual: blob.len(),
        });
    }

    let samples = match format {
        SampleFormat::Int16 => blob
            .chunks_exact(2)
            .map(|x| i16::from_le_bytes([x[0], x[1]]) as f64 / INT16_SCALE)
            .collect(),
        SampleFormat::Int24 => blob
            .chunks_exact(3)
            .map(|x| sign_extend_24(i32::from_le_bytes([x[0], x[1], x[2], 0])) as f64 / INT24_SCALE)
            .collect(),
        SampleFormat::Float => blob
            .chunks_exact(4)
            .map(|x| f32::from_le_bytes([x[0], x[1], x[2], x[3]]) as f64)
            .collect(),
    };

    Ok(samples)
}

fn sign_extend_24(value: i32) -> i32 {
    (value << 8) >> 8
}
