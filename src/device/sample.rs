use crate::error::DecodeError;

/**
 * One accelerometer reading in raw device units (roughly ±2048 at 2g).
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

const SAMPLE_LEN: usize = 6;

/**
 * Decodes a raw accelerometer notification: signed little-endian 16-bit
 * x, y, z at offsets 0, 2 and 4. Trailing bytes are ignored.
 */
pub fn decode_sample(data: &[u8]) -> Result<Sample, DecodeError> {
    if data.len() < SAMPLE_LEN {
        return Err(DecodeError::BufferTooShort { len: data.len() });
    }

    Ok(Sample {
        x: i16::from_le_bytes([data[0], data[1]]),
        y: i16::from_le_bytes([data[2], data[3]]),
        z: i16::from_le_bytes([data[4], data[5]]),
    })
}
