//! Scalar reference kernels.
//!
//! These are the correctness oracle: every vector tier must produce the same
//! bytes, and every vector loop uses them for its remainder.

use crate::bit_depth::{Bit16, BitDepthType};
use crate::g711;

/// Quantizes one float sample to a signed integer of depth `B`.
///
/// Rounds half away from zero and saturates to the encodable range, so `1.0`
/// lands on the largest positive sample instead of wrapping. NaN maps to 0.
#[inline(always)]
pub fn quantize<B: BitDepthType>(x: f32) -> i32 {
    // `as` saturates (and sends NaN to 0); the clamp handles the 2^(n-1) edge.
    ((x * B::MAX_VALUE).round() as i32).clamp(B::MIN_SAMPLE, B::MAX_SAMPLE)
}

/// Writes one quantized sample in the byte layout of `B` / `BIG`.
#[inline(always)]
pub fn put_sample<B: BitDepthType, const BIG: bool>(q: i32, out: &mut [u8]) {
    match B::BITS {
        8 => out[0] = (q + 128) as u8,
        16 => {
            let bytes = if BIG {
                (q as i16).to_be_bytes()
            } else {
                (q as i16).to_le_bytes()
            };
            out[..2].copy_from_slice(&bytes);
        }
        24 => {
            if BIG {
                out[..3].copy_from_slice(&q.to_be_bytes()[1..]);
            } else {
                out[..3].copy_from_slice(&q.to_le_bytes()[..3]);
            }
        }
        _ => {
            let bytes = if BIG { q.to_be_bytes() } else { q.to_le_bytes() };
            out[..4].copy_from_slice(&bytes);
        }
    }
}

/// Reads one integer sample in the byte layout of `B` / `BIG`.
#[inline(always)]
pub fn get_sample<B: BitDepthType, const BIG: bool>(bytes: &[u8]) -> i32 {
    match B::BITS {
        8 => bytes[0] as i32 - 128,
        16 => {
            let raw = [bytes[0], bytes[1]];
            (if BIG {
                i16::from_be_bytes(raw)
            } else {
                i16::from_le_bytes(raw)
            }) as i32
        }
        24 => {
            // place the three bytes in the top of an i32, then sign-extend
            let widened = if BIG {
                i32::from_be_bytes([bytes[0], bytes[1], bytes[2], 0])
            } else {
                i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]])
            };
            widened >> 8
        }
        _ => {
            let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
            if BIG {
                i32::from_be_bytes(raw)
            } else {
                i32::from_le_bytes(raw)
            }
        }
    }
}

pub fn encode_linear<B: BitDepthType, const BIG: bool>(src: &[f32], dst: &mut [u8]) {
    assert_eq!(
        dst.len(),
        src.len() * B::BYTES,
        "destination length does not match {} samples",
        src.len()
    );
    for (&x, out) in src.iter().zip(dst.chunks_exact_mut(B::BYTES)) {
        put_sample::<B, BIG>(quantize::<B>(x), out);
    }
}

pub fn encode_alaw(src: &[f32], dst: &mut [u8]) {
    assert_eq!(
        dst.len(),
        src.len(),
        "destination length does not match {} samples",
        src.len()
    );
    for (&x, out) in src.iter().zip(dst.iter_mut()) {
        *out = g711::linear_to_alaw(quantize::<Bit16>(x) as i16);
    }
}

pub fn encode_mulaw(src: &[f32], dst: &mut [u8]) {
    assert_eq!(
        dst.len(),
        src.len(),
        "destination length does not match {} samples",
        src.len()
    );
    for (&x, out) in src.iter().zip(dst.iter_mut()) {
        *out = g711::linear_to_ulaw(quantize::<Bit16>(x) as i16);
    }
}

pub fn decode_linear<B: BitDepthType, const BIG: bool>(src: &[u8], dst: &mut [f32]) {
    assert_eq!(
        src.len(),
        dst.len() * B::BYTES,
        "source length does not match {} samples",
        dst.len()
    );
    for (bytes, out) in src.chunks_exact(B::BYTES).zip(dst.iter_mut()) {
        *out = get_sample::<B, BIG>(bytes) as f32 * B::INV_MAX_VALUE;
    }
}

pub fn decode_alaw(src: &[u8], dst: &mut [f32]) {
    assert_eq!(
        src.len(),
        dst.len(),
        "source length does not match {} samples",
        dst.len()
    );
    let table = &*g711::ALAW_TABLE;
    for (&code, out) in src.iter().zip(dst.iter_mut()) {
        *out = table[code as usize] as f32 * Bit16::INV_MAX_VALUE;
    }
}

pub fn decode_mulaw(src: &[u8], dst: &mut [f32]) {
    assert_eq!(
        src.len(),
        dst.len(),
        "source length does not match {} samples",
        dst.len()
    );
    let table = &*g711::MULAW_TABLE;
    for (&code, out) in src.iter().zip(dst.iter_mut()) {
        *out = table[code as usize] as f32 * Bit16::INV_MAX_VALUE;
    }
}
