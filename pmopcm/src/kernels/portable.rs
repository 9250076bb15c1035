//! Kernels `std::simd` (feature `simd`, nightly).
//!
//! Same arithmetic as the intrinsic tiers, expressed once for any target:
//! the vector `round` already ties away from zero and the `f32 -> i32` cast
//! saturates with NaN mapped to 0, exactly like the scalar `as`.

use std::simd::prelude::*;
use std::simd::StdFloat;

use super::scalar;
use crate::bit_depth::{Bit16, BitDepthType};
use crate::g711::{
    ALAW_EXPONENT_OFFSET, ALAW_TOGGLE, MULAW_BIAS, MULAW_CLIP, MULAW_EXPONENT_OFFSET,
};

const LANES: usize = 8;
type Vf32 = Simd<f32, LANES>;
type Vi32 = Simd<i32, LANES>;

#[inline(always)]
fn quantize<B: BitDepthType>(x: Vf32) -> Vi32 {
    (x * Vf32::splat(B::MAX_VALUE))
        .round()
        .cast::<i32>()
        .simd_clamp(Vi32::splat(B::MIN_SAMPLE), Vi32::splat(B::MAX_SAMPLE))
}

/// Exponent field of `v` converted to `f32`, minus `offset`, shifted down to
/// the 3-bit segment and 4-bit mantissa.
#[inline(always)]
fn segment_code(v: Vi32, offset: u32) -> Vi32 {
    let bits = v.cast::<f32>().to_bits();
    ((bits - Simd::splat(offset)) >> Simd::splat(19)).cast::<i32>()
}

#[inline(always)]
fn alaw(q: Vi32) -> Vi32 {
    let negative = q >> Vi32::splat(31);
    let ix = (q ^ negative) >> Vi32::splat(4);
    let code = ix
        .simd_gt(Vi32::splat(15))
        .select(segment_code(ix, ALAW_EXPONENT_OFFSET), ix);
    let sign = !negative & Vi32::splat(0x80);
    (code | sign) ^ Vi32::splat(ALAW_TOGGLE as i32)
}

#[inline(always)]
fn ulaw(q: Vi32) -> Vi32 {
    let negative = q >> Vi32::splat(31);
    let magnitude = q ^ negative;
    let biased = ((magnitude >> Vi32::splat(2)) + Vi32::splat(MULAW_BIAS))
        .simd_min(Vi32::splat(MULAW_CLIP));
    let sign = !negative & Vi32::splat(0x80);
    (segment_code(biased, MULAW_EXPONENT_OFFSET) ^ Vi32::splat(0x7F)) | sign
}

pub fn encode_linear<B: BitDepthType, const BIG: bool>(src: &[f32], dst: &mut [u8]) {
    assert_eq!(
        dst.len(),
        src.len() * B::BYTES,
        "destination length does not match {} samples",
        src.len()
    );
    let (chunks, tail) = src.as_chunks::<LANES>();
    let (body, rest) = dst.split_at_mut(chunks.len() * LANES * B::BYTES);

    for (blk, out) in chunks.iter().zip(body.chunks_exact_mut(LANES * B::BYTES)) {
        let q = quantize::<B>(Vf32::from_array(*blk));
        for (&s, slot) in q.as_array().iter().zip(out.chunks_exact_mut(B::BYTES)) {
            scalar::put_sample::<B, BIG>(s, slot);
        }
    }

    // Reste scalaire
    scalar::encode_linear::<B, BIG>(tail, rest);
}

#[inline(always)]
fn encode_g711(src: &[f32], dst: &mut [u8], compress: fn(Vi32) -> Vi32) -> usize {
    let (chunks, _) = src.as_chunks::<LANES>();
    let (body, _) = dst.as_chunks_mut::<LANES>();
    for (blk, out) in chunks.iter().zip(body.iter_mut()) {
        let codes = compress(quantize::<Bit16>(Vf32::from_array(*blk)));
        *out = codes.cast::<u8>().to_array();
    }
    chunks.len() * LANES
}

pub fn encode_alaw(src: &[f32], dst: &mut [u8]) {
    assert_eq!(
        dst.len(),
        src.len(),
        "destination length does not match {} samples",
        src.len()
    );
    let done = encode_g711(src, dst, alaw);
    scalar::encode_alaw(&src[done..], &mut dst[done..]);
}

pub fn encode_mulaw(src: &[f32], dst: &mut [u8]) {
    assert_eq!(
        dst.len(),
        src.len(),
        "destination length does not match {} samples",
        src.len()
    );
    let done = encode_g711(src, dst, ulaw);
    scalar::encode_mulaw(&src[done..], &mut dst[done..]);
}

pub fn decode_linear<B: BitDepthType, const BIG: bool>(src: &[u8], dst: &mut [f32]) {
    assert_eq!(
        src.len(),
        dst.len() * B::BYTES,
        "source length does not match {} samples",
        dst.len()
    );
    let scale = Vf32::splat(B::INV_MAX_VALUE);
    let (chunks, tail) = dst.as_chunks_mut::<LANES>();
    let (body, rest) = src.split_at(chunks.len() * LANES * B::BYTES);

    for (out, bytes) in chunks.iter_mut().zip(body.chunks_exact(LANES * B::BYTES)) {
        let mut q = [0i32; LANES];
        for (slot, sample) in q.iter_mut().zip(bytes.chunks_exact(B::BYTES)) {
            *slot = scalar::get_sample::<B, BIG>(sample);
        }
        *out = (Vi32::from_array(q).cast::<f32>() * scale).to_array();
    }

    scalar::decode_linear::<B, BIG>(rest, tail);
}

pub fn decode_alaw(src: &[u8], dst: &mut [f32]) {
    scalar::decode_alaw(src, dst)
}

pub fn decode_mulaw(src: &[u8], dst: &mut [f32]) {
    scalar::decode_mulaw(src, dst)
}
