//! Kernels NEON pour aarch64.
//!
//! `vcvtaq_s32_f32` rounds ties away from zero, saturates, and maps NaN to 0,
//! which is the scalar `round() as i32` in one instruction.

use core::arch::aarch64::*;

use super::scalar;
use crate::bit_depth::{Bit16, BitDepthType};
use crate::g711::{ALAW_TOGGLE, MULAW_BIAS, MULAW_CLIP, MULAW_EXPONENT_OFFSET};

const LANES: usize = 8;

#[inline(always)]
unsafe fn quantize_neon<B: BitDepthType>(x: float32x4_t) -> int32x4_t {
    let rounded = vcvtaq_s32_f32(vmulq_f32(x, vdupq_n_f32(B::MAX_VALUE)));
    vminq_s32(
        vmaxq_s32(rounded, vdupq_n_s32(B::MIN_SAMPLE)),
        vdupq_n_s32(B::MAX_SAMPLE),
    )
}

#[inline(always)]
unsafe fn alaw_neon(q: int32x4_t) -> int32x4_t {
    let negative = vshrq_n_s32(q, 31);
    let ix = vshrq_n_s32(veorq_s32(q, negative), 4);

    // segment = 28 - clz(ix), mantisse = (ix >> (segment - 1)) & 0xF
    let segment = vsubq_s32(vdupq_n_s32(28), vclzq_s32(ix));
    let shift = vsubq_s32(vdupq_n_s32(1), segment);
    let mantissa = vandq_s32(vshlq_s32(ix, shift), vdupq_n_s32(0xF));
    let segmented = vorrq_s32(vshlq_n_s32(segment, 4), mantissa);
    let code = vbslq_s32(vcgtq_s32(ix, vdupq_n_s32(15)), segmented, ix);

    let sign = vbicq_s32(vdupq_n_s32(0x80), negative);
    veorq_s32(vorrq_s32(code, sign), vdupq_n_s32(ALAW_TOGGLE as i32))
}

#[inline(always)]
unsafe fn ulaw_neon(q: int32x4_t) -> int32x4_t {
    let negative = vshrq_n_s32(q, 31);
    let magnitude = veorq_s32(q, negative);
    let biased = vminq_s32(
        vaddq_s32(vshrq_n_s32(magnitude, 2), vdupq_n_s32(MULAW_BIAS)),
        vdupq_n_s32(MULAW_CLIP),
    );

    let bits = vreinterpretq_s32_f32(vcvtq_f32_s32(biased));
    let inner = vshrq_n_s32(vsubq_s32(bits, vdupq_n_s32(MULAW_EXPONENT_OFFSET as i32)), 19);

    let sign = vbicq_s32(vdupq_n_s32(0x80), negative);
    vorrq_s32(veorq_s32(inner, vdupq_n_s32(0x7F)), sign)
}

/// Stores 8 lanes holding values in `0..=255` as 8 bytes.
#[inline(always)]
unsafe fn store_bytes(lo: int32x4_t, hi: int32x4_t, out: &mut [u8]) {
    debug_assert!(out.len() >= LANES);
    let words = vcombine_s16(vqmovn_s32(lo), vqmovn_s32(hi));
    vst1_u8(out.as_mut_ptr(), vqmovun_s16(words));
}

#[inline(always)]
unsafe fn store_linear<B: BitDepthType, const BIG: bool>(lo: int32x4_t, hi: int32x4_t, out: &mut [u8]) {
    debug_assert_eq!(out.len(), LANES * B::BYTES);
    match B::BITS {
        8 => {
            let bias = vdupq_n_s32(128);
            store_bytes(vaddq_s32(lo, bias), vaddq_s32(hi, bias), out);
        }
        16 => {
            let mut bytes = vreinterpretq_u8_s16(vcombine_s16(vqmovn_s32(lo), vqmovn_s32(hi)));
            if BIG {
                bytes = vrev16q_u8(bytes);
            }
            vst1q_u8(out.as_mut_ptr(), bytes);
        }
        24 => {
            let mut lanes = [0i32; LANES];
            vst1q_s32(lanes.as_mut_ptr(), lo);
            vst1q_s32(lanes.as_mut_ptr().add(4), hi);
            for (&q, slot) in lanes.iter().zip(out.chunks_exact_mut(3)) {
                scalar::put_sample::<B, BIG>(q, slot);
            }
        }
        _ => {
            let mut lo = vreinterpretq_u8_s32(lo);
            let mut hi = vreinterpretq_u8_s32(hi);
            if BIG {
                lo = vrev32q_u8(lo);
                hi = vrev32q_u8(hi);
            }
            vst1q_u8(out.as_mut_ptr(), lo);
            vst1q_u8(out.as_mut_ptr().add(16), hi);
        }
    }
}

#[inline(always)]
unsafe fn load_linear<B: BitDepthType, const BIG: bool>(bytes: &[u8]) -> (int32x4_t, int32x4_t) {
    debug_assert_eq!(bytes.len(), LANES * B::BYTES);
    let p = bytes.as_ptr();
    match B::BITS {
        8 => {
            let words = vreinterpretq_s16_u16(vmovl_u8(vld1_u8(p)));
            let bias = vdupq_n_s32(128);
            (
                vsubq_s32(vmovl_s16(vget_low_s16(words)), bias),
                vsubq_s32(vmovl_s16(vget_high_s16(words)), bias),
            )
        }
        16 => {
            let mut raw = vld1q_u8(p);
            if BIG {
                raw = vrev16q_u8(raw);
            }
            let words = vreinterpretq_s16_u8(raw);
            (vmovl_s16(vget_low_s16(words)), vmovl_s16(vget_high_s16(words)))
        }
        24 => {
            let mut lanes = [0i32; LANES];
            for (q, sample) in lanes.iter_mut().zip(bytes.chunks_exact(3)) {
                *q = scalar::get_sample::<B, BIG>(sample);
            }
            (vld1q_s32(lanes.as_ptr()), vld1q_s32(lanes.as_ptr().add(4)))
        }
        _ => {
            let mut lo = vld1q_u8(p);
            let mut hi = vld1q_u8(p.add(16));
            if BIG {
                lo = vrev32q_u8(lo);
                hi = vrev32q_u8(hi);
            }
            (vreinterpretq_s32_u8(lo), vreinterpretq_s32_u8(hi))
        }
    }
}

#[target_feature(enable = "neon")]
unsafe fn encode_linear_neon<B: BitDepthType, const BIG: bool>(src: &[f32], dst: &mut [u8]) {
    let n = src.len();
    let ptr = src.as_ptr();
    let mut i = 0;

    while i + LANES <= n {
        let lo = quantize_neon::<B>(vld1q_f32(ptr.add(i)));
        let hi = quantize_neon::<B>(vld1q_f32(ptr.add(i + 4)));
        store_linear::<B, BIG>(lo, hi, &mut dst[i * B::BYTES..(i + LANES) * B::BYTES]);
        i += LANES;
    }

    // reste scalaire
    scalar::encode_linear::<B, BIG>(&src[i..], &mut dst[i * B::BYTES..]);
}

#[target_feature(enable = "neon")]
unsafe fn encode_g711_neon(src: &[f32], dst: &mut [u8], alaw: bool) -> usize {
    let n = src.len();
    let ptr = src.as_ptr();
    let mut i = 0;

    while i + LANES <= n {
        let lo = quantize_neon::<Bit16>(vld1q_f32(ptr.add(i)));
        let hi = quantize_neon::<Bit16>(vld1q_f32(ptr.add(i + 4)));
        let (lo, hi) = if alaw {
            (alaw_neon(lo), alaw_neon(hi))
        } else {
            (ulaw_neon(lo), ulaw_neon(hi))
        };
        store_bytes(lo, hi, &mut dst[i..i + LANES]);
        i += LANES;
    }
    i
}

#[target_feature(enable = "neon")]
unsafe fn decode_linear_neon<B: BitDepthType, const BIG: bool>(src: &[u8], dst: &mut [f32]) {
    let n = dst.len();
    let out = dst.as_mut_ptr();
    let inv = vdupq_n_f32(B::INV_MAX_VALUE);
    let mut i = 0;

    while i + LANES <= n {
        let (lo, hi) = load_linear::<B, BIG>(&src[i * B::BYTES..(i + LANES) * B::BYTES]);
        vst1q_f32(out.add(i), vmulq_f32(vcvtq_f32_s32(lo), inv));
        vst1q_f32(out.add(i + 4), vmulq_f32(vcvtq_f32_s32(hi), inv));
        i += LANES;
    }

    scalar::decode_linear::<B, BIG>(&src[i * B::BYTES..], &mut dst[i..]);
}

// SAFETY (all wrappers below): NEON availability is checked by
// `KernelTable::for_tier`; loops never index past `src.len()` / `dst.len()`.

pub fn encode_linear<B: BitDepthType, const BIG: bool>(src: &[f32], dst: &mut [u8]) {
    unsafe { encode_linear_neon::<B, BIG>(src, dst) }
}

pub fn encode_alaw(src: &[f32], dst: &mut [u8]) {
    let done = unsafe { encode_g711_neon(src, dst, true) };
    scalar::encode_alaw(&src[done..], &mut dst[done..]);
}

pub fn encode_mulaw(src: &[f32], dst: &mut [u8]) {
    let done = unsafe { encode_g711_neon(src, dst, false) };
    scalar::encode_mulaw(&src[done..], &mut dst[done..]);
}

pub fn decode_linear<B: BitDepthType, const BIG: bool>(src: &[u8], dst: &mut [f32]) {
    unsafe { decode_linear_neon::<B, BIG>(src, dst) }
}

pub fn decode_alaw(src: &[u8], dst: &mut [f32]) {
    scalar::decode_alaw(src, dst)
}

pub fn decode_mulaw(src: &[u8], dst: &mut [f32]) {
    scalar::decode_mulaw(src, dst)
}
