//! Kernels SSE2 / AVX2 pour x86_64.
//!
//! Both tiers process 8 samples per iteration and hand the remainder to the
//! scalar kernels. Quantization reproduces `f32::round` exactly: truncate,
//! then step one unit away from zero when the dropped fraction is at least
//! one half.
//!
//! G.711 expansion stays table driven in every tier.

use core::arch::x86_64::*;

use super::scalar;
use crate::bit_depth::{Bit16, BitDepthType};
use crate::g711::{
    ALAW_EXPONENT_OFFSET, ALAW_TOGGLE, MULAW_BIAS, MULAW_CLIP, MULAW_EXPONENT_OFFSET,
};

const LANES: usize = 8;

/* ============================== SSE2 ============================== */

#[inline(always)]
unsafe fn select_epi32(mask: __m128i, a: __m128i, b: __m128i) -> __m128i {
    _mm_or_si128(_mm_and_si128(mask, a), _mm_andnot_si128(mask, b))
}

#[inline(always)]
unsafe fn bswap16(x: __m128i) -> __m128i {
    _mm_or_si128(_mm_slli_epi16(x, 8), _mm_srli_epi16(x, 8))
}

#[inline(always)]
unsafe fn bswap32(x: __m128i) -> __m128i {
    // octets échangés dans chaque mot, puis les deux mots de chaque lane
    let x = bswap16(x);
    _mm_shufflehi_epi16(_mm_shufflelo_epi16(x, 0xB1), 0xB1)
}

#[inline(always)]
unsafe fn quantize_sse2<B: BitDepthType>(x: __m128) -> __m128i {
    let scale = _mm_set1_ps(B::MAX_VALUE);
    let v = _mm_mul_ps(x, scale);
    // NaN -> 0
    let v = _mm_and_ps(v, _mm_cmpord_ps(v, v));
    let v = _mm_min_ps(_mm_max_ps(v, _mm_set1_ps(-B::MAX_VALUE)), scale);

    let t = _mm_cvttps_epi32(v);
    let frac = _mm_sub_ps(v, _mm_cvtepi32_ps(t));
    let abs_frac = _mm_andnot_ps(_mm_set1_ps(-0.0), frac);
    let round_up = _mm_castps_si128(_mm_cmpge_ps(abs_frac, _mm_set1_ps(0.5)));
    let unit = _mm_or_si128(_mm_srai_epi32(_mm_castps_si128(v), 31), _mm_set1_epi32(1));
    let rounded = _mm_add_epi32(t, _mm_and_si128(round_up, unit));

    // tout ce qui arrondit à 2^(n-1) sature (et évite le débordement de cvttps en 32 bits)
    let high = _mm_castps_si128(_mm_cmpge_ps(v, _mm_set1_ps(B::MAX_VALUE - 0.5)));
    select_epi32(high, _mm_set1_epi32(B::MAX_SAMPLE), rounded)
}

#[inline(always)]
unsafe fn alaw_sse2(q: __m128i) -> __m128i {
    let negative = _mm_srai_epi32(q, 31);
    let magnitude = _mm_xor_si128(q, negative);
    let ix = _mm_srai_epi32(magnitude, 4);

    let bits = _mm_castps_si128(_mm_cvtepi32_ps(ix));
    let segmented = _mm_srli_epi32(
        _mm_sub_epi32(bits, _mm_set1_epi32(ALAW_EXPONENT_OFFSET as i32)),
        19,
    );
    let code = select_epi32(_mm_cmpgt_epi32(ix, _mm_set1_epi32(15)), segmented, ix);

    let sign = _mm_andnot_si128(negative, _mm_set1_epi32(0x80));
    _mm_xor_si128(_mm_or_si128(code, sign), _mm_set1_epi32(ALAW_TOGGLE as i32))
}

#[inline(always)]
unsafe fn ulaw_sse2(q: __m128i) -> __m128i {
    let negative = _mm_srai_epi32(q, 31);
    let magnitude = _mm_xor_si128(q, negative);
    let clip = _mm_set1_epi32(MULAW_CLIP);
    let biased = _mm_add_epi32(_mm_srai_epi32(magnitude, 2), _mm_set1_epi32(MULAW_BIAS));
    let biased = select_epi32(_mm_cmpgt_epi32(biased, clip), clip, biased);

    let bits = _mm_castps_si128(_mm_cvtepi32_ps(biased));
    let inner = _mm_srli_epi32(
        _mm_sub_epi32(bits, _mm_set1_epi32(MULAW_EXPONENT_OFFSET as i32)),
        19,
    );

    let sign = _mm_andnot_si128(negative, _mm_set1_epi32(0x80));
    _mm_or_si128(_mm_xor_si128(inner, _mm_set1_epi32(0x7F)), sign)
}

/// Stores 8 lanes holding values in `0..=255` as 8 bytes.
#[inline(always)]
unsafe fn store_bytes(lo: __m128i, hi: __m128i, out: &mut [u8]) {
    debug_assert!(out.len() >= LANES);
    let words = _mm_packs_epi32(lo, hi);
    let bytes = _mm_packus_epi16(words, words);
    _mm_storel_epi64(out.as_mut_ptr() as *mut __m128i, bytes);
}

/// Stores 8 quantized samples, `out` holds exactly `8 * B::BYTES` bytes.
#[inline(always)]
unsafe fn store_linear<B: BitDepthType, const BIG: bool>(lo: __m128i, hi: __m128i, out: &mut [u8]) {
    debug_assert_eq!(out.len(), LANES * B::BYTES);
    match B::BITS {
        8 => {
            let bias = _mm_set1_epi32(128);
            store_bytes(_mm_add_epi32(lo, bias), _mm_add_epi32(hi, bias), out);
        }
        16 => {
            let mut words = _mm_packs_epi32(lo, hi);
            if BIG {
                words = bswap16(words);
            }
            _mm_storeu_si128(out.as_mut_ptr() as *mut __m128i, words);
        }
        24 => {
            // pas de shuffle 3 octets en SSE2
            let lanes: [i32; LANES] = bytemuck::cast([lo, hi]);
            for (&q, slot) in lanes.iter().zip(out.chunks_exact_mut(3)) {
                scalar::put_sample::<B, BIG>(q, slot);
            }
        }
        _ => {
            let (lo, hi) = if BIG { (bswap32(lo), bswap32(hi)) } else { (lo, hi) };
            _mm_storeu_si128(out.as_mut_ptr() as *mut __m128i, lo);
            _mm_storeu_si128(out.as_mut_ptr().add(16) as *mut __m128i, hi);
        }
    }
}

/// Loads 8 samples as two vectors of sign-extended integers.
#[inline(always)]
unsafe fn load_linear<B: BitDepthType, const BIG: bool>(bytes: &[u8]) -> (__m128i, __m128i) {
    debug_assert_eq!(bytes.len(), LANES * B::BYTES);
    let p = bytes.as_ptr();
    match B::BITS {
        8 => {
            let zero = _mm_setzero_si128();
            let bias = _mm_set1_epi32(128);
            let words = _mm_unpacklo_epi8(_mm_loadl_epi64(p as *const __m128i), zero);
            (
                _mm_sub_epi32(_mm_unpacklo_epi16(words, zero), bias),
                _mm_sub_epi32(_mm_unpackhi_epi16(words, zero), bias),
            )
        }
        16 => {
            let mut words = _mm_loadu_si128(p as *const __m128i);
            if BIG {
                words = bswap16(words);
            }
            // chaque mot dupliqué dans sa lane, puis décalage arithmétique
            (
                _mm_srai_epi32(_mm_unpacklo_epi16(words, words), 16),
                _mm_srai_epi32(_mm_unpackhi_epi16(words, words), 16),
            )
        }
        24 => {
            let mut lanes = [0i32; LANES];
            for (q, sample) in lanes.iter_mut().zip(bytes.chunks_exact(3)) {
                *q = scalar::get_sample::<B, BIG>(sample);
            }
            let [lo, hi]: [__m128i; 2] = bytemuck::cast(lanes);
            (lo, hi)
        }
        _ => {
            let lo = _mm_loadu_si128(p as *const __m128i);
            let hi = _mm_loadu_si128(p.add(16) as *const __m128i);
            if BIG {
                (bswap32(lo), bswap32(hi))
            } else {
                (lo, hi)
            }
        }
    }
}

unsafe fn encode_linear_sse2<B: BitDepthType, const BIG: bool>(src: &[f32], dst: &mut [u8]) {
    let n = src.len();
    let ptr = src.as_ptr();
    let mut i = 0;

    while i + LANES <= n {
        let lo = quantize_sse2::<B>(_mm_loadu_ps(ptr.add(i)));
        let hi = quantize_sse2::<B>(_mm_loadu_ps(ptr.add(i + 4)));
        store_linear::<B, BIG>(lo, hi, &mut dst[i * B::BYTES..(i + LANES) * B::BYTES]);
        i += LANES;
    }

    // reste scalaire
    scalar::encode_linear::<B, BIG>(&src[i..], &mut dst[i * B::BYTES..]);
}

unsafe fn encode_alaw_sse2(src: &[f32], dst: &mut [u8]) {
    let n = src.len();
    let ptr = src.as_ptr();
    let mut i = 0;

    while i + LANES <= n {
        let lo = alaw_sse2(quantize_sse2::<Bit16>(_mm_loadu_ps(ptr.add(i))));
        let hi = alaw_sse2(quantize_sse2::<Bit16>(_mm_loadu_ps(ptr.add(i + 4))));
        store_bytes(lo, hi, &mut dst[i..i + LANES]);
        i += LANES;
    }

    scalar::encode_alaw(&src[i..], &mut dst[i..]);
}

unsafe fn encode_mulaw_sse2(src: &[f32], dst: &mut [u8]) {
    let n = src.len();
    let ptr = src.as_ptr();
    let mut i = 0;

    while i + LANES <= n {
        let lo = ulaw_sse2(quantize_sse2::<Bit16>(_mm_loadu_ps(ptr.add(i))));
        let hi = ulaw_sse2(quantize_sse2::<Bit16>(_mm_loadu_ps(ptr.add(i + 4))));
        store_bytes(lo, hi, &mut dst[i..i + LANES]);
        i += LANES;
    }

    scalar::encode_mulaw(&src[i..], &mut dst[i..]);
}

unsafe fn decode_linear_sse2<B: BitDepthType, const BIG: bool>(src: &[u8], dst: &mut [f32]) {
    let n = dst.len();
    let out = dst.as_mut_ptr();
    let inv = _mm_set1_ps(B::INV_MAX_VALUE);
    let mut i = 0;

    while i + LANES <= n {
        let (lo, hi) = load_linear::<B, BIG>(&src[i * B::BYTES..(i + LANES) * B::BYTES]);
        _mm_storeu_ps(out.add(i), _mm_mul_ps(_mm_cvtepi32_ps(lo), inv));
        _mm_storeu_ps(out.add(i + 4), _mm_mul_ps(_mm_cvtepi32_ps(hi), inv));
        i += LANES;
    }

    scalar::decode_linear::<B, BIG>(&src[i * B::BYTES..], &mut dst[i..]);
}

/* ============================== AVX2 ============================== */

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn quantize_avx2<B: BitDepthType>(x: __m256) -> __m256i {
    let scale = _mm256_set1_ps(B::MAX_VALUE);
    let v = _mm256_mul_ps(x, scale);
    let v = _mm256_and_ps(v, _mm256_cmp_ps(v, v, _CMP_ORD_Q));
    let v = _mm256_min_ps(_mm256_max_ps(v, _mm256_set1_ps(-B::MAX_VALUE)), scale);

    let t = _mm256_cvttps_epi32(v);
    let frac = _mm256_sub_ps(v, _mm256_cvtepi32_ps(t));
    let abs_frac = _mm256_andnot_ps(_mm256_set1_ps(-0.0), frac);
    let round_up = _mm256_castps_si256(_mm256_cmp_ps(abs_frac, _mm256_set1_ps(0.5), _CMP_GE_OQ));
    let unit = _mm256_or_si256(
        _mm256_srai_epi32(_mm256_castps_si256(v), 31),
        _mm256_set1_epi32(1),
    );
    let rounded = _mm256_add_epi32(t, _mm256_and_si256(round_up, unit));

    let high = _mm256_castps_si256(_mm256_cmp_ps(
        v,
        _mm256_set1_ps(B::MAX_VALUE - 0.5),
        _CMP_GE_OQ,
    ));
    _mm256_blendv_epi8(rounded, _mm256_set1_epi32(B::MAX_SAMPLE), high)
}

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn alaw_avx2(q: __m256i) -> __m256i {
    let negative = _mm256_srai_epi32(q, 31);
    let magnitude = _mm256_xor_si256(q, negative);
    let ix = _mm256_srai_epi32(magnitude, 4);

    let bits = _mm256_castps_si256(_mm256_cvtepi32_ps(ix));
    let segmented = _mm256_srli_epi32(
        _mm256_sub_epi32(bits, _mm256_set1_epi32(ALAW_EXPONENT_OFFSET as i32)),
        19,
    );
    let wide = _mm256_cmpgt_epi32(ix, _mm256_set1_epi32(15));
    let code = _mm256_blendv_epi8(ix, segmented, wide);

    let sign = _mm256_andnot_si256(negative, _mm256_set1_epi32(0x80));
    _mm256_xor_si256(_mm256_or_si256(code, sign), _mm256_set1_epi32(ALAW_TOGGLE as i32))
}

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn ulaw_avx2(q: __m256i) -> __m256i {
    let negative = _mm256_srai_epi32(q, 31);
    let magnitude = _mm256_xor_si256(q, negative);
    let biased = _mm256_min_epi32(
        _mm256_add_epi32(_mm256_srai_epi32(magnitude, 2), _mm256_set1_epi32(MULAW_BIAS)),
        _mm256_set1_epi32(MULAW_CLIP),
    );

    let bits = _mm256_castps_si256(_mm256_cvtepi32_ps(biased));
    let inner = _mm256_srli_epi32(
        _mm256_sub_epi32(bits, _mm256_set1_epi32(MULAW_EXPONENT_OFFSET as i32)),
        19,
    );

    let sign = _mm256_andnot_si256(negative, _mm256_set1_epi32(0x80));
    _mm256_or_si256(_mm256_xor_si256(inner, _mm256_set1_epi32(0x7F)), sign)
}

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn halves(v: __m256i) -> (__m128i, __m128i) {
    (_mm256_castsi256_si128(v), _mm256_extracti128_si256(v, 1))
}

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn load_linear_avx2<B: BitDepthType, const BIG: bool>(bytes: &[u8]) -> __m256i {
    let p = bytes.as_ptr();
    match B::BITS {
        8 => _mm256_sub_epi32(
            _mm256_cvtepu8_epi32(_mm_loadl_epi64(p as *const __m128i)),
            _mm256_set1_epi32(128),
        ),
        16 => {
            let mut words = _mm_loadu_si128(p as *const __m128i);
            if BIG {
                words = bswap16(words);
            }
            _mm256_cvtepi16_epi32(words)
        }
        _ => {
            let (lo, hi) = load_linear::<B, BIG>(bytes);
            _mm256_set_m128i(hi, lo)
        }
    }
}

#[target_feature(enable = "avx2")]
unsafe fn encode_linear_avx2<B: BitDepthType, const BIG: bool>(src: &[f32], dst: &mut [u8]) {
    let n = src.len();
    let ptr = src.as_ptr();
    let mut i = 0;

    while i + LANES <= n {
        let (lo, hi) = halves(quantize_avx2::<B>(_mm256_loadu_ps(ptr.add(i))));
        store_linear::<B, BIG>(lo, hi, &mut dst[i * B::BYTES..(i + LANES) * B::BYTES]);
        i += LANES;
    }

    // reste scalaire
    scalar::encode_linear::<B, BIG>(&src[i..], &mut dst[i * B::BYTES..]);
}

#[target_feature(enable = "avx2")]
unsafe fn encode_alaw_avx2(src: &[f32], dst: &mut [u8]) {
    let n = src.len();
    let ptr = src.as_ptr();
    let mut i = 0;

    while i + LANES <= n {
        let (lo, hi) = halves(alaw_avx2(quantize_avx2::<Bit16>(_mm256_loadu_ps(ptr.add(i)))));
        store_bytes(lo, hi, &mut dst[i..i + LANES]);
        i += LANES;
    }

    scalar::encode_alaw(&src[i..], &mut dst[i..]);
}

#[target_feature(enable = "avx2")]
unsafe fn encode_mulaw_avx2(src: &[f32], dst: &mut [u8]) {
    let n = src.len();
    let ptr = src.as_ptr();
    let mut i = 0;

    while i + LANES <= n {
        let (lo, hi) = halves(ulaw_avx2(quantize_avx2::<Bit16>(_mm256_loadu_ps(ptr.add(i)))));
        store_bytes(lo, hi, &mut dst[i..i + LANES]);
        i += LANES;
    }

    scalar::encode_mulaw(&src[i..], &mut dst[i..]);
}

#[target_feature(enable = "avx2")]
unsafe fn decode_linear_avx2<B: BitDepthType, const BIG: bool>(src: &[u8], dst: &mut [f32]) {
    let n = dst.len();
    let out = dst.as_mut_ptr();
    let inv = _mm256_set1_ps(B::INV_MAX_VALUE);
    let mut i = 0;

    while i + LANES <= n {
        let q = load_linear_avx2::<B, BIG>(&src[i * B::BYTES..(i + LANES) * B::BYTES]);
        _mm256_storeu_ps(out.add(i), _mm256_mul_ps(_mm256_cvtepi32_ps(q), inv));
        i += LANES;
    }

    scalar::decode_linear::<B, BIG>(&src[i * B::BYTES..], &mut dst[i..]);
}

/* ========================= façades sûres ========================= */

/// Génère un module de kernels sûrs pour un tier à partir des fonctions
/// `unsafe` suffixées par son nom.
macro_rules! safe_tier {
    ($tier:ident) => {
        paste::paste! {
            /// Only reachable through `KernelTable::for_tier`, which checks the
            /// CPU feature before handing the table out.
            pub(crate) mod $tier {
                use super::*;

                pub fn encode_linear<B: BitDepthType, const BIG: bool>(src: &[f32], dst: &mut [u8]) {
                    // SAFETY: CPU feature checked at table lookup; every access is bounded by `src.len()`.
                    unsafe { [<encode_linear_ $tier>]::<B, BIG>(src, dst) }
                }

                pub fn encode_alaw(src: &[f32], dst: &mut [u8]) {
                    // SAFETY: see `encode_linear`.
                    unsafe { [<encode_alaw_ $tier>](src, dst) }
                }

                pub fn encode_mulaw(src: &[f32], dst: &mut [u8]) {
                    // SAFETY: see `encode_linear`.
                    unsafe { [<encode_mulaw_ $tier>](src, dst) }
                }

                pub fn decode_linear<B: BitDepthType, const BIG: bool>(src: &[u8], dst: &mut [f32]) {
                    // SAFETY: CPU feature checked at table lookup; every access is bounded by `dst.len()`.
                    unsafe { [<decode_linear_ $tier>]::<B, BIG>(src, dst) }
                }

                pub fn decode_alaw(src: &[u8], dst: &mut [f32]) {
                    scalar::decode_alaw(src, dst)
                }

                pub fn decode_mulaw(src: &[u8], dst: &mut [f32]) {
                    scalar::decode_mulaw(src, dst)
                }
            }
        }
    };
}

safe_tier!(sse2);
safe_tier!(avx2);
