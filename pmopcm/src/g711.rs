//! ITU-T G.711 A-law and μ-law on 16-bit linear samples.
//!
//! Compression is branch-free: the logarithmic segment comes from a
//! leading-zero count (A-law) or from the exponent field of an exact `f32`
//! conversion (μ-law), so the vector kernels can mirror it lane by lane.
//! Expansion goes through 256-entry tables built once.

use once_cell::sync::Lazy;

/// XOR mask toggling the even bits of an A-law code.
pub const ALAW_TOGGLE: u8 = 0x55;

/// Offset added to the 14-bit μ-law magnitude before segment search.
pub const MULAW_BIAS: i32 = 33;

/// Largest biased μ-law magnitude.
pub const MULAW_CLIP: i32 = 0x1FFF;

/// Exponent bias plus segment offset removed from the bit pattern of the
/// biased μ-law magnitude (`f32` exponent 127 + 5 bits below segment 1).
pub(crate) const MULAW_EXPONENT_OFFSET: u32 = 132 << 23;

/// Same trick for A-law magnitudes of 16 and above.
pub(crate) const ALAW_EXPONENT_OFFSET: u32 = 130 << 23;

/// Compresses one 16-bit linear sample to A-law.
#[inline]
pub fn linear_to_alaw(sample: i16) -> u8 {
    let s = sample as i32;
    // ones' complement for negative samples
    let magnitude = s ^ (s >> 31);
    let ix = (magnitude >> 4) as u32;

    let code = if ix < 16 {
        ix
    } else {
        let segment = 28 - ix.leading_zeros();
        (segment << 4) | ((ix >> (segment - 1)) & 0xF)
    };
    let sign = if s >= 0 { 0x80 } else { 0 };
    (code as u8 | sign) ^ ALAW_TOGGLE
}

/// Compresses one 16-bit linear sample to μ-law.
#[inline]
pub fn linear_to_ulaw(sample: i16) -> u8 {
    let s = sample as i32;
    let magnitude = s ^ (s >> 31);
    let biased = ((magnitude >> 2) + MULAW_BIAS).min(MULAW_CLIP);

    // `biased` fits in 13 bits, so the conversion is exact and the exponent
    // field holds floor(log2(biased)).
    let bits = (biased as f32).to_bits();
    let segment_mantissa = (bits - MULAW_EXPONENT_OFFSET) >> 19;
    let sign = if s >= 0 { 0x80 } else { 0 };
    (segment_mantissa as u8 ^ 0x7F) | sign
}

/// Expands one A-law code to a 16-bit linear sample.
#[inline]
pub fn alaw_to_linear(code: u8) -> i16 {
    ALAW_TABLE[code as usize]
}

/// Expands one μ-law code to a 16-bit linear sample.
#[inline]
pub fn ulaw_to_linear(code: u8) -> i16 {
    MULAW_TABLE[code as usize]
}

pub(crate) static ALAW_TABLE: Lazy<[i16; 256]> = Lazy::new(|| {
    let mut table = [0i16; 256];
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = expand_alaw(code as u8);
    }
    table
});

pub(crate) static MULAW_TABLE: Lazy<[i16; 256]> = Lazy::new(|| {
    let mut table = [0i16; 256];
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = expand_ulaw(code as u8);
    }
    table
});

fn expand_alaw(code: u8) -> i16 {
    let ix = (code ^ ALAW_TOGGLE) as i32 & 0x7F;
    let exponent = ix >> 4;
    let mut mantissa = ix & 0xF;
    if exponent > 0 {
        mantissa += 16;
    }
    mantissa = (mantissa << 4) + 8;
    if exponent > 1 {
        mantissa <<= exponent - 1;
    }
    if code & 0x80 != 0 {
        mantissa as i16
    } else {
        -mantissa as i16
    }
}

fn expand_ulaw(code: u8) -> i16 {
    let inverted = !code as i32;
    let exponent = (inverted >> 4) & 0x7;
    let mantissa = inverted & 0xF;
    let step = 4 << (exponent + 1);
    let magnitude = (0x80 << exponent) + step * mantissa + step / 2 - 4 * MULAW_BIAS;
    if code & 0x80 != 0 {
        magnitude as i16
    } else {
        -magnitude as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Loop-based compressors from the ITU-T software tools library, used as
    // the oracle for the branch-free versions.
    fn alaw_compress_loop(sample: i16) -> u8 {
        let mut ix = if sample < 0 {
            (((!sample) as u16) >> 4) as i16
        } else {
            sample >> 4
        };
        if ix > 15 {
            let mut iexp = 1;
            while ix > 16 + 15 {
                ix >>= 1;
                iexp += 1;
            }
            ix -= 16;
            ix += iexp << 4;
        }
        if sample >= 0 {
            ix |= 0x0080;
        }
        (ix ^ 0x0055) as u8
    }

    fn ulaw_compress_loop(sample: i16) -> u8 {
        let absno = if sample < 0 {
            (((!sample) as u16) >> 2) as i16 + 33
        } else {
            (sample >> 2) + 33
        };
        let absno = absno.min(0x1FFF);
        let mut i = absno >> 6;
        let mut segno = 1;
        while i != 0 {
            segno += 1;
            i >>= 1;
        }
        let high_nibble = 0x0008 - segno;
        let low_nibble = 0x000F - ((absno >> segno) & 0x000F);
        let mut result = (high_nibble << 4) | low_nibble;
        if sample >= 0 {
            result |= 0x0080;
        }
        result as u8
    }

    #[test]
    fn alaw_matches_reference_for_every_sample() {
        for sample in i16::MIN..=i16::MAX {
            assert_eq!(
                linear_to_alaw(sample),
                alaw_compress_loop(sample),
                "sample {sample}"
            );
        }
    }

    #[test]
    fn ulaw_matches_reference_for_every_sample() {
        for sample in i16::MIN..=i16::MAX {
            assert_eq!(
                linear_to_ulaw(sample),
                ulaw_compress_loop(sample),
                "sample {sample}"
            );
        }
    }

    #[test]
    fn alaw_codes_survive_expansion() {
        for code in 0..=255u8 {
            assert_eq!(linear_to_alaw(alaw_to_linear(code)), code);
        }
    }

    #[test]
    fn ulaw_expansion_is_idempotent() {
        for code in 0..=255u8 {
            let once = linear_to_ulaw(ulaw_to_linear(code));
            // 0x7F is negative zero and folds onto 0xFF
            if code == 0x7F {
                assert_eq!(once, 0xFF);
            } else {
                assert_eq!(once, code);
            }
            assert_eq!(linear_to_ulaw(ulaw_to_linear(once)), once);
        }
    }

    #[test]
    fn well_known_codes() {
        assert_eq!(linear_to_alaw(0), 0xD5);
        assert_eq!(linear_to_alaw(-1), 0x55);
        assert_eq!(linear_to_alaw(i16::MAX), 0xAA);
        assert_eq!(linear_to_alaw(i16::MIN), 0x2A);
        assert_eq!(linear_to_ulaw(0), 0xFF);
        assert_eq!(linear_to_ulaw(i16::MAX), 0x80);
        assert_eq!(linear_to_ulaw(i16::MIN), 0x00);
        assert_eq!(ulaw_to_linear(0xFF), 0);
        assert_eq!(ulaw_to_linear(0x80), 32_124);
        assert_eq!(alaw_to_linear(0xAA), 32_256);
    }
}
