//! Bit depth abstraction for linear PCM.
//!
//! Provides both compile-time marker types (`Bit8`, `Bit16`, …), used to
//! monomorphize the conversion kernels, and a dynamic `BitDepth` enum for
//! runtime selection.

use std::fmt;

/// Sample width known at compile time, one zero-sized marker per depth.
///
/// `MAX_VALUE` is the full-scale multiplier `2^(BITS-1)`: a float sample is
/// scaled by it before rounding, and an integer sample is divided by it when
/// decoding.
pub trait BitDepthType {
    const BITS: u32;
    const BYTES: usize;
    const MAX_VALUE: f32;
    const INV_MAX_VALUE: f32;
    /// Smallest encodable integer sample.
    const MIN_SAMPLE: i32;
    /// Largest encodable integer sample.
    const MAX_SAMPLE: i32;
    const DEPTH: BitDepth;
}

// Markers
#[derive(Clone, Copy, Debug)]
pub struct Bit8;
#[derive(Clone, Copy, Debug)]
pub struct Bit16;
#[derive(Clone, Copy, Debug)]
pub struct Bit24;
#[derive(Clone, Copy, Debug)]
pub struct Bit32;

macro_rules! bit_depth_marker {
    ($marker:ident, $bits:literal, $variant:ident) => {
        impl BitDepthType for $marker {
            const BITS: u32 = $bits;
            const BYTES: usize = $bits / 8;
            const MAX_VALUE: f32 = (1u64 << ($bits - 1)) as f32;
            const INV_MAX_VALUE: f32 = 1.0 / Self::MAX_VALUE;
            const MIN_SAMPLE: i32 = (-(1i64 << ($bits - 1))) as i32;
            const MAX_SAMPLE: i32 = ((1i64 << ($bits - 1)) - 1) as i32;
            const DEPTH: BitDepth = BitDepth::$variant;
        }
    };
}

bit_depth_marker!(Bit8, 8, B8);
bit_depth_marker!(Bit16, 16, B16);
bit_depth_marker!(Bit24, 24, B24);
bit_depth_marker!(Bit32, 32, B32);

/// Sample width chosen at run time, ordered by bit count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BitDepth {
    B8,
    B16,
    B24,
    B32,
}

impl BitDepth {
    #[inline(always)]
    pub const fn bits(self) -> u32 {
        match self {
            BitDepth::B8 => 8,
            BitDepth::B16 => 16,
            BitDepth::B24 => 24,
            BitDepth::B32 => 32,
        }
    }

    /// Number of bytes one sample occupies on the wire.
    #[inline(always)]
    pub const fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }

    /// Returns the full-scale multiplier as `f32`.
    #[inline(always)]
    pub const fn max_value(self) -> f32 {
        match self {
            BitDepth::B8 => 128.0,
            BitDepth::B16 => 32_768.0,
            BitDepth::B24 => 8_388_608.0,
            BitDepth::B32 => 2_147_483_648.0,
        }
    }

    /// Smallest encodable integer sample (`-2^(bits-1)`).
    #[inline(always)]
    pub const fn min_sample(self) -> i32 {
        (-(1i64 << (self.bits() - 1))) as i32
    }

    /// Largest encodable integer sample (`2^(bits-1) - 1`).
    #[inline(always)]
    pub const fn max_sample(self) -> i32 {
        ((1i64 << (self.bits() - 1)) - 1) as i32
    }

    /// `None` for widths without a kernel.
    #[inline(always)]
    pub const fn from_u32(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::B8),
            16 => Some(Self::B16),
            24 => Some(Self::B24),
            32 => Some(Self::B32),
            _ => None,
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}
