//! Conversion kernels and their dispatch tables.
//!
//! Each tier exposes the same set of free functions (`encode_linear`,
//! `encode_alaw`, `encode_mulaw`, `decode_linear`, `decode_alaw`,
//! `decode_mulaw`); [`KernelTable`] binds one tier's functions to every
//! [`WireLayout`] so the hot path is a single indirect call per batch.
//!
//! # Sous-modules
//!
//! - [`scalar`] - reference kernels, the correctness oracle
//! - `portable` - `std::simd` kernels (feature `simd`)
//! - `x86` - SSE2 / AVX2 intrinsics
//! - `neon` - NEON intrinsics

use once_cell::sync::Lazy;

use crate::bit_depth::{Bit16, Bit24, Bit32, Bit8};
use crate::dispatch::KernelTier;
use crate::format::WireLayout;

pub mod scalar;

#[cfg(feature = "simd")]
mod portable;

#[cfg(target_arch = "x86_64")]
mod x86;
#[cfg(target_arch = "x86_64")]
use x86::{avx2, sse2};

#[cfg(target_arch = "aarch64")]
mod neon;

/// Encodes `src.len()` float samples into exactly `src.len() * bytes_per_sample` bytes.
pub type EncodeFn = fn(&[f32], &mut [u8]);

/// Decodes `dst.len()` samples from exactly `dst.len() * bytes_per_sample` bytes.
pub type DecodeFn = fn(&[u8], &mut [f32]);

/// Per-tier function table, indexed by [`WireLayout`].
pub struct KernelTable {
    tier: KernelTier,
    encoders: [EncodeFn; WireLayout::COUNT],
    decoders: [DecodeFn; WireLayout::COUNT],
}

/// Génère la table d'un tier à partir d'un module exposant les six kernels.
macro_rules! kernel_table {
    ($tier:expr, $k:ident) => {
        KernelTable {
            tier: $tier,
            encoders: [
                $k::encode_linear::<Bit8, false>,
                $k::encode_linear::<Bit16, false>,
                $k::encode_linear::<Bit16, true>,
                $k::encode_linear::<Bit24, false>,
                $k::encode_linear::<Bit24, true>,
                $k::encode_linear::<Bit32, false>,
                $k::encode_linear::<Bit32, true>,
                $k::encode_alaw,
                $k::encode_mulaw,
            ],
            decoders: [
                $k::decode_linear::<Bit8, false>,
                $k::decode_linear::<Bit16, false>,
                $k::decode_linear::<Bit16, true>,
                $k::decode_linear::<Bit24, false>,
                $k::decode_linear::<Bit24, true>,
                $k::decode_linear::<Bit32, false>,
                $k::decode_linear::<Bit32, true>,
                $k::decode_alaw,
                $k::decode_mulaw,
            ],
        }
    };
}

static SCALAR_TABLE: KernelTable = kernel_table!(KernelTier::Scalar, scalar);

#[cfg(feature = "simd")]
static PORTABLE_TABLE: KernelTable = kernel_table!(KernelTier::Portable, portable);

#[cfg(target_arch = "x86_64")]
static SSE2_TABLE: KernelTable = kernel_table!(KernelTier::Sse2, sse2);

#[cfg(target_arch = "x86_64")]
static AVX2_TABLE: KernelTable = kernel_table!(KernelTier::Avx2, avx2);

#[cfg(target_arch = "aarch64")]
static NEON_TABLE: KernelTable = kernel_table!(KernelTier::Neon, neon);

static DETECTED_TABLE: Lazy<&'static KernelTable> = Lazy::new(|| {
    KernelTable::for_tier(KernelTier::detect()).unwrap_or(&SCALAR_TABLE)
});

impl KernelTable {
    /// Table for the best tier on this host.
    pub fn detected() -> &'static KernelTable {
        *DETECTED_TABLE
    }

    /// Reference table.
    pub fn scalar() -> &'static KernelTable {
        &SCALAR_TABLE
    }

    /// Table for a specific tier, `None` when the host cannot run it.
    ///
    /// Intrinsic kernels are only reachable through this function, which is
    /// what makes their safe wrappers sound.
    pub fn for_tier(tier: KernelTier) -> Option<&'static KernelTable> {
        if !tier.is_available() {
            return None;
        }
        match tier {
            KernelTier::Scalar => Some(&SCALAR_TABLE),
            #[cfg(feature = "simd")]
            KernelTier::Portable => Some(&PORTABLE_TABLE),
            #[cfg(target_arch = "x86_64")]
            KernelTier::Sse2 => Some(&SSE2_TABLE),
            #[cfg(target_arch = "x86_64")]
            KernelTier::Avx2 => Some(&AVX2_TABLE),
            #[cfg(target_arch = "aarch64")]
            KernelTier::Neon => Some(&NEON_TABLE),
            _ => None,
        }
    }

    pub fn tier(&self) -> KernelTier {
        self.tier
    }

    pub fn encoder(&self, layout: WireLayout) -> EncodeFn {
        self.encoders[layout.index()]
    }

    pub fn decoder(&self, layout: WireLayout) -> DecodeFn {
        self.decoders[layout.index()]
    }

    /// Encodes `src` into `dst`.
    ///
    /// # Panics
    ///
    /// If `dst` is not exactly `src.len() * layout.bytes_per_sample()` long;
    /// a mismatch is a caller bug, not a data error.
    pub fn encode(&self, layout: WireLayout, src: &[f32], dst: &mut [u8]) {
        assert_eq!(
            dst.len(),
            src.len() * layout.bytes_per_sample(),
            "destination length does not match {} {:?} samples",
            src.len(),
            layout
        );
        (self.encoder(layout))(src, dst)
    }

    /// Decodes `src` into `dst`.
    ///
    /// # Panics
    ///
    /// If `src` is not exactly `dst.len() * layout.bytes_per_sample()` long.
    pub fn decode(&self, layout: WireLayout, src: &[u8], dst: &mut [f32]) {
        assert_eq!(
            src.len(),
            dst.len() * layout.bytes_per_sample(),
            "source length does not match {} {:?} samples",
            dst.len(),
            layout
        );
        (self.decoder(layout))(src, dst)
    }
}

impl std::fmt::Debug for KernelTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelTable").field("tier", &self.tier).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detected_table_matches_detected_tier() {
        assert_eq!(KernelTable::detected().tier(), KernelTier::detect());
    }

    #[test]
    fn unavailable_tiers_have_no_table() {
        for tier in KernelTier::ALL {
            assert_eq!(KernelTable::for_tier(tier).is_some(), tier.is_available());
        }
    }

    #[test]
    #[should_panic(expected = "destination length")]
    fn encode_rejects_mismatched_destination() {
        let mut dst = [0u8; 3];
        KernelTable::scalar().encode(WireLayout::S16Le, &[0.0, 0.0], &mut dst);
    }

    #[test]
    fn empty_batches_are_no_ops() {
        for tier in KernelTier::available() {
            let table = KernelTable::for_tier(tier).unwrap();
            for layout in WireLayout::ALL {
                table.encode(layout, &[], &mut []);
                table.decode(layout, &[], &mut []);
            }
        }
    }
}
