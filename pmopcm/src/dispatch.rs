//! CPU capability detection.
//!
//! The best kernel tier is detected once per process and cached; it never
//! changes after start-up so no locking is involved beyond the first call.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PcmError;

/// Kernel implementation tier, from most to least specialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelTier {
    /// 256-bit AVX2 intrinsics (x86_64).
    Avx2,
    /// 128-bit SSE2 intrinsics (x86_64 baseline).
    Sse2,
    /// 128-bit NEON intrinsics (aarch64).
    Neon,
    /// Width-agnostic `std::simd` kernels (feature `simd`).
    Portable,
    /// Reference implementation.
    Scalar,
}

impl KernelTier {
    /// Every tier, in dispatch preference order.
    pub const ALL: [KernelTier; 5] = [
        KernelTier::Avx2,
        KernelTier::Sse2,
        KernelTier::Neon,
        KernelTier::Portable,
        KernelTier::Scalar,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            KernelTier::Avx2 => "avx2",
            KernelTier::Sse2 => "sse2",
            KernelTier::Neon => "neon",
            KernelTier::Portable => "portable",
            KernelTier::Scalar => "scalar",
        }
    }

    /// Samples processed per vector iteration.
    pub const fn lanes(self) -> usize {
        match self {
            KernelTier::Avx2 | KernelTier::Sse2 | KernelTier::Neon | KernelTier::Portable => 8,
            KernelTier::Scalar => 1,
        }
    }

    /// Whether this tier can run on the current host.
    pub fn is_available(self) -> bool {
        match self {
            KernelTier::Scalar => true,
            KernelTier::Portable => cfg!(feature = "simd"),
            KernelTier::Avx2 => {
                #[cfg(target_arch = "x86_64")]
                {
                    is_x86_feature_detected!("avx2")
                }
                #[cfg(not(target_arch = "x86_64"))]
                {
                    false
                }
            }
            KernelTier::Sse2 => {
                #[cfg(target_arch = "x86_64")]
                {
                    is_x86_feature_detected!("sse2")
                }
                #[cfg(not(target_arch = "x86_64"))]
                {
                    false
                }
            }
            KernelTier::Neon => {
                #[cfg(target_arch = "aarch64")]
                {
                    std::arch::is_aarch64_feature_detected!("neon")
                }
                #[cfg(not(target_arch = "aarch64"))]
                {
                    false
                }
            }
        }
    }

    /// Every tier runnable on this host, best first.
    pub fn available() -> Vec<KernelTier> {
        Self::ALL.into_iter().filter(|t| t.is_available()).collect()
    }

    /// Best tier for this host (cached).
    pub fn detect() -> KernelTier {
        *DETECTED_TIER
    }
}

static DETECTED_TIER: Lazy<KernelTier> = Lazy::new(|| {
    let tier = KernelTier::ALL
        .into_iter()
        .find(|t| t.is_available())
        .unwrap_or(KernelTier::Scalar);
    tracing::info!(tier = %tier, arch = std::env::consts::ARCH, "PCM kernel tier selected");
    tier
});

impl fmt::Display for KernelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelTier {
    type Err = PcmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        KernelTier::ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| PcmError::InvalidConfig(format!("unknown kernel tier '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_is_always_available() {
        assert!(KernelTier::Scalar.is_available());
        assert_eq!(KernelTier::available().last(), Some(&KernelTier::Scalar));
    }

    #[test]
    fn detection_picks_the_first_available_tier() {
        let available = KernelTier::available();
        assert_eq!(KernelTier::detect(), available[0]);
        assert_eq!(KernelTier::detect(), KernelTier::detect());
    }

    #[test]
    fn portable_follows_the_feature_gate() {
        assert_eq!(KernelTier::Portable.is_available(), cfg!(feature = "simd"));
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn sse2_is_baseline_on_x86_64() {
        assert!(KernelTier::Sse2.is_available());
        assert!(!KernelTier::Neon.is_available());
    }

    #[test]
    fn parses_tier_names() {
        assert_eq!("AVX2".parse::<KernelTier>().unwrap(), KernelTier::Avx2);
        assert_eq!(" scalar ".parse::<KernelTier>().unwrap(), KernelTier::Scalar);
        assert!("avx512".parse::<KernelTier>().is_err());
    }
}
