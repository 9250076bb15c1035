//! Converter options.
//!
//! Options are plain serde data so they can live in a YAML file next to the
//! rest of the application configuration:
//!
//! ```yaml
//! accuracy: true
//! kernel: sse2        # avx2 | sse2 | neon | portable | scalar, omit for auto
//! scratch_capacity: 2048
//! ```
//!
//! The `PMOPCM_KERNEL` environment variable overrides `kernel` when
//! [`ConverterOptions::with_env_overrides`] is applied (`auto` clears it).

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::dispatch::KernelTier;
use crate::error::{PcmError, Result};
use crate::kernels::KernelTable;

const ENV_KERNEL: &str = "PMOPCM_KERNEL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterOptions {
    /// Delta-sigma dither on narrow linear outputs.
    pub accuracy: bool,
    /// Forced kernel tier, `None` picks the best one for the host.
    pub kernel: Option<KernelTier>,
    /// Samples pulled from the source per inner iteration.
    pub scratch_capacity: usize,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            accuracy: false,
            kernel: None,
            scratch_capacity: Self::DEFAULT_SCRATCH_CAPACITY,
        }
    }
}

impl ConverterOptions {
    pub const DEFAULT_SCRATCH_CAPACITY: usize = 1024;

    /// Defaults with dithering turned on.
    pub fn accurate() -> Self {
        Self {
            accuracy: true,
            ..Self::default()
        }
    }

    pub fn with_kernel(mut self, tier: KernelTier) -> Self {
        self.kernel = Some(tier);
        self
    }

    pub fn with_scratch_capacity(mut self, samples: usize) -> Self {
        self.scratch_capacity = samples;
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let options: Self = serde_yaml::from_str(yaml)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)?;
        let options = Self::from_yaml_str(&yaml)?;
        info!(config_file = %path.display(), "Loaded PCM converter options");
        Ok(options)
    }

    /// Applies `PMOPCM_KERNEL` if it is set.
    ///
    /// Unknown or unavailable tiers are logged and ignored rather than
    /// failing, so a stale environment never prevents playback.
    pub fn with_env_overrides(self) -> Self {
        match env::var(ENV_KERNEL) {
            Ok(value) => self.with_kernel_override(&value),
            Err(_) => self,
        }
    }

    /// Applies a kernel override expressed as a tier name or `auto`.
    pub fn with_kernel_override(mut self, value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("auto") {
            debug!(variable = ENV_KERNEL, "Kernel override cleared");
            self.kernel = None;
            return self;
        }
        match value.parse::<KernelTier>() {
            Ok(tier) if tier.is_available() => {
                debug!(variable = ENV_KERNEL, tier = %tier, "Kernel override applied");
                self.kernel = Some(tier);
            }
            Ok(tier) => {
                warn!(variable = ENV_KERNEL, tier = %tier, "Kernel tier not available on this host, override ignored");
            }
            Err(e) => {
                warn!(variable = ENV_KERNEL, value, error = %e, "Invalid kernel override ignored");
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.scratch_capacity == 0 {
            return Err(PcmError::InvalidConfig(
                "scratch_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Kernel table these options select.
    pub fn kernel_table(&self) -> Result<&'static KernelTable> {
        match self.kernel {
            None => Ok(KernelTable::detected()),
            Some(tier) => KernelTable::for_tier(tier).ok_or(PcmError::KernelUnavailable(tier)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ConverterOptions::default();
        assert!(!options.accuracy);
        assert_eq!(options.kernel, None);
        assert_eq!(options.scratch_capacity, 1024);
        assert_eq!(options.kernel_table().unwrap().tier(), KernelTier::detect());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let options = ConverterOptions::from_yaml_str("accuracy: true\n").unwrap();
        assert_eq!(options, ConverterOptions::accurate());

        let options = ConverterOptions::from_yaml_str("kernel: scalar\nscratch_capacity: 64\n").unwrap();
        assert_eq!(options.kernel, Some(KernelTier::Scalar));
        assert_eq!(options.scratch_capacity, 64);
    }

    #[test]
    fn zero_scratch_is_rejected() {
        let err = ConverterOptions::from_yaml_str("scratch_capacity: 0\n").unwrap_err();
        assert!(matches!(err, PcmError::InvalidConfig(_)));
    }

    #[test]
    fn unknown_tier_is_a_yaml_error() {
        let err = ConverterOptions::from_yaml_str("kernel: avx512\n").unwrap_err();
        assert!(matches!(err, PcmError::Yaml(_)));
    }

    #[test]
    fn kernel_override() {
        let forced = ConverterOptions::default().with_kernel_override("Scalar");
        assert_eq!(forced.kernel, Some(KernelTier::Scalar));

        let cleared = forced.clone().with_kernel_override("auto");
        assert_eq!(cleared.kernel, None);

        let ignored = forced.clone().with_kernel_override("avx512");
        assert_eq!(ignored.kernel, Some(KernelTier::Scalar));
    }

    #[test]
    fn unavailable_tier_is_refused() {
        for tier in KernelTier::ALL {
            let options = ConverterOptions::default().with_kernel(tier);
            match options.kernel_table() {
                Ok(table) => assert_eq!(table.tier(), tier),
                Err(PcmError::KernelUnavailable(t)) => {
                    assert_eq!(t, tier);
                    assert!(!tier.is_available());
                }
                Err(e) => panic!("unexpected error {e}"),
            }
            // an unavailable tier never sticks through the override path
            let overridden = ConverterOptions::default().with_kernel_override(tier.name());
            assert_eq!(overridden.kernel.is_some(), tier.is_available());
        }
    }
}
