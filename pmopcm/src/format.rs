//! Wire format descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bit_depth::BitDepth;
use crate::error::{PcmError, Result};

/// Sample encoding family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Two's complement linear PCM (8-bit is stored offset-binary).
    LinearPcm,
    /// ITU-T G.711 A-law.
    ALaw,
    /// ITU-T G.711 μ-law.
    MuLaw,
}

/// Byte order of multi-byte samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Describes the byte layout of an encoded PCM stream.
///
/// Validated once when a converter is built; from then on it fully determines
/// how a sample is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: Encoding,
    pub bits_per_sample: u16,
    #[serde(default)]
    pub endianness: Endianness,
}

impl PcmFormat {
    pub fn linear(sample_rate: u32, channels: u16, bits_per_sample: u16, endianness: Endianness) -> Self {
        Self {
            sample_rate,
            channels,
            encoding: Encoding::LinearPcm,
            bits_per_sample,
            endianness,
        }
    }

    pub fn alaw(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            encoding: Encoding::ALaw,
            bits_per_sample: 8,
            endianness: Endianness::Little,
        }
    }

    pub fn mulaw(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            encoding: Encoding::MuLaw,
            bits_per_sample: 8,
            endianness: Endianness::Little,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(PcmError::InvalidFormat(
                "channel count must be greater than 0".into(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(PcmError::InvalidFormat(
                "sample rate must be greater than 0".into(),
            ));
        }
        match self.encoding {
            Encoding::LinearPcm => {
                if BitDepth::from_u32(self.bits_per_sample as u32).is_none() {
                    return Err(PcmError::InvalidFormat(format!(
                        "linear PCM supports 8, 16, 24 or 32 bits per sample, got {}",
                        self.bits_per_sample
                    )));
                }
            }
            Encoding::ALaw | Encoding::MuLaw => {
                if self.bits_per_sample != 8 {
                    return Err(PcmError::InvalidFormat(format!(
                        "G.711 samples are 8 bits wide, got {}",
                        self.bits_per_sample
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolves the kernel layout for this format.
    pub fn layout(&self) -> Result<WireLayout> {
        self.validate()?;
        let big = self.endianness == Endianness::Big;
        let layout = match (self.encoding, self.bits_per_sample, big) {
            (Encoding::ALaw, ..) => WireLayout::ALaw,
            (Encoding::MuLaw, ..) => WireLayout::MuLaw,
            (Encoding::LinearPcm, 8, _) => WireLayout::U8,
            (Encoding::LinearPcm, 16, false) => WireLayout::S16Le,
            (Encoding::LinearPcm, 16, true) => WireLayout::S16Be,
            (Encoding::LinearPcm, 24, false) => WireLayout::S24Le,
            (Encoding::LinearPcm, 24, true) => WireLayout::S24Be,
            (Encoding::LinearPcm, 32, false) => WireLayout::S32Le,
            (Encoding::LinearPcm, 32, true) => WireLayout::S32Be,
            (Encoding::LinearPcm, bits, _) => {
                return Err(PcmError::InvalidFormat(format!(
                    "unsupported bit depth {bits}"
                )))
            }
        };
        Ok(layout)
    }

    pub fn bytes_per_sample(&self) -> usize {
        bytes_per_sample(self.bits_per_sample)
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoding = match self.encoding {
            Encoding::LinearPcm => "PCM",
            Encoding::ALaw => "A-law",
            Encoding::MuLaw => "μ-law",
        };
        write!(
            f,
            "{} {}-bit {:?}-endian, {} Hz, {} ch",
            encoding, self.bits_per_sample, self.endianness, self.sample_rate, self.channels
        )
    }
}

pub(crate) fn bytes_per_sample(bits_per_sample: u16) -> usize {
    std::cmp::max(1, ((bits_per_sample as usize) + 7) / 8)
}

/// Concrete sample layout a kernel writes or reads.
///
/// 8-bit linear PCM has no byte order, G.711 is always one byte per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireLayout {
    U8,
    S16Le,
    S16Be,
    S24Le,
    S24Be,
    S32Le,
    S32Be,
    ALaw,
    MuLaw,
}

impl WireLayout {
    pub const COUNT: usize = 9;

    pub const ALL: [WireLayout; Self::COUNT] = [
        WireLayout::U8,
        WireLayout::S16Le,
        WireLayout::S16Be,
        WireLayout::S24Le,
        WireLayout::S24Be,
        WireLayout::S32Le,
        WireLayout::S32Be,
        WireLayout::ALaw,
        WireLayout::MuLaw,
    ];

    /// Position of this layout in a kernel table.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            WireLayout::U8 | WireLayout::ALaw | WireLayout::MuLaw => 1,
            WireLayout::S16Le | WireLayout::S16Be => 2,
            WireLayout::S24Le | WireLayout::S24Be => 3,
            WireLayout::S32Le | WireLayout::S32Be => 4,
        }
    }

    /// Depth of the integer domain the float samples are quantized into.
    ///
    /// G.711 codecs compress a 16-bit linear intermediate.
    #[inline]
    pub const fn quantized_depth(self) -> BitDepth {
        match self {
            WireLayout::U8 => BitDepth::B8,
            WireLayout::S16Le | WireLayout::S16Be | WireLayout::ALaw | WireLayout::MuLaw => {
                BitDepth::B16
            }
            WireLayout::S24Le | WireLayout::S24Be => BitDepth::B24,
            WireLayout::S32Le | WireLayout::S32Be => BitDepth::B32,
        }
    }

    #[inline]
    pub const fn is_g711(self) -> bool {
        matches!(self, WireLayout::ALaw | WireLayout::MuLaw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_for_every_linear_width() {
        let cases = [
            (8, Endianness::Big, WireLayout::U8),
            (16, Endianness::Little, WireLayout::S16Le),
            (16, Endianness::Big, WireLayout::S16Be),
            (24, Endianness::Little, WireLayout::S24Le),
            (24, Endianness::Big, WireLayout::S24Be),
            (32, Endianness::Little, WireLayout::S32Le),
            (32, Endianness::Big, WireLayout::S32Be),
        ];
        for (bits, endianness, expected) in cases {
            let format = PcmFormat::linear(48_000, 2, bits, endianness);
            assert_eq!(format.layout().unwrap(), expected);
            assert_eq!(format.bytes_per_sample(), expected.bytes_per_sample());
        }
        assert_eq!(PcmFormat::alaw(8_000, 1).layout().unwrap(), WireLayout::ALaw);
        assert_eq!(PcmFormat::mulaw(8_000, 1).layout().unwrap(), WireLayout::MuLaw);
        assert!(WireLayout::ALaw.is_g711() && WireLayout::MuLaw.is_g711());
        assert!(!WireLayout::U8.is_g711());
    }

    #[test]
    fn layout_indices_follow_table_order() {
        for (i, layout) in WireLayout::ALL.iter().enumerate() {
            assert_eq!(layout.index(), i);
        }
    }

    #[test]
    fn rejects_invalid_formats() {
        assert!(PcmFormat::linear(48_000, 0, 16, Endianness::Little).validate().is_err());
        assert!(PcmFormat::linear(0, 2, 16, Endianness::Little).validate().is_err());
        assert!(PcmFormat::linear(48_000, 2, 12, Endianness::Little).validate().is_err());

        let mut alaw = PcmFormat::alaw(8_000, 1);
        alaw.bits_per_sample = 16;
        assert!(matches!(alaw.validate(), Err(PcmError::InvalidFormat(_))));
    }

    #[test]
    fn format_round_trips_through_yaml() {
        let format = PcmFormat::linear(44_100, 2, 24, Endianness::Big);
        let yaml = serde_yaml::to_string(&format).unwrap();
        let back: PcmFormat = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, format);

        let mulaw: PcmFormat = serde_yaml::from_str(
            "sample_rate: 8000\nchannels: 1\nencoding: mu_law\nbits_per_sample: 8\n",
        )
        .unwrap();
        assert_eq!(mulaw, PcmFormat::mulaw(8_000, 1));
    }
}
