//! Format-level batch converters.
//!
//! [`SampleEncoder`] and [`SampleDecoder`] resolve a [`PcmFormat`] once into a
//! wire layout and a kernel table; per batch there is a single indirect call.

use tracing::{debug, warn};

use crate::config::ConverterOptions;
use crate::dispatch::KernelTier;
use crate::dither::DeltaSigma;
use crate::error::Result;
use crate::format::{PcmFormat, WireLayout};
use crate::kernels::KernelTable;

/// Converts interleaved `f32` samples into encoded bytes.
#[derive(Debug)]
pub struct SampleEncoder {
    format: PcmFormat,
    layout: WireLayout,
    table: &'static KernelTable,
    dither: Option<DeltaSigma>,
    cursor: usize,
}

impl SampleEncoder {
    pub fn new(format: PcmFormat, options: &ConverterOptions) -> Result<Self> {
        options.validate()?;
        let layout = format.layout()?;
        let table = options.kernel_table()?;

        let dither = if options.accuracy {
            let dither = DeltaSigma::new(format.channels, layout);
            if dither.is_none() {
                warn!(format = %format, "Accuracy mode has no effect on this encoding, converting without dither");
            }
            dither
        } else {
            None
        };

        debug!(
            format = %format,
            tier = %table.tier(),
            dither = dither.is_some(),
            "PCM encoder ready"
        );

        Ok(Self {
            format,
            layout,
            table,
            dither,
            cursor: 0,
        })
    }

    pub fn format(&self) -> &PcmFormat {
        &self.format
    }

    pub fn layout(&self) -> WireLayout {
        self.layout
    }

    /// Tier running the stateless conversions.
    pub fn tier(&self) -> KernelTier {
        self.table.tier()
    }

    pub fn is_dithering(&self) -> bool {
        self.dither.is_some()
    }

    /// Channel of the next sample to encode.
    pub fn channel_cursor(&self) -> usize {
        self.cursor
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.layout.bytes_per_sample()
    }

    /// Bytes needed for `samples` encoded samples.
    pub fn encoded_len(&self, samples: usize) -> usize {
        samples * self.bytes_per_sample()
    }

    /// Encodes as many whole samples of `src` as fit in `dst`.
    ///
    /// Returns the number of bytes written, always a multiple of the sample
    /// size; bytes of `dst` past that are left untouched.
    pub fn encode(&mut self, src: &[f32], dst: &mut [u8]) -> usize {
        let bps = self.bytes_per_sample();
        let n = src.len().min(dst.len() / bps);
        let written = self.encoded_len(n);
        let (src, dst) = (&src[..n], &mut dst[..written]);

        match self.dither.as_mut() {
            Some(dither) => dither.encode(src, dst),
            None => self.table.encode(self.layout, src, dst),
        }

        self.cursor = (self.cursor + n) % self.format.channels as usize;
        debug_assert!(self.dither.as_ref().map_or(true, |d| d.cursor() == self.cursor));
        written
    }

    /// Drops the dither history and rewinds to channel 0.
    pub fn reset(&mut self) {
        if let Some(dither) = self.dither.as_mut() {
            dither.reset();
        }
        self.cursor = 0;
    }
}

/// Converts encoded bytes back into interleaved `f32` samples.
#[derive(Debug, Clone)]
pub struct SampleDecoder {
    format: PcmFormat,
    layout: WireLayout,
    table: &'static KernelTable,
}

impl SampleDecoder {
    /// `options.accuracy` has no meaning when decoding and is ignored.
    pub fn new(format: PcmFormat, options: &ConverterOptions) -> Result<Self> {
        let layout = format.layout()?;
        let table = options.kernel_table()?;
        debug!(format = %format, tier = %table.tier(), "PCM decoder ready");
        Ok(Self {
            format,
            layout,
            table,
        })
    }

    pub fn format(&self) -> &PcmFormat {
        &self.format
    }

    pub fn layout(&self) -> WireLayout {
        self.layout
    }

    pub fn tier(&self) -> KernelTier {
        self.table.tier()
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.layout.bytes_per_sample()
    }

    /// Samples contained in `bytes` encoded bytes (whole samples only).
    pub fn decoded_len(&self, bytes: usize) -> usize {
        bytes / self.bytes_per_sample()
    }

    /// Decodes as many whole samples of `src` as fit in `dst`, returns the
    /// number of samples written.
    pub fn decode(&self, src: &[u8], dst: &mut [f32]) -> usize {
        let n = dst.len().min(self.decoded_len(src.len()));
        self.table.decode(self.layout, &src[..self.bytes_per_sample() * n], &mut dst[..n]);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Endianness;

    #[test]
    fn encodes_full_scale_without_wrapping() {
        let format = PcmFormat::linear(44_100, 1, 16, Endianness::Little);
        let mut encoder = SampleEncoder::new(format, &ConverterOptions::default()).unwrap();
        let mut out = [0u8; 4];
        assert_eq!(encoder.encode(&[1.0, -1.0], &mut out), 4);
        assert_eq!(out, [0xFF, 0x7F, 0x00, 0x80]);
    }

    #[test]
    fn encode_stops_at_whole_samples() {
        let format = PcmFormat::linear(48_000, 2, 24, Endianness::Big);
        let mut encoder = SampleEncoder::new(format, &ConverterOptions::default()).unwrap();
        let mut out = [0xAAu8; 8];
        assert_eq!(encoder.encode(&[0.0; 4], &mut out), 6);
        assert_eq!(&out[6..], &[0xAA, 0xAA]);
        assert_eq!(encoder.channel_cursor(), 0);

        assert_eq!(encoder.encode(&[0.0], &mut out), 3);
        assert_eq!(encoder.channel_cursor(), 1);
        encoder.reset();
        assert_eq!(encoder.channel_cursor(), 0);
    }

    #[test]
    fn accuracy_applies_to_narrow_linear_only() {
        let options = ConverterOptions::accurate();
        let narrow = SampleEncoder::new(PcmFormat::linear(8_000, 1, 8, Endianness::Little), &options).unwrap();
        assert!(narrow.is_dithering());

        let wide = SampleEncoder::new(PcmFormat::linear(8_000, 1, 32, Endianness::Little), &options).unwrap();
        assert!(!wide.is_dithering());

        let alaw = SampleEncoder::new(PcmFormat::alaw(8_000, 1), &options).unwrap();
        assert!(!alaw.is_dithering());
    }

    #[test]
    fn invalid_format_fails_at_construction() {
        let format = PcmFormat::linear(48_000, 0, 16, Endianness::Little);
        assert!(SampleEncoder::new(format, &ConverterOptions::default()).is_err());
        assert!(SampleDecoder::new(format, &ConverterOptions::default()).is_err());
    }

    #[test]
    fn decoder_reads_back_what_the_encoder_wrote() {
        let format = PcmFormat::mulaw(8_000, 1);
        let mut encoder = SampleEncoder::new(format, &ConverterOptions::default()).unwrap();
        let decoder = SampleDecoder::new(format, &ConverterOptions::default()).unwrap();

        let mut bytes = [0u8; 3];
        encoder.encode(&[0.0, 0.5, -0.5], &mut bytes);
        let mut back = [1.0f32; 3];
        assert_eq!(decoder.decode(&bytes, &mut back), 3);
        assert_eq!(back[0], 0.0);
        assert!((back[1] - 0.5).abs() < 0.02);
        assert!((back[2] + 0.5).abs() < 0.02);
    }
}
