//! Pull adapter from a [`SampleSource`] to encoded bytes.

use tracing::trace;

use crate::codec::SampleEncoder;
use crate::config::ConverterOptions;
use crate::dispatch::KernelTier;
use crate::error::{PcmError, Result};
use crate::format::PcmFormat;
use crate::source::{ReadResult, SampleSource, SourceInfo};

/// Reads `f32` samples from an upstream source and hands them out encoded.
///
/// One instance per stream: the scratch buffer and the dither state are
/// owned here and mutated by every [`read`](Self::read).
pub struct EncodingReader<S> {
    source: S,
    encoder: SampleEncoder,
    scratch: Vec<f32>,
    scratch_capacity: usize,
}

impl<S: SampleSource> EncodingReader<S> {
    /// Binds `source` to the output `format`.
    ///
    /// Fails if the format or options are invalid, if the forced kernel tier
    /// is not available, or if the source shape disagrees with `format`.
    pub fn new(source: S, format: PcmFormat, options: &ConverterOptions) -> Result<Self> {
        let info = source.info();
        if info.channels != format.channels {
            return Err(PcmError::ChannelMismatch {
                expected: format.channels,
                actual: info.channels,
            });
        }
        if info.sample_rate != format.sample_rate {
            return Err(PcmError::SampleRateMismatch {
                expected: format.sample_rate,
                actual: info.sample_rate,
            });
        }

        let encoder = SampleEncoder::new(format, options)?;
        Ok(Self {
            source,
            encoder,
            scratch: Vec::new(),
            scratch_capacity: options.scratch_capacity,
        })
    }

    pub fn format(&self) -> &PcmFormat {
        self.encoder.format()
    }

    pub fn source_info(&self) -> SourceInfo {
        self.source.info()
    }

    pub fn tier(&self) -> KernelTier {
        self.encoder.tier()
    }

    pub fn is_dithering(&self) -> bool {
        self.encoder.is_dithering()
    }

    /// Channel the next produced sample belongs to.
    pub fn channel_cursor(&self) -> usize {
        self.encoder.channel_cursor()
    }

    /// Total stream length in frames, as reported by the source.
    pub fn length(&self) -> Option<u64> {
        self.source.length()
    }

    pub fn position(&self) -> Option<u64> {
        self.source.position()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Fills `dest` with encoded samples from a single upstream pull.
    ///
    /// `dest` holds `dest.len() / bytes_per_sample` samples; a trailing
    /// partial slot is never written. The source is asked for at most
    /// `min(capacity, scratch_capacity)` samples, once. Whatever it hands
    /// back is encoded and reported; end of stream and no data pass through
    /// unchanged.
    ///
    /// # Panics
    ///
    /// If the source reports more samples than it was asked for.
    pub fn read(&mut self, dest: &mut [u8]) -> ReadResult {
        let bps = self.encoder.bytes_per_sample();
        let capacity = dest.len() / bps;
        if capacity == 0 {
            return ReadResult::Produced(0);
        }

        let want = capacity.min(self.scratch_capacity);
        if self.scratch.len() < want {
            self.scratch.resize(want, 0.0);
        }

        let got = match self.source.read(&mut self.scratch[..want]) {
            ReadResult::Produced(n) => n,
            signal => {
                trace!(?signal, "Upstream source stopped");
                return signal;
            }
        };
        assert!(
            got <= want,
            "sample source produced {got} samples for a {want}-sample request"
        );

        let written = self
            .encoder
            .encode(&self.scratch[..got], &mut dest[..got * bps]);
        debug_assert_eq!(written, got * bps);

        trace!(got, want, cursor = self.encoder.channel_cursor(), "Encoded samples");
        ReadResult::Produced(got)
    }
}

impl<S: SampleSource> std::fmt::Debug for EncodingReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodingReader")
            .field("encoder", &self.encoder)
            .field("scratch_capacity", &self.scratch_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Endianness;
    use crate::source::MemorySource;

    #[test]
    fn rejects_mismatched_source() {
        let format = PcmFormat::linear(48_000, 2, 16, Endianness::Little);
        let mono = MemorySource::new(48_000, 1, vec![]);
        assert!(matches!(
            EncodingReader::new(mono, format, &ConverterOptions::default()),
            Err(PcmError::ChannelMismatch { expected: 2, actual: 1 })
        ));

        let slow = MemorySource::new(44_100, 2, vec![]);
        assert!(matches!(
            EncodingReader::new(slow, format, &ConverterOptions::default()),
            Err(PcmError::SampleRateMismatch { .. })
        ));
    }

    #[test]
    fn drains_memory_source_in_scratch_sized_pulls() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32 / 16.0).collect();
        let source = MemorySource::new(8_000, 1, samples);
        let format = PcmFormat::linear(8_000, 1, 8, Endianness::Little);
        let options = ConverterOptions::default().with_scratch_capacity(3);
        let mut reader = EncodingReader::new(source, format, &options).unwrap();

        let mut out = [0u8; 16];
        let mut got = Vec::new();
        while let ReadResult::Produced(n) = reader.read(&mut out) {
            assert!(n <= 3);
            got.extend_from_slice(&out[..n]);
        }
        assert_eq!(got.len(), 10);
        assert_eq!(got[0], 0x80);
        assert_eq!(got[9], 0x80 + 72);
    }

    #[test]
    fn zero_capacity_does_not_pull() {
        let source = MemorySource::new(8_000, 1, vec![0.5]);
        let format = PcmFormat::linear(8_000, 1, 16, Endianness::Little);
        let mut reader = EncodingReader::new(source, format, &ConverterOptions::default()).unwrap();

        assert_eq!(reader.read(&mut [0u8; 1]), ReadResult::Produced(0));
        assert_eq!(reader.source().remaining(), 1);
    }
}
