//! [`SampleSource`] over an encoded byte stream.

use std::io::{self, Read};

use tracing::{trace, warn};

use crate::codec::SampleDecoder;
use crate::config::ConverterOptions;
use crate::error::Result;
use crate::format::PcmFormat;
use crate::source::{ReadResult, SampleSource, SourceInfo};

/// Decodes PCM / G.711 bytes from any [`Read`] into `f32` samples.
///
/// Reader errors other than `WouldBlock` and `Interrupted` end the stream;
/// the error is kept and can be retrieved with [`take_error`](Self::take_error).
pub struct DecodingSource<R> {
    reader: R,
    decoder: SampleDecoder,
    bytes: Vec<u8>,
    // bytes of an incomplete sample waiting at the front of `bytes`
    carry: usize,
    samples_read: u64,
    length: Option<u64>,
    finished: bool,
    error: Option<io::Error>,
}

impl<R: Read> DecodingSource<R> {
    pub fn new(reader: R, format: PcmFormat, options: &ConverterOptions) -> Result<Self> {
        let decoder = SampleDecoder::new(format, options)?;
        Ok(Self {
            reader,
            decoder,
            bytes: Vec::new(),
            carry: 0,
            samples_read: 0,
            length: None,
            finished: false,
            error: None,
        })
    }

    /// Declares the stream length in frames, when the container knows it.
    pub fn with_length(mut self, frames: u64) -> Self {
        self.length = Some(frames);
        self
    }

    pub fn format(&self) -> &PcmFormat {
        self.decoder.format()
    }

    /// Error that ended the stream, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn finish(&mut self) -> ReadResult {
        self.finished = true;
        if self.carry > 0 {
            warn!(bytes = self.carry, "Stream ended inside a sample, trailing bytes dropped");
            self.carry = 0;
        }
        ReadResult::EndOfStream
    }
}

impl<R: Read> SampleSource for DecodingSource<R> {
    fn info(&self) -> SourceInfo {
        let format = self.decoder.format();
        SourceInfo {
            sample_rate: format.sample_rate,
            channels: format.channels,
        }
    }

    fn read(&mut self, buf: &mut [f32]) -> ReadResult {
        if buf.is_empty() {
            return ReadResult::Produced(0);
        }
        if self.finished {
            return ReadResult::EndOfStream;
        }

        let bps = self.decoder.bytes_per_sample();
        let want = buf.len() * bps;
        if self.bytes.len() < want {
            self.bytes.resize(want, 0);
        }

        loop {
            match self.reader.read(&mut self.bytes[self.carry..want]) {
                Ok(0) => return self.finish(),
                Ok(n) => {
                    let total = self.carry + n;
                    let samples = total / bps;
                    let used = samples * bps;
                    if samples > 0 {
                        self.decoder.decode(&self.bytes[..used], &mut buf[..samples]);
                    }
                    self.bytes.copy_within(used..total, 0);
                    self.carry = total - used;
                    if samples == 0 {
                        continue;
                    }
                    self.samples_read += samples as u64;
                    trace!(samples, carry = self.carry, "Decoded samples");
                    return ReadResult::Produced(samples);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return ReadResult::NoDataYet,
                Err(e) => {
                    warn!(error = %e, "Encoded stream read failed, ending stream");
                    self.error = Some(e);
                    return self.finish();
                }
            }
        }
    }

    fn length(&self) -> Option<u64> {
        self.length
    }

    fn position(&self) -> Option<u64> {
        Some(self.samples_read / self.decoder.format().channels as u64)
    }
}

impl<R> std::fmt::Debug for DecodingSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodingSource")
            .field("decoder", &self.decoder)
            .field("carry", &self.carry)
            .field("samples_read", &self.samples_read)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
