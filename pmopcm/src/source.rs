//! Upstream sample source contract.

use std::fmt;

/// Outcome of one pull from a source or from an [`EncodingReader`](crate::EncodingReader).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadResult {
    /// The stream is over; nothing was written.
    EndOfStream,
    /// Nothing available right now, the stream is not over.
    NoDataYet,
    /// This many samples (or encoded samples) were written.
    Produced(usize),
}

impl ReadResult {
    /// Samples written, 0 for the two signalling variants.
    pub fn count(self) -> usize {
        match self {
            ReadResult::Produced(n) => n,
            ReadResult::EndOfStream | ReadResult::NoDataYet => 0,
        }
    }

    pub fn is_end_of_stream(self) -> bool {
        self == ReadResult::EndOfStream
    }
}

/// Shape of the interleaved `f32` stream a source produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceInfo {
    pub sample_rate: u32,
    pub channels: u16,
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz, {} ch", self.sample_rate, self.channels)
    }
}

/// Pull-based producer of interleaved `f32` samples in `[-1.0, 1.0]`.
///
/// `read` may block; any cancellation or timeout is the source's business.
/// It must never report more samples than `buf.len()`.
pub trait SampleSource {
    fn info(&self) -> SourceInfo;

    fn read(&mut self, buf: &mut [f32]) -> ReadResult;

    /// Total length in frames, when known.
    fn length(&self) -> Option<u64> {
        None
    }

    /// Current position in frames, when known.
    fn position(&self) -> Option<u64> {
        None
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn info(&self) -> SourceInfo {
        (**self).info()
    }

    fn read(&mut self, buf: &mut [f32]) -> ReadResult {
        (**self).read(buf)
    }

    fn length(&self) -> Option<u64> {
        (**self).length()
    }

    fn position(&self) -> Option<u64> {
        (**self).position()
    }
}

/// Source over an interleaved buffer held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    info: SourceInfo,
    samples: Vec<f32>,
    offset: usize,
}

impl MemorySource {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            info: SourceInfo {
                sample_rate,
                channels,
            },
            samples,
            offset: 0,
        }
    }

    /// Samples not yet read.
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.offset
    }

    pub fn rewind(&mut self) {
        self.offset = 0;
    }
}

impl SampleSource for MemorySource {
    fn info(&self) -> SourceInfo {
        self.info
    }

    fn read(&mut self, buf: &mut [f32]) -> ReadResult {
        let n = buf.len().min(self.remaining());
        if n == 0 && !buf.is_empty() {
            return ReadResult::EndOfStream;
        }
        buf[..n].copy_from_slice(&self.samples[self.offset..self.offset + n]);
        self.offset += n;
        ReadResult::Produced(n)
    }

    fn length(&self) -> Option<u64> {
        Some((self.samples.len() / self.info.channels.max(1) as usize) as u64)
    }

    fn position(&self) -> Option<u64> {
        Some((self.offset / self.info.channels.max(1) as usize) as u64)
    }
}
