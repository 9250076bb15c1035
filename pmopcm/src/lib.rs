#![cfg_attr(feature = "simd", feature(portable_simd))]
//! # pmopcm
//!
//! Streaming conversion between `f32` audio samples and wire sample formats:
//! linear PCM on 8, 16, 24 or 32 bits (little or big endian, 8-bit stored
//! offset-binary) and ITU-T G.711 A-law / μ-law.
//!
//! ## Features
//!
//! - **Saturating quantization**: `1.0` encodes to the largest positive
//!   sample, never wraps; rounding is half away from zero, NaN encodes as 0
//! - **Vector kernels**: AVX2 / SSE2 on x86_64, NEON on aarch64, `std::simd`
//!   with the `simd` feature; every tier is byte-identical to the scalar one
//! - **Runtime dispatch**: the best tier is detected once per process
//! - **Delta-sigma dither** ("accuracy" mode) for 8/16/24-bit outputs
//! - **Pull adapter**: [`EncodingReader`] bridges a [`SampleSource`] to an
//!   encoded byte buffer with explicit end-of-stream / no-data signalling
//!
//! ## Example: encode a buffer to 16-bit little endian
//!
//! ```
//! use pmopcm::{ConverterOptions, Endianness, EncodingReader, MemorySource, PcmFormat, ReadResult};
//!
//! let source = MemorySource::new(48_000, 2, vec![1.0, -1.0, 0.5, 0.0]);
//! let format = PcmFormat::linear(48_000, 2, 16, Endianness::Little);
//! let mut reader = EncodingReader::new(source, format, &ConverterOptions::default())?;
//!
//! let mut out = [0u8; 64];
//! assert_eq!(reader.read(&mut out), ReadResult::Produced(4));
//! assert_eq!(&out[..4], &[0xFF, 0x7F, 0x00, 0x80]);
//! assert_eq!(reader.read(&mut out), ReadResult::EndOfStream);
//! # Ok::<(), pmopcm::PcmError>(())
//! ```
//!
//! ## Example: decode μ-law from any reader
//!
//! ```
//! use pmopcm::{ConverterOptions, DecodingSource, PcmFormat, ReadResult, SampleSource};
//!
//! let bytes: &[u8] = &[0xFF, 0x80, 0x00];
//! let mut source = DecodingSource::new(bytes, PcmFormat::mulaw(8_000, 1), &ConverterOptions::default())?;
//!
//! let mut samples = [0.0f32; 3];
//! assert_eq!(source.read(&mut samples), ReadResult::Produced(3));
//! assert_eq!(samples[0], 0.0);
//! # Ok::<(), pmopcm::PcmError>(())
//! ```

pub mod bit_depth;
pub mod codec;
pub mod config;
pub mod decoding_source;
pub mod dispatch;
pub mod dither;
pub mod error;
pub mod format;
pub mod g711;
pub mod kernels;
pub mod reader;
pub mod source;

pub use bit_depth::{Bit16, Bit24, Bit32, Bit8, BitDepth, BitDepthType};
pub use codec::{SampleDecoder, SampleEncoder};
pub use config::ConverterOptions;
pub use decoding_source::DecodingSource;
pub use dispatch::KernelTier;
pub use dither::DeltaSigma;
pub use error::{PcmError, Result};
pub use format::{Encoding, Endianness, PcmFormat, WireLayout};
pub use kernels::KernelTable;
pub use reader::EncodingReader;
pub use source::{MemorySource, ReadResult, SampleSource, SourceInfo};
