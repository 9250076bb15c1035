//! First-order delta-sigma (error feedback) quantizer.
//!
//! One accumulator and one last output per channel, walked round-robin over
//! interleaved samples. The cursor is part of the state, so a batch that ends
//! mid-frame resumes on the right channel next time.

use crate::bit_depth::{Bit16, Bit24, Bit8, BitDepth};
use crate::format::WireLayout;
use crate::kernels::scalar;

type PutSample = fn(i32, &mut [u8]);

#[derive(Debug, Clone)]
pub struct DeltaSigma {
    depth: BitDepth,
    put: PutSample,
    scale: f64,
    low: f64,
    high: f64,
    acc: Vec<f64>,
    last: Vec<i32>,
    cursor: usize,
}

impl DeltaSigma {
    /// Builds the modulator for `channels` interleaved channels.
    ///
    /// Returns `None` for zero channels and for layouts without a dithered
    /// path: 32-bit output has no audible quantization floor to shape, and
    /// G.711 compresses the quantized value again.
    pub fn new(channels: u16, layout: WireLayout) -> Option<Self> {
        if channels == 0 {
            return None;
        }
        let put: PutSample = match layout {
            WireLayout::U8 => scalar::put_sample::<Bit8, false>,
            WireLayout::S16Le => scalar::put_sample::<Bit16, false>,
            WireLayout::S16Be => scalar::put_sample::<Bit16, true>,
            WireLayout::S24Le => scalar::put_sample::<Bit24, false>,
            WireLayout::S24Be => scalar::put_sample::<Bit24, true>,
            _ => return None,
        };
        let depth = layout.quantized_depth();
        let channels = channels as usize;

        Some(Self {
            depth,
            put,
            scale: depth.max_value() as f64,
            low: depth.min_sample() as f64 - 0.5,
            high: depth.max_sample() as f64 + 0.5,
            acc: vec![0.0; channels],
            last: vec![0; channels],
            cursor: 0,
        })
    }

    /// Whether `layout` can be dithered.
    pub fn supports(layout: WireLayout) -> bool {
        !layout.is_g711() && layout.quantized_depth() != BitDepth::B32
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn channels(&self) -> usize {
        self.acc.len()
    }

    /// Channel the next sample belongs to.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Clears the accumulators and rewinds to channel 0.
    pub fn reset(&mut self) {
        self.acc.fill(0.0);
        self.last.fill(0);
        self.cursor = 0;
    }

    /// Quantizes one sample of the current channel and advances the cursor.
    #[inline]
    pub fn next(&mut self, x: f32) -> i32 {
        let ch = self.cursor;
        let desired = if x.is_nan() { 0.0 } else { x as f64 * self.scale };

        // anti-windup: saturated output must not keep charging the integrator
        let acc = (self.acc[ch] + (desired - self.last[ch] as f64)).clamp(self.low, self.high);
        let out = (acc.round() as i32).clamp(self.depth.min_sample(), self.depth.max_sample());

        self.acc[ch] = acc;
        self.last[ch] = out;
        self.cursor = if ch + 1 == self.acc.len() { 0 } else { ch + 1 };
        out
    }

    /// Quantizes and stores `src` into `dst` (`src.len() * bytes` long).
    pub fn encode(&mut self, src: &[f32], dst: &mut [u8]) {
        let bytes = self.depth.bytes();
        assert_eq!(dst.len(), src.len() * bytes, "dithered destination length mismatch");
        for (&x, out) in src.iter().zip(dst.chunks_exact_mut(bytes)) {
            let q = self.next(x);
            (self.put)(q, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_error_stays_below_one_lsb() {
        for layout in [WireLayout::U8, WireLayout::S16Le, WireLayout::S24Be] {
            let mut ds = DeltaSigma::new(1, layout).unwrap();
            let x = 0.300_013_f32;
            let desired = x as f64 * ds.depth().max_value() as f64;

            let mut sum = 0.0f64;
            for n in 1..=10_000u32 {
                sum += ds.next(x) as f64;
                let error = (sum - desired * n as f64).abs();
                assert!(error < 1.0, "{layout:?}: error {error} after {n} samples");
            }
        }
    }

    #[test]
    fn channels_keep_separate_state() {
        let mut ds = DeltaSigma::new(2, WireLayout::S16Le).unwrap();
        let left = 0.25f32;
        let right = -0.5f32;
        for _ in 0..100 {
            assert_eq!(ds.next(left), 8_192);
            assert_eq!(ds.next(right), -16_384);
        }
    }

    #[test]
    fn cursor_wraps_and_resets() {
        let mut ds = DeltaSigma::new(3, WireLayout::U8).unwrap();
        assert_eq!(ds.channels(), 3);
        ds.next(0.1);
        ds.next(0.1);
        assert_eq!(ds.cursor(), 2);
        ds.next(0.1);
        assert_eq!(ds.cursor(), 0);
        ds.next(0.1);
        ds.reset();
        assert_eq!(ds.cursor(), 0);
        assert_eq!(ds.next(0.0), 0);
    }

    #[test]
    fn saturation_does_not_wind_up() {
        let mut ds = DeltaSigma::new(1, WireLayout::S16Le).unwrap();
        for _ in 0..1_000 {
            assert_eq!(ds.next(4.0), 32_767);
        }
        // accumulator was held at the rail, so silence comes back at once
        for _ in 0..10 {
            assert!(ds.next(0.0).abs() <= 1);
        }
    }

    #[test]
    fn nan_counts_as_silence() {
        let mut ds = DeltaSigma::new(1, WireLayout::S24Le).unwrap();
        assert_eq!(ds.next(f32::NAN), 0);
        assert_eq!(ds.next(0.0), 0);
    }

    #[test]
    fn wide_and_companded_layouts_have_no_dither() {
        assert!(DeltaSigma::new(2, WireLayout::S32Le).is_none());
        assert!(DeltaSigma::new(2, WireLayout::ALaw).is_none());
        assert!(DeltaSigma::new(2, WireLayout::MuLaw).is_none());
        for layout in WireLayout::ALL {
            assert_eq!(DeltaSigma::supports(layout), DeltaSigma::new(1, layout).is_some());
        }
    }

    #[test]
    fn zero_channels_has_no_modulator() {
        assert!(DeltaSigma::new(0, WireLayout::S16Le).is_none());
    }

    #[test]
    fn encode_writes_wire_bytes() {
        let mut ds = DeltaSigma::new(1, WireLayout::S16Be).unwrap();
        let mut out = [0u8; 4];
        ds.encode(&[0.5, -1.0], &mut out);
        assert_eq!(out, [0x40, 0x00, 0x80, 0x00]);
    }
}
