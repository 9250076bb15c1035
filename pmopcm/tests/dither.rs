use pmopcm::{
    ConverterOptions, EncodingReader, Endianness, KernelTier, MemorySource, PcmFormat, ReadResult,
    SampleDecoder,
};

fn encode_all(samples: Vec<f32>, format: PcmFormat, options: &ConverterOptions) -> Vec<u8> {
    let source = MemorySource::new(format.sample_rate, format.channels, samples);
    let mut reader = EncodingReader::new(source, format, options).unwrap();
    let mut out = Vec::new();
    let mut dest = vec![0u8; 777 * format.bytes_per_sample()];
    while let ReadResult::Produced(n) = reader.read(&mut dest) {
        out.extend_from_slice(&dest[..n * format.bytes_per_sample()]);
    }
    out
}

#[test]
fn dc_error_stays_below_one_lsb() {
    let format = PcmFormat::linear(44_100, 2, 16, Endianness::Little);
    let (left, right) = (0.100_007_f32, -0.333_331_f32);
    let frames = 20_000;
    let samples: Vec<f32> = (0..frames).flat_map(|_| [left, right]).collect();

    let bytes = encode_all(samples, format, &ConverterOptions::accurate());
    let decoder = SampleDecoder::new(format, &ConverterOptions::default()).unwrap();
    let mut decoded = vec![0.0f32; frames * 2];
    assert_eq!(decoder.decode(&bytes, &mut decoded), frames * 2);

    for (ch, target) in [(0, left), (1, right)] {
        let lsb = 1.0 / 32_768.0;
        let mut sum = 0.0f64;
        for (n, s) in decoded.iter().skip(ch).step_by(2).enumerate() {
            sum += *s as f64;
            let error = (sum - target as f64 * (n + 1) as f64).abs();
            assert!(error < lsb, "channel {ch}: {error} after {} samples", n + 1);
        }
    }
}

#[test]
fn plain_quantization_drifts_where_dither_does_not() {
    // 0.3 LSB: plain rounding always gives 0, the modulator averages it out
    let format = PcmFormat::linear(8_000, 1, 8, Endianness::Little);
    let x = 0.3 / 128.0;
    let plain = encode_all(vec![x; 1_000], format, &ConverterOptions::default());
    let shaped = encode_all(vec![x; 1_000], format, &ConverterOptions::accurate());

    assert!(plain.iter().all(|&b| b == 0x80));
    let ones = shaped.iter().filter(|&&b| b == 0x81).count();
    assert!((290..=310).contains(&ones), "{ones} samples at +1");
}

#[test]
fn dithered_output_does_not_depend_on_the_tier() {
    let samples: Vec<f32> = (0..9_001).map(|i| ((i as f32) * 0.021).sin() * 0.8).collect();
    for format in [
        PcmFormat::linear(48_000, 3, 8, Endianness::Little),
        PcmFormat::linear(48_000, 3, 16, Endianness::Big),
        PcmFormat::linear(48_000, 3, 24, Endianness::Little),
    ] {
        let reference = encode_all(
            samples.clone(),
            format,
            &ConverterOptions::accurate().with_kernel(KernelTier::Scalar),
        );
        for tier in KernelTier::available() {
            let options = ConverterOptions::accurate().with_kernel(tier);
            assert_eq!(encode_all(samples.clone(), format, &options), reference, "{tier} {format}");
        }
    }
}
