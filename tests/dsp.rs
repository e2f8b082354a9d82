use approx::assert_abs_diff_eq;
use lemm_core::{
    core::dsp::{downmix_to_mono, fit_length, linear_ramp, peak, rms, seconds_to_samples},
    core::resample::resample_mono,
    AudioBuffer,
};

#[test]
fn linear_ramp_includes_both_endpoints() {
    let ramp = linear_ramp(0.0, 1.0, 5);
    assert_eq!(ramp.len(), 5);
    let expected: [f32; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];
    for (r, e) in ramp.iter().zip(expected) {
        assert_abs_diff_eq!(*r, e, epsilon = 1e-7);
    }
}

#[test]
fn linear_ramp_degenerate_lengths() {
    assert!(linear_ramp(1.0, 0.0, 0).is_empty());
    assert_eq!(linear_ramp(1.0, 0.0, 1), vec![1.0]);
    assert_eq!(linear_ramp(1.0, 0.0, 2), vec![1.0, 0.0]);
}

#[test]
fn seconds_to_samples_floors_and_clamps() {
    assert_eq!(seconds_to_samples(2.0, 44_100), 88_200);
    assert_eq!(seconds_to_samples(0.5, 3), 1);
    assert_eq!(seconds_to_samples(-1.0, 44_100), 0);
}

#[test]
fn fit_length_pads_and_truncates() {
    assert_eq!(fit_length(&[1.0, 2.0], 4), vec![1.0, 2.0, 0.0, 0.0]);
    assert_eq!(fit_length(&[1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
}

#[test]
fn downmix_averages_frames() {
    let stereo = vec![0.2, 0.4, -1.0, 1.0];
    let mono = downmix_to_mono(&stereo, 2);
    assert_eq!(mono.len(), 2);
    assert_abs_diff_eq!(mono[0], 0.3, epsilon = 1e-7);
    assert_abs_diff_eq!(mono[1], 0.0, epsilon = 1e-7);
    assert_eq!(downmix_to_mono(&stereo, 1), stereo);
}

#[test]
fn levels() {
    assert_eq!(peak(&[]), 0.0);
    assert_eq!(rms(&[]), 0.0);
    assert_abs_diff_eq!(peak(&[0.1, -0.7, 0.3]), 0.7, epsilon = 1e-7);
    assert_abs_diff_eq!(rms(&[0.5, -0.5]), 0.5, epsilon = 1e-7);
}

#[test]
fn tail_takes_trailing_seconds() {
    let audio = AudioBuffer::new((0..10).map(|i| i as f32).collect(), 4);
    assert_eq!(audio.tail(0.5).samples, vec![8.0, 9.0]);
    assert_eq!(audio.tail(100.0).len(), 10);
    assert!(audio.tail(0.0).is_empty());
}

#[test]
fn resample_doubles_length() {
    let input: Vec<f32> = (0..4_000)
        .map(|i| (2.0 * std::f32::consts::PI * 200.0 * i as f32 / 8_000.0).sin() * 0.5)
        .collect();
    let out = resample_mono(&input, 8_000, 16_000).unwrap();
    assert_eq!(out.len(), 8_000);
    let mid = &out[2_000..6_000];
    assert!(peak(mid) > 0.4 && peak(mid) < 0.6, "peak {}", peak(mid));
}

#[test]
fn resample_same_rate_is_identity() {
    let input = vec![0.1, 0.2, 0.3];
    assert_eq!(resample_mono(&input, 44_100, 44_100).unwrap(), input);
}
