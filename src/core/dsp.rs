/// Largest absolute sample value, 0.0 for empty input.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

pub fn seconds_to_samples(seconds: f32, sample_rate: u32) -> usize {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds as f64 * sample_rate as f64) as usize
}

/// `n` evenly spaced values from `start` to `end`, both endpoints included.
/// A single value is `start`.
pub fn linear_ramp(start: f32, end: f32, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end as f64 - start as f64) / (n - 1) as f64;
            let mut ramp: Vec<f32> = (0..n)
                .map(|i| (start as f64 + step * i as f64) as f32)
                .collect();
            ramp[n - 1] = end;
            ramp
        }
    }
}

/// Multiply `samples` element-wise by `gains` (shorter of the two wins).
pub fn apply_gain_curve(samples: &mut [f32], gains: &[f32]) {
    for (s, g) in samples.iter_mut().zip(gains) {
        *s *= g;
    }
}

pub fn scale(samples: &mut [f32], gain: f32) {
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// Pad with trailing silence or truncate to exactly `len` samples.
pub fn fit_length(samples: &[f32], len: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(&samples[..samples.len().min(len)]);
    out.resize(len, 0.0);
    out
}

/// Average interleaved frames down to one channel.
pub fn downmix_to_mono(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels as usize)
        .map(|frame| frame.iter().copied().sum::<f32>() / frame.len() as f32)
        .collect()
}
