use anyhow::Result;
use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

const CHUNK_SIZE: usize = 1024;

pub fn build_resampler(src_rate: u32, dst_rate: u32) -> Result<SincFixedIn<f32>> {
    let ratio = dst_rate as f64 / src_rate as f64;
    let sinc_len = 256usize;
    let window = WindowFunction::BlackmanHarris2;
    let f_cutoff = calculate_cutoff(sinc_len, window);
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window,
    };
    let r = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1)?;
    Ok(r)
}

/// Resample mono audio. Output length is `round(len * dst / src)`, with the
/// filter delay removed so the result stays time-aligned with the input.
pub fn resample_mono(samples: &[f32], src_rate: u32, dst_rate: u32) -> Result<Vec<f32>> {
    if src_rate == dst_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if src_rate == 0 || dst_rate == 0 {
        anyhow::bail!("invalid sample rate conversion {src_rate} -> {dst_rate}");
    }

    let mut resampler = build_resampler(src_rate, dst_rate)?;
    let expected =
        (samples.len() as f64 * dst_rate as f64 / src_rate as f64).round() as usize;
    let delay = resampler.output_delay();

    let mut out: Vec<f32> = Vec::with_capacity(expected + delay);
    let mut pos = 0usize;

    loop {
        let need = resampler.input_frames_next();
        if pos + need > samples.len() {
            break;
        }
        let block = [&samples[pos..pos + need]];
        let processed = resampler.process(&block[..], None)?;
        out.extend_from_slice(&processed[0]);
        pos += need;
    }

    if pos < samples.len() {
        let block = [&samples[pos..]];
        let processed = resampler.process_partial(Some(&block[..]), None)?;
        out.extend_from_slice(&processed[0]);
    }

    // Flush the filter until the delayed tail is out.
    while out.len() < expected + delay {
        let processed = resampler.process_partial::<Vec<f32>>(None, None)?;
        if processed[0].is_empty() {
            break;
        }
        out.extend_from_slice(&processed[0]);
    }

    let start = delay.min(out.len());
    let mut aligned = out.split_off(start);
    aligned.resize(expected, 0.0);
    Ok(aligned)
}
