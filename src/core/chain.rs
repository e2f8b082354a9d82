use crate::{
    core::dsp,
    error::{LemmError, Result},
    types::AudioBuffer,
};

/// Exponent of the fade-out curve applied to the end of a song.
const FADE_OUT_EXPONENT: f64 = 1.5;

/// Join clips into one waveform.
///
/// Adjacent clips overlap by `crossfade_seconds`, the earlier one ramping
/// linearly down while the later one ramps linearly up. The end of the result
/// always fades to silence over the same duration (see [`final_fadeout`]).
///
/// Every clip must be at `sample_rate`. With more than one clip, each must
/// also be at least as long as the crossfade; a last clip of exactly that
/// length is faded out over the overlap itself.
pub fn chain(
    clips: &[AudioBuffer],
    crossfade_seconds: f32,
    sample_rate: u32,
) -> Result<AudioBuffer> {
    if clips.is_empty() {
        return Err(LemmError::input("cannot chain an empty clip sequence"));
    }
    if let Some((i, clip)) = clips
        .iter()
        .enumerate()
        .find(|(_, c)| c.sample_rate != sample_rate)
    {
        return Err(LemmError::input(format!(
            "clip {} is {} Hz, chain expects {sample_rate} Hz",
            i + 1,
            clip.sample_rate
        )));
    }

    let crossfade = dsp::seconds_to_samples(crossfade_seconds, sample_rate);

    if clips.len() == 1 {
        return Ok(AudioBuffer::new(
            final_fadeout(&clips[0].samples, crossfade),
            sample_rate,
        ));
    }

    if let Some((i, clip)) = clips.iter().enumerate().find(|(_, c)| c.len() < crossfade) {
        return Err(LemmError::input(format!(
            "clip {} has {} samples, shorter than the {crossfade}-sample crossfade",
            i + 1,
            clip.len()
        )));
    }

    tracing::info!(clips = clips.len(), crossfade, "chaining clips with crossfade");

    let total: usize =
        clips.iter().map(AudioBuffer::len).sum::<usize>() - (clips.len() - 1) * crossfade;
    let mut out = vec![0.0f32; total];

    let fade_in = dsp::linear_ramp(0.0, 1.0, crossfade);
    let fade_out = dsp::linear_ramp(1.0, 0.0, crossfade);
    let last = clips.len() - 1;

    out[..clips[0].len()].copy_from_slice(&clips[0].samples);
    let mut pos = clips[0].len() - crossfade;

    for (i, clip) in clips.iter().enumerate().skip(1) {
        let overlap = &mut out[pos..pos + crossfade];
        for (k, s) in overlap.iter_mut().enumerate() {
            *s = *s * fade_out[k] + clip.samples[k] * fade_in[k];
        }

        let body = &clip.samples[crossfade..];
        let start = pos + crossfade;
        if i == last && body.is_empty() {
            let faded = final_fadeout(&out[pos..], crossfade);
            out[pos..].copy_from_slice(&faded);
        } else if i == last {
            let faded = final_fadeout(body, crossfade);
            out[start..start + faded.len()].copy_from_slice(&faded);
        } else {
            out[start..start + body.len()].copy_from_slice(body);
        }

        pos += clip.len() - crossfade;
    }

    tracing::info!(samples = total, "crossfade complete with smooth ending");
    Ok(AudioBuffer::new(out, sample_rate))
}

/// Fade the last `fade_samples` of `audio` to silence along `(1 - t)^1.5`.
///
/// Audio no longer than the fade is faded over its whole length with a
/// linear ramp instead.
pub fn final_fadeout(audio: &[f32], fade_samples: usize) -> Vec<f32> {
    let mut faded = audio.to_vec();

    if faded.len() <= fade_samples {
        let ramp = dsp::linear_ramp(1.0, 0.0, faded.len());
        dsp::apply_gain_curve(&mut faded, &ramp);
        return faded;
    }

    let fade_start = faded.len() - fade_samples;
    let curve: Vec<f32> = dsp::linear_ramp(1.0, 0.0, fade_samples)
        .into_iter()
        .map(|g| (g as f64).powf(FADE_OUT_EXPONENT) as f32)
        .collect();
    dsp::apply_gain_curve(&mut faded[fade_start..], &curve);
    faded
}
