use crate::{core::dsp, types::AudioBuffer};

/// Peak level of a mastered song.
pub const MASTER_PEAK: f32 = 0.9;

const LIMITER_RANGE: f32 = 1.0 - MASTER_PEAK;
const LIMITER_DRIVE: f32 = 10.0;

/// Normalize to [`MASTER_PEAK`] and soft-limit anything above it.
///
/// Silent input is returned unchanged.
pub fn master(audio: &AudioBuffer) -> AudioBuffer {
    tracing::info!(
        peak = audio.peak(),
        rms = audio.rms(),
        "applying final mastering"
    );

    let mut mastered = audio.samples.clone();

    let max_val = dsp::peak(&mastered);
    if max_val > 0.0 {
        dsp::scale(&mut mastered, MASTER_PEAK / max_val);
        tracing::info!(from = max_val, to = MASTER_PEAK, "normalized");
    } else {
        tracing::warn!("mastering received silent audio");
    }

    let mut limited = 0usize;
    for s in mastered.iter_mut() {
        if s.abs() > MASTER_PEAK {
            *s = soft_limit(*s);
            limited += 1;
        }
    }
    if limited > 0 {
        tracing::info!(samples = limited, "applied soft limiting to peaks");
    }

    let out = AudioBuffer::new(mastered, audio.sample_rate);
    tracing::info!(peak = out.peak(), rms = out.rms(), "mastering complete");
    out
}

/// Soft-knee curve for samples above [`MASTER_PEAK`]. Approaches but never
/// reaches 1.0.
pub fn soft_limit(sample: f32) -> f32 {
    let over = sample.abs() - MASTER_PEAK;
    if over <= 0.0 {
        return sample;
    }
    sample.signum() * (MASTER_PEAK + LIMITER_RANGE * (over * LIMITER_DRIVE).tanh())
}
