use crate::{
    core::dsp,
    error::{LemmError, Result},
    types::{AudioBuffer, StemSet},
};

/// Stems quieter than this are treated as empty and left out of the mix.
pub const SILENCE_THRESHOLD: f32 = 1e-6;

/// Mixes louder than this are rescaled down to it.
pub const MIX_HEADROOM: f32 = 0.95;

/// Sum the stems of one clip with their fixed gains.
///
/// The result is only normalized when its peak exceeds [`MIX_HEADROOM`], so
/// quiet mixes keep their level relative to loud ones.
pub fn mix_stems(stems: &StemSet) -> Result<AudioBuffer> {
    let reference_len = stems
        .reference_len()
        .ok_or_else(|| LemmError::input("cannot mix an empty stem set"))?;

    if let Some((name, samples)) = stems.iter().find(|(_, s)| s.len() != reference_len) {
        return Err(LemmError::input(format!(
            "stem '{name}' has {} samples, expected {reference_len}",
            samples.len()
        )));
    }

    let names: Vec<&str> = stems.iter().map(|(name, _)| name.as_str()).collect();
    tracing::info!(stems = ?names, "mixing stems");

    let mut mixed = vec![0.0f32; reference_len];

    for (name, samples) in stems.iter() {
        let stem_peak = dsp::peak(samples);
        if stem_peak < SILENCE_THRESHOLD {
            tracing::debug!(stem = %name, "skipping empty stem");
            continue;
        }

        let gain = name.gain();
        tracing::info!(
            stem = %name,
            gain,
            peak = stem_peak,
            "adding stem"
        );
        for (acc, &s) in mixed.iter_mut().zip(samples) {
            *acc += s * gain;
        }
    }

    let mixed_peak = dsp::peak(&mixed);
    tracing::info!(peak = mixed_peak, rms = dsp::rms(&mixed), "mixed audio levels");

    if mixed_peak == 0.0 {
        tracing::warn!("mixed audio is silent");
    } else if mixed_peak > MIX_HEADROOM {
        dsp::scale(&mut mixed, MIX_HEADROOM / mixed_peak);
        tracing::info!(was = mixed_peak, "normalized mix to headroom");
    }

    Ok(AudioBuffer::new(mixed, stems.sample_rate))
}
