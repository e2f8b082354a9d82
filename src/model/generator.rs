use std::{
    f64::consts::PI,
    path::PathBuf,
    process::Command,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context};
use tempfile::tempdir;

use crate::{
    audio::{read_mono, write_audio},
    config::CommandSpec,
    core::dsp::seconds_to_samples,
    error::Result,
    model::{ClipRequest, Generator},
    types::AudioBuffer,
};

/// Runs an external text-to-music CLI once per clip.
///
/// The program is invoked as
/// `<program> [args..] --caption <text> --lyrics <text> --duration <s> --output <wav> [--seed <n>]`
/// and must write a WAV (any rate, mono or stereo) to the output path.
pub struct CommandGenerator {
    label: String,
    program: PathBuf,
    spec: CommandSpec,
}

impl CommandGenerator {
    pub fn new(label: impl Into<String>, program: PathBuf, spec: CommandSpec) -> Self {
        Self {
            label: label.into(),
            program,
            spec,
        }
    }
}

impl Generator for CommandGenerator {
    fn name(&self) -> &str {
        &self.label
    }

    fn generate_clip(&self, request: &ClipRequest<'_>) -> Result<AudioBuffer> {
        let tmp = tempdir()?;
        let out_wav = tmp.path().join("clip.wav");
        let caption = request.analysis.caption(request.prompt, request.has_vocals());

        tracing::info!(
            backend = %self.label,
            clip = request.clip_index + 1,
            caption = %caption,
            vocals = request.has_vocals(),
            "generating clip"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.spec.args)
            .arg("--caption")
            .arg(&caption)
            .arg("--lyrics")
            .arg(request.lyrics)
            .arg("--duration")
            .arg(request.duration_seconds.to_string())
            .arg("--output")
            .arg(&out_wav);

        if let Some(seed) = request.clip_seed() {
            cmd.arg("--seed").arg(seed.to_string());
        }

        if let (Some(flag), Some(tail)) = (&self.spec.conditioning_flag, request.previous_tail) {
            let cond_wav = tmp.path().join("conditioning.wav");
            write_audio(&cond_wav, tail)?;
            cmd.arg(flag).arg(&cond_wav);
        }

        let output = cmd
            .output()
            .with_context(|| format!("Failed to run generator {:?}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "generator {:?} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )
            .into());
        }

        let clip = read_mono(&out_wav, request.sample_rate)
            .with_context(|| format!("generator did not produce {:?}", out_wav))?;
        Ok(clip)
    }
}

/// Deterministic placeholder backend: a pulsing triad in the analysed key at
/// the analysed tempo, with an extra voice an octave up when lyrics are
/// present. Useful offline and in tests; never auto-selected.
#[derive(Clone, Copy, Debug)]
pub struct ToneGenerator {
    pub amplitude: f32,
}

impl Default for ToneGenerator {
    fn default() -> Self {
        Self { amplitude: 0.5 }
    }
}

impl Generator for ToneGenerator {
    fn name(&self) -> &str {
        "tone"
    }

    fn generate_clip(&self, request: &ClipRequest<'_>) -> Result<AudioBuffer> {
        let sr = request.sample_rate as f64;
        let n = seconds_to_samples(request.duration_seconds, request.sample_rate);

        let root = key_root_hz(&request.analysis.key);
        let third = if request.analysis.key.to_lowercase().contains("minor") {
            2f64.powf(3.0 / 12.0)
        } else {
            2f64.powf(4.0 / 12.0)
        };
        let fifth = 2f64.powf(7.0 / 12.0);
        let beat = 60.0 / request.analysis.tempo.max(1) as f64;
        let voice = if request.has_vocals() { 0.3 } else { 0.0 };
        // Continue phase from where the previous clip stopped.
        let offset = request.clip_index as f64 * request.duration_seconds as f64;
        let amp = self.amplitude as f64 / (1.0 + voice);

        let samples = (0..n)
            .map(|i| {
                let t = offset + i as f64 / sr;
                let chord = ((2.0 * PI * root * t).sin()
                    + (2.0 * PI * root * third * t).sin()
                    + (2.0 * PI * root * fifth * t).sin())
                    / 3.0;
                let beat_phase = (t % beat) / beat;
                let envelope = 0.6 + 0.4 * (-6.0 * beat_phase).exp();
                let lead = voice * (2.0 * PI * root * 2.0 * t).sin();
                (amp * (chord * envelope + lead)) as f32
            })
            .collect();

        Ok(AudioBuffer::new(samples, request.sample_rate))
    }
}

/// Root frequency (octave 3) of a key such as "F# Minor"; A3 when unparseable.
fn key_root_hz(key: &str) -> f64 {
    let mut chars = key.trim().chars();
    let semitones_from_a: i32 = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('C') => -9,
        Some('D') => -7,
        Some('E') => -5,
        Some('F') => -4,
        Some('G') => -2,
        Some('A') => 0,
        Some('B') => 2,
        _ => 0,
    };
    let accidental = match chars.next() {
        Some('#') => 1,
        Some('b') => -1,
        _ => 0,
    };
    220.0 * 2f64.powf((semitones_from_a + accidental) as f64 / 12.0)
}

/// One generator handle shared between requests. Calls are serialized: the
/// lock is held for the whole of one clip generation.
pub struct SharedGenerator<G> {
    name: String,
    inner: Arc<Mutex<G>>,
}

impl<G: Generator> SharedGenerator<G> {
    pub fn new(generator: G) -> Self {
        Self {
            name: generator.name().to_string(),
            inner: Arc::new(Mutex::new(generator)),
        }
    }
}

impl<G> Clone for SharedGenerator<G> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: Generator> Generator for SharedGenerator<G> {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_clip(&self, request: &ClipRequest<'_>) -> Result<AudioBuffer> {
        let generator = self
            .inner
            .lock()
            .map_err(|_| anyhow!("generator handle poisoned"))?;
        generator.generate_clip(request)
    }
}
