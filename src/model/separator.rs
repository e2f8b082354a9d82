use std::{path::PathBuf, process::Command};

use anyhow::{anyhow, Context};
use tempfile::tempdir;

use crate::{
    audio::{read_mono, write_audio},
    config::SeparatorSettings,
    core::dsp::{fit_length, scale},
    error::Result,
    model::StemSeparator,
    types::{AudioBuffer, StemName, StemSet},
};

const BASS_ENHANCE: f32 = 1.05;
const DRUMS_ENHANCE: f32 = 1.03;

/// Delegates separation to a `stem-splitter` compatible CLI.
///
/// Runs `<program> split -i <clip.wav> -o <dir> -m <model> --quiet`, which
/// prints the vocals, drums, bass and other stem paths, one per line.
pub struct CommandSeparator {
    program: PathBuf,
    settings: SeparatorSettings,
}

impl CommandSeparator {
    pub fn new(program: PathBuf, settings: SeparatorSettings) -> Self {
        Self { program, settings }
    }
}

impl StemSeparator for CommandSeparator {
    fn name(&self) -> &str {
        "stem-splitter"
    }

    fn process_clip(&self, clip: &AudioBuffer, has_vocals: bool) -> Result<StemSet> {
        let tmp = tempdir()?;
        let input = tmp.path().join("clip.wav");
        write_audio(&input, clip)?;

        let output = Command::new(&self.program)
            .arg("split")
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(tmp.path())
            .arg("-m")
            .arg(&self.settings.model)
            .arg("--quiet")
            .output()
            .with_context(|| format!("Failed to run separator {:?}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "separator {:?} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let paths: Vec<&str> = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if paths.len() < StemName::FIXED.len() {
            return Err(anyhow!(
                "separator printed {} stem paths, expected {}",
                paths.len(),
                StemName::FIXED.len()
            )
            .into());
        }

        let mut stems = StemSet::new(clip.sample_rate);
        for (name, path) in StemName::FIXED.iter().zip(&paths) {
            let stem = read_mono(path, clip.sample_rate)
                .with_context(|| format!("Failed to read {name} stem"))?;
            stems.insert(name.clone(), fit_length(&stem.samples, clip.len()));
        }

        if self.settings.enhance {
            enhance(&mut stems);
        }

        tracing::debug!(vocals = has_vocals, stems = stems.len(), "clip separated");
        Ok(stems)
    }
}

/// Light gain lift on the rhythm section.
fn enhance(stems: &mut StemSet) {
    if let Some(bass) = stems.get_mut(&StemName::Bass) {
        scale(bass, BASS_ENHANCE);
    }
    if let Some(drums) = stems.get_mut(&StemName::Drums) {
        scale(drums, DRUMS_ENHANCE);
    }
}

/// Used when no separator is installed: the whole clip goes to `other`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughSeparator;

impl StemSeparator for PassthroughSeparator {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn process_clip(&self, clip: &AudioBuffer, _has_vocals: bool) -> Result<StemSet> {
        Ok(StemSet::passthrough(clip))
    }
}
