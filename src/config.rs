//! Process-wide settings, read once at startup.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```json
//! { "audio": { "crossfade_duration": 3.0 }, "generation": { "backend": "tone" } }
//! ```

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{
    error::{LemmError, Result},
    model::capabilities::BackendPreference,
    types::DEFAULT_SAMPLE_RATE,
};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LEMM_CONFIG";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audio: AudioSettings,
    pub generation: GenerationSettings,
    pub models: ModelSettings,
    pub output: OutputSettings,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    /// Seconds per generated clip.
    pub clip_duration: f32,
    /// Overlap between adjacent clips, also the length of the final fade-out.
    pub crossfade_duration: f32,
    /// Seconds of the previous clip passed to the generator as conditioning.
    pub conditioning_duration: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            clip_duration: 32.0,
            crossfade_duration: 2.0,
            conditioning_duration: 2.0,
        }
    }
}

impl AudioSettings {
    pub fn clip_samples(&self) -> usize {
        crate::core::dsp::seconds_to_samples(self.clip_duration, self.sample_rate)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub default_clips: usize,
    pub max_clips: usize,
    pub temperature: f32,
    pub backend: BackendPreference,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            default_clips: 3,
            max_clips: 10,
            temperature: 1.0,
            backend: BackendPreference::Auto,
        }
    }
}

/// An external program and the extra arguments it always receives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Flag used to pass the conditioning WAV, if the program accepts one.
    #[serde(default)]
    pub conditioning_flag: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            conditioning_flag: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparatorSettings {
    pub program: String,
    pub model: String,
    /// Apply basic per-stem gain enhancement after separation.
    pub enhance: bool,
}

impl Default for SeparatorSettings {
    fn default() -> Self {
        Self {
            program: "stem-splitter".into(),
            model: "htdemucs_ort_v1".into(),
            enhance: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub ace_step: CommandSpec,
    pub musicgen: CommandSpec,
    pub separator: SeparatorSettings,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            ace_step: CommandSpec::new("ace-step"),
            musicgen: CommandSpec::new("musicgen"),
            separator: SeparatorSettings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
    pub prefix: String,
    pub export_stems: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            prefix: "lemm".into(),
            export_stems: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let a = &self.audio;
        if a.sample_rate == 0 {
            return Err(LemmError::Config("audio.sample_rate must be positive".into()));
        }
        if !(a.clip_duration > 0.0) {
            return Err(LemmError::Config("audio.clip_duration must be positive".into()));
        }
        if !(a.crossfade_duration >= 0.0) || a.crossfade_duration >= a.clip_duration {
            return Err(LemmError::Config(format!(
                "audio.crossfade_duration must be in [0, {})",
                a.clip_duration
            )));
        }
        if !(a.conditioning_duration >= 0.0) {
            return Err(LemmError::Config(
                "audio.conditioning_duration must not be negative".into(),
            ));
        }
        let g = &self.generation;
        if g.max_clips == 0 {
            return Err(LemmError::Config("generation.max_clips must be at least 1".into()));
        }
        if g.default_clips == 0 || g.default_clips > g.max_clips {
            return Err(LemmError::Config(format!(
                "generation.default_clips must be in 1..={}",
                g.max_clips
            )));
        }
        Ok(())
    }
}

/// Platform config location, e.g. `~/.config/lemm/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "Lemm", "lemm").map(|p| p.config_dir().join("config.json"))
}

/// Load settings from `path`, else `$LEMM_CONFIG`, else the platform default.
///
/// A missing file yields defaults. Unparseable or invalid settings are an
/// error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let explicit = path
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

    let config = match explicit.clone().or_else(default_config_path) {
        Some(p) if p.is_file() => {
            let text = fs::read_to_string(&p)?;
            let config: Config = serde_json::from_str(&text).map_err(|e| {
                LemmError::Config(format!("failed to parse {}: {e}", p.display()))
            })?;
            tracing::info!(path = %p.display(), "configuration loaded");
            config
        }
        Some(p) if explicit.is_some() => {
            tracing::warn!(path = %p.display(), "config file not found, using defaults");
            Config::default()
        }
        Some(_) => Config::default(),
        None => Config::default(),
    };

    config.validate()?;
    Ok(config)
}
