//! One-time probing of which external programs are installed, and the
//! backend policy built on top of it.

use std::{
    env, fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    config::{CommandSpec, Config},
    error::{LemmError, Result},
    model::{
        generator::{CommandGenerator, SharedGenerator, ToneGenerator},
        separator::{CommandSeparator, PassthroughSeparator},
        Generator, StemSeparator,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    AceStep,
    MusicGen,
    Tone,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::AceStep => "ace-step",
            BackendKind::MusicGen => "musicgen",
            BackendKind::Tone => "tone",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    #[default]
    Auto,
    #[serde(alias = "ace-step")]
    AceStep,
    #[serde(rename = "musicgen")]
    MusicGen,
    Tone,
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(BackendPreference::Auto),
            "ace_step" | "acestep" => Ok(BackendPreference::AceStep),
            "musicgen" | "music_gen" => Ok(BackendPreference::MusicGen),
            "tone" => Ok(BackendPreference::Tone),
            other => Err(format!(
                "unknown backend '{other}' (expected auto, ace-step, musicgen or tone)"
            )),
        }
    }
}

/// Resolved locations of the external programs, fixed after startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub ace_step: Option<PathBuf>,
    pub musicgen: Option<PathBuf>,
    pub separator: Option<PathBuf>,
}

impl Capabilities {
    pub fn probe(config: &Config) -> Self {
        let caps = Self {
            ace_step: resolve_program(&config.models.ace_step.program),
            musicgen: resolve_program(&config.models.musicgen.program),
            separator: resolve_program(&config.models.separator.program),
        };
        tracing::info!(
            ace_step = caps.ace_step.is_some(),
            musicgen = caps.musicgen.is_some(),
            separator = caps.separator.is_some(),
            "capabilities probed"
        );
        caps
    }

    pub fn has(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::AceStep => self.ace_step.is_some(),
            BackendKind::MusicGen => self.musicgen.is_some(),
            BackendKind::Tone => true,
        }
    }

    /// Pick a backend for `preference`, with a human readable reason.
    pub fn select_generator(&self, preference: BackendPreference) -> Result<(BackendKind, String)> {
        let wanted = match preference {
            BackendPreference::AceStep => Some(BackendKind::AceStep),
            BackendPreference::MusicGen => Some(BackendKind::MusicGen),
            BackendPreference::Tone => Some(BackendKind::Tone),
            BackendPreference::Auto => None,
        };

        if let Some(kind) = wanted {
            return if self.has(kind) {
                Ok((kind, format!("{kind} requested explicitly")))
            } else {
                Err(LemmError::NoBackend(format!("{kind} requested but not installed")))
            };
        }

        if self.has(BackendKind::AceStep) {
            Ok((BackendKind::AceStep, "ace-step found (preferred)".into()))
        } else if self.has(BackendKind::MusicGen) {
            Ok((BackendKind::MusicGen, "ace-step missing, falling back to musicgen".into()))
        } else {
            Err(LemmError::NoBackend(
                "neither ace-step nor musicgen is installed".into(),
            ))
        }
    }

    pub fn build_generator(
        &self,
        config: &Config,
        preference: BackendPreference,
    ) -> Result<Box<dyn Generator>> {
        let (kind, reason) = self.select_generator(preference)?;
        tracing::info!(backend = %kind, %reason, "generation backend selected");

        let command = |path: &Option<PathBuf>, spec: &CommandSpec| -> Result<Box<dyn Generator>> {
            let program = path
                .clone()
                .ok_or_else(|| LemmError::NoBackend(format!("{kind} is not installed")))?;
            Ok(Box::new(SharedGenerator::new(CommandGenerator::new(
                kind.to_string(),
                program,
                spec.clone(),
            ))))
        };

        match kind {
            BackendKind::AceStep => command(&self.ace_step, &config.models.ace_step),
            BackendKind::MusicGen => command(&self.musicgen, &config.models.musicgen),
            BackendKind::Tone => Ok(Box::new(ToneGenerator::default())),
        }
    }

    pub fn build_separator(&self, config: &Config) -> Box<dyn StemSeparator> {
        match &self.separator {
            Some(program) => Box::new(CommandSeparator::new(
                program.clone(),
                config.models.separator.clone(),
            )),
            None => {
                tracing::warn!("no stem separator installed, clips pass through unseparated");
                Box::new(PassthroughSeparator)
            }
        }
    }
}

/// A path-like `program` must exist; a bare name is looked up on `PATH`.
fn resolve_program(program: &str) -> Option<PathBuf> {
    if program.trim().is_empty() {
        return None;
    }
    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
