use std::{fs, path::PathBuf};

use anyhow::anyhow;
use chrono::Local;
use uuid::Uuid;

use crate::{
    audio::write_audio,
    error::{LemmError, Result},
    types::AudioBuffer,
};

/// Persists finished audio and reports where it went.
pub trait FileWriter: Send + Sync {
    fn save(&self, audio: &AudioBuffer, label: &str) -> Result<PathBuf>;
}

impl<T: FileWriter + ?Sized> FileWriter for Box<T> {
    fn save(&self, audio: &AudioBuffer, label: &str) -> Result<PathBuf> {
        (**self).save(audio, label)
    }
}

/// Writes 16-bit mono WAV files into one directory, never reusing a name.
#[derive(Clone, Debug)]
pub struct WavFileWriter {
    directory: PathBuf,
    prefix: String,
}

impl WavFileWriter {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    fn file_name(&self, label: &str) -> String {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let id = Uuid::new_v4().simple().to_string();
        format!("{}_{}_{}_{}.wav", self.prefix, sanitize(label), stamp, &id[..8])
    }
}

impl FileWriter for WavFileWriter {
    fn save(&self, audio: &AudioBuffer, label: &str) -> Result<PathBuf> {
        let path = self.directory.join(self.file_name(label));
        let persist_err = |source: anyhow::Error| LemmError::Persistence {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.directory).map_err(|e| persist_err(e.into()))?;
        write_audio(&path, audio).map_err(persist_err)?;

        if !path.is_file() {
            return Err(persist_err(anyhow!("file missing after write")));
        }

        tracing::info!(path = %path.display(), seconds = audio.duration_seconds(), "audio saved");
        Ok(path)
    }
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
