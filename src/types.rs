use std::{collections::BTreeMap, fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{analysis::MusicAnalysis, core::dsp};

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Mono floating point audio at a fixed sample rate.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn silent(len: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn peak(&self) -> f32 {
        dsp::peak(&self.samples)
    }

    pub fn rms(&self) -> f32 {
        dsp::rms(&self.samples)
    }

    pub fn is_silent(&self) -> bool {
        self.peak() == 0.0
    }

    /// The trailing `seconds` of audio (the whole buffer if it is shorter).
    pub fn tail(&self, seconds: f32) -> AudioBuffer {
        let n = dsp::seconds_to_samples(seconds, self.sample_rate).min(self.samples.len());
        AudioBuffer::new(
            self.samples[self.samples.len() - n..].to_vec(),
            self.sample_rate,
        )
    }

    /// Pad with trailing silence or truncate to exactly `len` samples.
    pub fn fit_to_len(&self, len: usize) -> AudioBuffer {
        AudioBuffer::new(dsp::fit_length(&self.samples, len), self.sample_rate)
    }
}

/// Name of one separated track. The variant order is the fixed key order
/// used wherever stems are iterated.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StemName {
    Vocals,
    Drums,
    Bass,
    Other,
    Custom(String),
}

impl StemName {
    pub const FIXED: [StemName; 4] = [
        StemName::Vocals,
        StemName::Drums,
        StemName::Bass,
        StemName::Other,
    ];

    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "vocals" => StemName::Vocals,
            "drums" => StemName::Drums,
            "bass" => StemName::Bass,
            "other" => StemName::Other,
            custom => StemName::Custom(custom.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StemName::Vocals => "vocals",
            StemName::Drums => "drums",
            StemName::Bass => "bass",
            StemName::Other => "other",
            StemName::Custom(name) => name,
        }
    }

    /// Mix gain applied by the stem mixer.
    pub fn gain(&self) -> f32 {
        match self {
            StemName::Vocals => 1.0,
            StemName::Drums => 0.85,
            StemName::Bass => 0.80,
            StemName::Other => 0.75,
            StemName::Custom(_) => 0.60,
        }
    }
}

impl fmt::Display for StemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Separated tracks of one clip, keyed by stem name.
#[derive(Clone, Debug, PartialEq)]
pub struct StemSet {
    pub sample_rate: u32,
    stems: BTreeMap<StemName, Vec<f32>>,
}

impl StemSet {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stems: BTreeMap::new(),
        }
    }

    /// Whole clip under `other`, remaining fixed stems silent.
    pub fn passthrough(clip: &AudioBuffer) -> Self {
        let silence = vec![0.0; clip.len()];
        Self::new(clip.sample_rate)
            .with(StemName::Vocals, silence.clone())
            .with(StemName::Drums, silence.clone())
            .with(StemName::Bass, silence)
            .with(StemName::Other, clip.samples.clone())
    }

    pub fn with(mut self, name: StemName, samples: Vec<f32>) -> Self {
        self.insert(name, samples);
        self
    }

    pub fn insert(&mut self, name: StemName, samples: Vec<f32>) {
        self.stems.insert(name, samples);
    }

    pub fn get(&self, name: &StemName) -> Option<&[f32]> {
        self.stems.get(name).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, name: &StemName) -> Option<&mut Vec<f32>> {
        self.stems.get_mut(name)
    }

    /// Stems in fixed key order.
    pub fn iter(&self) -> impl Iterator<Item = (&StemName, &[f32])> {
        self.stems.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    pub fn has_fixed_stems(&self) -> bool {
        StemName::FIXED.iter().all(|name| self.stems.contains_key(name))
    }

    /// Length of the first stem in key order.
    pub fn reference_len(&self) -> Option<usize> {
        self.stems.values().next().map(Vec::len)
    }
}

/// Step of the song generation state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Analyze,
    GenerateClip(usize),
    ProcessClip(usize),
    MixChainMaster,
    Persist,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Analyze => f.write_str("analyze"),
            Stage::GenerateClip(i) => write!(f, "generate clip {}", i + 1),
            Stage::ProcessClip(i) => write!(f, "process clip {}", i + 1),
            Stage::MixChainMaster => f.write_str("mix/chain/master"),
            Stage::Persist => f.write_str("persist"),
            Stage::Done => f.write_str("done"),
        }
    }
}

/// Non-fatal findings surfaced alongside a finished song.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    SilentClip { index: usize },
    SilentMix { index: usize },
    SilentMaster,
}

#[derive(Clone, Debug)]
pub struct SongRequest {
    pub prompt: String,
    pub lyrics: Option<String>,
    pub clip_count: usize,
    pub temperature: f32,
    pub seed: Option<u64>,
}

impl SongRequest {
    pub fn new(prompt: impl Into<String>, clip_count: usize) -> Self {
        Self {
            prompt: prompt.into(),
            lyrics: None,
            clip_count,
            temperature: 1.0,
            seed: None,
        }
    }

    pub fn with_lyrics(mut self, lyrics: impl Into<String>) -> Self {
        self.lyrics = Some(lyrics.into());
        self
    }

    pub fn has_vocals(&self) -> bool {
        self.lyrics.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct SongOutput {
    pub path: PathBuf,
    pub stem_paths: Vec<PathBuf>,
    pub analysis: MusicAnalysis,
    pub clip_count: usize,
    pub duration_seconds: f32,
    pub peak: f32,
    pub rms: f32,
    pub diagnostics: Vec<Diagnostic>,
}
