//! Collaborator contracts for the generative models.
//!
//! The models themselves are opaque: the pipeline only sees a [`Generator`]
//! producing clips and a [`StemSeparator`] splitting them. Concrete variants
//! are picked once at startup from a probed [`capabilities::Capabilities`]
//! record.

pub mod capabilities;
pub mod generator;
pub mod separator;

use crate::{
    analysis::MusicAnalysis,
    error::Result,
    types::{AudioBuffer, StemSet},
};

/// Everything a backend gets to produce one clip.
#[derive(Clone, Copy, Debug)]
pub struct ClipRequest<'a> {
    pub prompt: &'a str,
    /// Lyrics sung in this clip; empty for instrumental.
    pub lyrics: &'a str,
    pub clip_index: usize,
    pub clip_count: usize,
    pub analysis: &'a MusicAnalysis,
    /// Trailing audio of the previous clip, `None` for the first one.
    pub previous_tail: Option<&'a AudioBuffer>,
    pub duration_seconds: f32,
    pub sample_rate: u32,
    pub temperature: f32,
    pub seed: Option<u64>,
}

impl ClipRequest<'_> {
    pub fn has_vocals(&self) -> bool {
        !self.lyrics.trim().is_empty()
    }

    /// Per-clip seed derived from the request seed.
    pub fn clip_seed(&self) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(self.clip_index as u64))
    }
}

/// Produces one music clip per call.
///
/// Output may be any length and any sample rate; the pipeline resamples and
/// pads or truncates it to the configured clip length.
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    fn generate_clip(&self, request: &ClipRequest<'_>) -> Result<AudioBuffer>;
}

/// Splits a clip into stems.
///
/// The returned set must contain all four fixed stems, each as long as the
/// clip.
pub trait StemSeparator: Send + Sync {
    fn name(&self) -> &str;

    fn process_clip(&self, clip: &AudioBuffer, has_vocals: bool) -> Result<StemSet>;
}

impl<T: Generator + ?Sized> Generator for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate_clip(&self, request: &ClipRequest<'_>) -> Result<AudioBuffer> {
        (**self).generate_clip(request)
    }
}

impl<T: StemSeparator + ?Sized> StemSeparator for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn process_clip(&self, clip: &AudioBuffer, has_vocals: bool) -> Result<StemSet> {
        (**self).process_clip(clip, has_vocals)
    }
}
