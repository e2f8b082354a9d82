use std::{
    fs,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::{
    analysis::{lyrics_for_clip, MusicAnalysis, PromptAnalyzer},
    config::{AudioSettings, Config, GenerationSettings},
    core::{chain::chain, master::master, mixer::mix_stems, resample::resample_mono},
    error::{LemmError, Result},
    io::{
        progress::{emit_progress, SongProgress},
        writer::{FileWriter, WavFileWriter},
    },
    model::{
        capabilities::{BackendPreference, Capabilities},
        ClipRequest, Generator, StemSeparator,
    },
    types::{AudioBuffer, Diagnostic, SongOutput, SongRequest, Stage, StemSet},
};

/// Turns a prompt into one mastered song file.
///
/// Settings are copied in at construction; collaborators are chosen once and
/// never swapped per request.
pub struct SongPipeline {
    audio: AudioSettings,
    generation: GenerationSettings,
    export_stems: bool,
    analyzer: PromptAnalyzer,
    generator: Box<dyn Generator>,
    separator: Box<dyn StemSeparator>,
    writer: Box<dyn FileWriter>,
}

impl SongPipeline {
    pub fn new(
        config: &Config,
        generator: Box<dyn Generator>,
        separator: Box<dyn StemSeparator>,
        writer: Box<dyn FileWriter>,
    ) -> Self {
        tracing::info!(
            generator = generator.name(),
            separator = separator.name(),
            sample_rate = config.audio.sample_rate,
            clip_duration = config.audio.clip_duration,
            "song pipeline ready"
        );
        Self {
            audio: config.audio,
            generation: config.generation.clone(),
            export_stems: config.output.export_stems,
            analyzer: PromptAnalyzer::new(),
            generator,
            separator,
            writer,
        }
    }

    /// Build the collaborators the probed capabilities allow.
    pub fn from_config(
        config: &Config,
        capabilities: &Capabilities,
        preference: BackendPreference,
    ) -> Result<Self> {
        let generator = capabilities.build_generator(config, preference)?;
        let separator = capabilities.build_separator(config);
        let writer = WavFileWriter::new(
            config.output.directory.clone(),
            config.output.prefix.clone(),
        );
        Ok(Self::new(config, generator, separator, Box::new(writer)))
    }

    pub fn generate_song(&self, request: &SongRequest) -> Result<SongOutput> {
        self.generate_song_cancellable(request, &AtomicBool::new(false))
    }

    /// Like [`generate_song`](Self::generate_song), checking `cancel` before
    /// every clip step. A cancelled request persists nothing.
    pub fn generate_song_cancellable(
        &self,
        request: &SongRequest,
        cancel: &AtomicBool,
    ) -> Result<SongOutput> {
        self.validate(request)?;
        let n = request.clip_count;
        let mut diagnostics = Vec::new();

        enter(Stage::Analyze);
        let analysis = self.analyzer.analyze(&request.prompt);

        let clips = self.generate_clips(request, &analysis, cancel, &mut diagnostics)?;
        let stems = self.process_clips(request, &clips, cancel)?;

        enter(Stage::MixChainMaster);
        let mut mixes = Vec::with_capacity(n);
        for (i, set) in stems.iter().enumerate() {
            let mixed = mix_stems(set)?;
            if mixed.is_silent() {
                tracing::warn!(clip = i + 1, "mixed clip is silent");
                diagnostics.push(Diagnostic::SilentMix { index: i });
            }
            mixes.push(mixed);
        }

        let song = chain(&mixes, self.audio.crossfade_duration, self.audio.sample_rate)?;
        if song.is_silent() {
            tracing::warn!("song is silent, nothing to normalize");
            diagnostics.push(Diagnostic::SilentMaster);
        }
        let mastered = master(&song);

        enter(Stage::Persist);
        let (path, stem_paths) = self.persist(&mastered, &stems)?;

        enter(Stage::Done);
        let output = SongOutput {
            path,
            stem_paths,
            analysis,
            clip_count: n,
            duration_seconds: mastered.duration_seconds(),
            peak: mastered.peak(),
            rms: mastered.rms(),
            diagnostics,
        };
        tracing::info!(
            path = %output.path.display(),
            seconds = output.duration_seconds,
            peak = output.peak,
            rms = output.rms,
            "song generated"
        );
        Ok(output)
    }

    /// Save the stems (when exported), then the song. On any failure the
    /// files already written are removed again.
    fn persist(&self, song: &AudioBuffer, stems: &[StemSet]) -> Result<(PathBuf, Vec<PathBuf>)> {
        let mut written = Vec::new();
        match self.save_all(song, stems, &mut written) {
            Ok(path) => Ok((path, written)),
            Err(e) => {
                for p in &written {
                    if let Err(rm) = fs::remove_file(p) {
                        tracing::warn!(path = %p.display(), error = %rm, "partial output left behind");
                    }
                }
                Err(e)
            }
        }
    }

    fn save_all(
        &self,
        song: &AudioBuffer,
        stems: &[StemSet],
        written: &mut Vec<PathBuf>,
    ) -> Result<PathBuf> {
        if self.export_stems {
            for (i, set) in stems.iter().enumerate() {
                for (name, samples) in set.iter() {
                    let stem = AudioBuffer::new(samples.to_vec(), set.sample_rate);
                    written.push(self.writer.save(&stem, &format!("clip{}_{name}", i + 1))?);
                }
            }
        }
        self.writer.save(song, "song")
    }

    fn validate(&self, request: &SongRequest) -> Result<()> {
        if request.prompt.trim().is_empty() {
            return Err(LemmError::input("prompt must not be empty"));
        }
        let max = self.generation.max_clips;
        if request.clip_count == 0 || request.clip_count > max {
            return Err(LemmError::input(format!(
                "clip_count must be in 1..={max}, got {}",
                request.clip_count
            )));
        }
        Ok(())
    }

    fn generate_clips(
        &self,
        request: &SongRequest,
        analysis: &MusicAnalysis,
        cancel: &AtomicBool,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<AudioBuffer>> {
        let n = request.clip_count;
        let clip_len = self.audio.clip_samples();
        let lyrics = request.lyrics.as_deref().unwrap_or("");
        let mut clips: Vec<AudioBuffer> = Vec::with_capacity(n);

        for i in 0..n {
            let stage = Stage::GenerateClip(i);
            check_cancel(cancel, stage)?;
            enter(stage);

            let clip_lyrics = lyrics_for_clip(lyrics, i, n);
            let tail = clips
                .last()
                .map(|prev| prev.tail(self.audio.conditioning_duration));
            let clip_request = ClipRequest {
                prompt: &request.prompt,
                lyrics: &clip_lyrics,
                clip_index: i,
                clip_count: n,
                analysis,
                previous_tail: tail.as_ref(),
                duration_seconds: self.audio.clip_duration,
                sample_rate: self.audio.sample_rate,
                temperature: request.temperature,
                seed: request.seed,
            };

            let raw = self
                .generator
                .generate_clip(&clip_request)
                .map_err(|e| collaborator(stage, e))?;
            let clip = self
                .conform(raw)
                .map_err(|e| collaborator(stage, e))?
                .fit_to_len(clip_len);

            if clip.is_silent() {
                tracing::warn!(clip = i + 1, "generator returned silence");
                diagnostics.push(Diagnostic::SilentClip { index: i });
            }
            clips.push(clip);
        }
        Ok(clips)
    }

    fn process_clips(
        &self,
        request: &SongRequest,
        clips: &[AudioBuffer],
        cancel: &AtomicBool,
    ) -> Result<Vec<StemSet>> {
        let n = clips.len();
        let lyrics = request.lyrics.as_deref().unwrap_or("");
        let mut sets = Vec::with_capacity(n);

        for (i, clip) in clips.iter().enumerate() {
            let stage = Stage::ProcessClip(i);
            check_cancel(cancel, stage)?;
            enter(stage);

            let has_vocals = !lyrics_for_clip(lyrics, i, n).trim().is_empty();
            let set = self
                .separator
                .process_clip(clip, has_vocals)
                .map_err(|e| collaborator(stage, e))?;
            check_stems(&set, clip).map_err(|e| collaborator(stage, e))?;

            sets.push(set);
            emit_progress(SongProgress::ClipDone { index: i, count: n });
        }
        Ok(sets)
    }

    /// Bring generator output to the configured sample rate.
    fn conform(&self, clip: AudioBuffer) -> Result<AudioBuffer> {
        let rate = self.audio.sample_rate;
        if clip.sample_rate == rate {
            return Ok(clip);
        }
        if clip.sample_rate == 0 {
            return Err(LemmError::input("generator returned audio without a sample rate"));
        }
        tracing::info!(from = clip.sample_rate, to = rate, "resampling generated clip");
        let samples = resample_mono(&clip.samples, clip.sample_rate, rate)?;
        Ok(AudioBuffer::new(samples, rate))
    }
}

fn check_stems(set: &StemSet, clip: &AudioBuffer) -> Result<()> {
    if !set.has_fixed_stems() {
        return Err(LemmError::input(
            "separator must return vocals, drums, bass and other",
        ));
    }
    if let Some((name, samples)) = set.iter().find(|(_, s)| s.len() != clip.len()) {
        return Err(LemmError::input(format!(
            "stem '{name}' has {} samples, clip has {}",
            samples.len(),
            clip.len()
        )));
    }
    Ok(())
}

fn check_cancel(cancel: &AtomicBool, stage: Stage) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        tracing::warn!(%stage, "request cancelled");
        return Err(LemmError::Cancelled { stage });
    }
    Ok(())
}

fn collaborator(stage: Stage, source: LemmError) -> LemmError {
    tracing::error!(%stage, error = %source, "collaborator failed");
    LemmError::Collaborator {
        stage,
        source: Box::new(source),
    }
}

fn enter(stage: Stage) {
    tracing::info!(%stage, "entering stage");
    emit_progress(SongProgress::Stage(stage));
}
