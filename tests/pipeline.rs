use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use approx::assert_abs_diff_eq;
use lemm_core::{
    read_mono, AudioBuffer, ClipRequest, Config, Diagnostic, FileWriter, Generator, LemmError,
    PassthroughSeparator, SongPipeline, SongRequest, Stage, StemName, StemSeparator, StemSet,
    ToneGenerator, WavFileWriter,
};
use tempfile::tempdir;

const SR: u32 = 1_000;

fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.audio.sample_rate = SR;
    config.audio.clip_duration = 1.0;
    config.audio.crossfade_duration = 0.1;
    config.audio.conditioning_duration = 0.2;
    config.output.directory = dir.to_path_buf();
    config.output.prefix = "test".into();
    config
}

fn pipeline(
    config: &Config,
    generator: impl Generator + 'static,
    separator: impl StemSeparator + 'static,
) -> SongPipeline {
    let writer = WavFileWriter::new(config.output.directory.clone(), config.output.prefix.clone());
    SongPipeline::new(config, Box::new(generator), Box::new(separator), Box::new(writer))
}

fn files_in(dir: &Path) -> usize {
    fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[derive(Debug)]
struct Call {
    index: usize,
    lyrics: String,
    tail: Option<Vec<f32>>,
    seed: Option<u64>,
}

/// Returns a 1.5 s ramp and records what it was asked for.
#[derive(Default)]
struct RecordingGenerator {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Generator for RecordingGenerator {
    fn name(&self) -> &str {
        "recording"
    }

    fn generate_clip(&self, request: &ClipRequest<'_>) -> lemm_core::Result<AudioBuffer> {
        self.calls.lock().unwrap().push(Call {
            index: request.clip_index,
            lyrics: request.lyrics.to_string(),
            tail: request.previous_tail.map(|t| t.samples.clone()),
            seed: request.clip_seed(),
        });
        let samples = (0..1_500).map(|i| i as f32 / 1_500.0).collect();
        Ok(AudioBuffer::new(samples, request.sample_rate))
    }
}

struct FailingGenerator {
    fail_at: usize,
}

impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    fn generate_clip(&self, request: &ClipRequest<'_>) -> lemm_core::Result<AudioBuffer> {
        if request.clip_index == self.fail_at {
            return Err(anyhow::anyhow!("model crashed").into());
        }
        ToneGenerator::default().generate_clip(request)
    }
}

struct SilentGenerator;

impl Generator for SilentGenerator {
    fn name(&self) -> &str {
        "silent"
    }

    fn generate_clip(&self, request: &ClipRequest<'_>) -> lemm_core::Result<AudioBuffer> {
        Ok(AudioBuffer::silent(10, request.sample_rate))
    }
}

/// Emits a 1 s tone at half the requested rate.
struct HalfRateGenerator;

impl Generator for HalfRateGenerator {
    fn name(&self) -> &str {
        "half-rate"
    }

    fn generate_clip(&self, request: &ClipRequest<'_>) -> lemm_core::Result<AudioBuffer> {
        let rate = request.sample_rate / 2;
        let samples = (0..rate)
            .map(|i| (2.0 * std::f32::consts::PI * 50.0 * i as f32 / rate as f32).sin() * 0.5)
            .collect();
        Ok(AudioBuffer::new(samples, rate))
    }
}

#[derive(Default)]
struct RecordingSeparator {
    vocals: Arc<Mutex<Vec<bool>>>,
}

impl StemSeparator for RecordingSeparator {
    fn name(&self) -> &str {
        "recording"
    }

    fn process_clip(&self, clip: &AudioBuffer, has_vocals: bool) -> lemm_core::Result<StemSet> {
        self.vocals.lock().unwrap().push(has_vocals);
        Ok(StemSet::passthrough(clip))
    }
}

struct VocalsOnlySeparator;

impl StemSeparator for VocalsOnlySeparator {
    fn name(&self) -> &str {
        "vocals-only"
    }

    fn process_clip(&self, clip: &AudioBuffer, _has_vocals: bool) -> lemm_core::Result<StemSet> {
        Ok(StemSet::new(clip.sample_rate).with(StemName::Vocals, clip.samples.clone()))
    }
}

struct ShortStemSeparator;

impl StemSeparator for ShortStemSeparator {
    fn name(&self) -> &str {
        "short"
    }

    fn process_clip(&self, clip: &AudioBuffer, _has_vocals: bool) -> lemm_core::Result<StemSet> {
        Ok(StemSet::passthrough(&clip.fit_to_len(clip.len() - 1)))
    }
}

/// Raises the cancel flag from inside the first generation call.
struct CancellingGenerator {
    flag: Arc<AtomicBool>,
}

impl Generator for CancellingGenerator {
    fn name(&self) -> &str {
        "cancelling"
    }

    fn generate_clip(&self, request: &ClipRequest<'_>) -> lemm_core::Result<AudioBuffer> {
        self.flag.store(true, Ordering::SeqCst);
        ToneGenerator::default().generate_clip(request)
    }
}

#[test]
fn three_clip_song_is_chained_mastered_and_saved() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let p = pipeline(&config, ToneGenerator::default(), PassthroughSeparator);

    let song = p
        .generate_song(&SongRequest::new("chill lo-fi with piano", 3))
        .expect("song generation failed");

    assert!(song.path.is_file());
    assert_eq!(song.clip_count, 3);
    assert!(song.diagnostics.is_empty());
    assert!(song.stem_paths.is_empty());
    assert_eq!(song.analysis.genre, "Lo-Fi");
    // 3 * 1000 - 2 * 100 samples
    assert_abs_diff_eq!(song.duration_seconds, 2.8, epsilon = 1e-6);
    assert_abs_diff_eq!(song.peak, 0.9, epsilon = 1e-4);

    let saved = read_mono(&song.path, SR).unwrap();
    assert_eq!(saved.len(), 2_800);
    assert_eq!(files_in(dir.path()), 1);
}

#[test]
fn stems_are_exported_when_enabled() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.output.export_stems = true;
    let p = pipeline(&config, ToneGenerator::default(), PassthroughSeparator);

    let song = p.generate_song(&SongRequest::new("rock", 2)).unwrap();
    assert_eq!(song.stem_paths.len(), 8);
    assert!(song.stem_paths.iter().all(|p| p.is_file()));
    assert_eq!(files_in(dir.path()), 9);
}

#[test]
fn clips_are_conditioned_on_previous_tail() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let generator = RecordingGenerator::default();
    let calls = Arc::clone(&generator.calls);
    let p = pipeline(&config, generator, PassthroughSeparator);

    let mut request = SongRequest::new("pop song", 2).with_lyrics("verse\n\nchorus");
    request.seed = Some(7);
    p.generate_song(&request).unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].index, 0);
    assert!(calls[0].tail.is_none());
    assert_eq!(calls[0].lyrics, "verse");
    assert_eq!(calls[0].seed, Some(7));

    // Clip 1 was truncated to 1000 samples; its last 0.2 s start at 800.
    let tail = calls[1].tail.as_ref().expect("second clip has no conditioning");
    assert_eq!(tail.len(), 200);
    assert_abs_diff_eq!(tail[0], 800.0 / 1_500.0, epsilon = 1e-6);
    assert_abs_diff_eq!(tail[199], 999.0 / 1_500.0, epsilon = 1e-6);
    assert_eq!(calls[1].lyrics, "chorus");
    assert_eq!(calls[1].seed, Some(8));
}

#[test]
fn separator_is_told_about_vocals() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let separator = RecordingSeparator::default();
    let vocals = Arc::clone(&separator.vocals);
    let p = pipeline(&config, ToneGenerator::default(), separator);

    p.generate_song(&SongRequest::new("jazz", 1)).unwrap();
    p.generate_song(&SongRequest::new("jazz", 1).with_lyrics("la la"))
        .unwrap();

    assert_eq!(*vocals.lock().unwrap(), vec![false, true]);
}

#[test]
fn generator_failure_aborts_without_writing() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let p = pipeline(&config, FailingGenerator { fail_at: 1 }, PassthroughSeparator);

    let err = p.generate_song(&SongRequest::new("metal", 3)).unwrap_err();
    match err {
        LemmError::Collaborator { stage, .. } => assert_eq!(stage, Stage::GenerateClip(1)),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(files_in(dir.path()), 0);
}

#[test]
fn incomplete_stem_set_fails_processing() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let p = pipeline(&config, ToneGenerator::default(), VocalsOnlySeparator);

    let err = p.generate_song(&SongRequest::new("folk", 2)).unwrap_err();
    match err {
        LemmError::Collaborator { stage, source } => {
            assert_eq!(stage, Stage::ProcessClip(0));
            assert!(matches!(*source, LemmError::InputViolation(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(files_in(dir.path()), 0);
}

#[test]
fn short_stems_fail_processing() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let p = pipeline(&config, ToneGenerator::default(), ShortStemSeparator);

    let err = p.generate_song(&SongRequest::new("folk", 1)).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::ProcessClip(0)));
}

#[test]
fn silent_generation_is_reported_not_fatal() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let p = pipeline(&config, SilentGenerator, PassthroughSeparator);

    let song = p.generate_song(&SongRequest::new("ambient", 1)).unwrap();
    assert_eq!(
        song.diagnostics,
        vec![
            Diagnostic::SilentClip { index: 0 },
            Diagnostic::SilentMix { index: 0 },
            Diagnostic::SilentMaster,
        ]
    );
    assert_eq!(song.peak, 0.0);
    assert!(song.path.is_file());
}

#[test]
fn off_rate_clips_are_resampled_and_fit() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let p = pipeline(&config, HalfRateGenerator, PassthroughSeparator);

    let song = p.generate_song(&SongRequest::new("house", 1)).unwrap();
    let saved = read_mono(&song.path, SR).unwrap();
    assert_eq!(saved.len(), 1_000);
    assert!(song.peak > 0.5);
}

#[test]
fn invalid_requests_are_rejected_up_front() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let p = pipeline(&config, ToneGenerator::default(), PassthroughSeparator);

    for request in [
        SongRequest::new("pop", 0),
        SongRequest::new("pop", config.generation.max_clips + 1),
        SongRequest::new("   ", 2),
    ] {
        let err = p.generate_song(&request).unwrap_err();
        assert!(matches!(err, LemmError::InputViolation(_)), "{err}");
    }
    assert_eq!(files_in(dir.path()), 0);
}

#[test]
fn cancelled_before_start() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let p = pipeline(&config, ToneGenerator::default(), PassthroughSeparator);

    let cancel = AtomicBool::new(true);
    let err = p
        .generate_song_cancellable(&SongRequest::new("pop", 2), &cancel)
        .unwrap_err();
    assert!(matches!(
        err,
        LemmError::Cancelled {
            stage: Stage::GenerateClip(0)
        }
    ));
}

#[test]
fn cancelled_between_clips_writes_nothing() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let flag = Arc::new(AtomicBool::new(false));
    let generator = CancellingGenerator {
        flag: Arc::clone(&flag),
    };
    let p = pipeline(&config, generator, PassthroughSeparator);

    let err = p
        .generate_song_cancellable(&SongRequest::new("pop", 3), &flag)
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::GenerateClip(1)));
    assert_eq!(files_in(dir.path()), 0);
}

#[test]
fn write_failure_is_a_persistence_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();
    let config = test_config(&blocker.join("out"));
    let p = pipeline(&config, ToneGenerator::default(), PassthroughSeparator);

    let err = p.generate_song(&SongRequest::new("pop", 1)).unwrap_err();
    assert!(matches!(err, LemmError::Persistence { .. }));
    assert_eq!(err.stage(), Some(Stage::Persist));
}

/// Writes real files but fails on the `fail_on`-th save (1-based).
struct FailingWriter {
    inner: WavFileWriter,
    calls: AtomicUsize,
    fail_on: usize,
}

impl FileWriter for FailingWriter {
    fn save(&self, audio: &AudioBuffer, label: &str) -> lemm_core::Result<PathBuf> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(LemmError::Persistence {
                path: PathBuf::from(label),
                source: anyhow::anyhow!("disk full"),
            });
        }
        self.inner.save(audio, label)
    }
}

fn run_with_failing_writer(fail_on: usize) -> (LemmError, usize) {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.output.export_stems = true;
    let writer = FailingWriter {
        inner: WavFileWriter::new(dir.path(), "test"),
        calls: AtomicUsize::new(0),
        fail_on,
    };
    let p = SongPipeline::new(
        &config,
        Box::new(ToneGenerator::default()),
        Box::new(PassthroughSeparator),
        Box::new(writer),
    );

    let err = p.generate_song(&SongRequest::new("pop", 2)).unwrap_err();
    (err, files_in(dir.path()))
}

#[test]
fn failed_stem_export_leaves_no_files() {
    let (err, left) = run_with_failing_writer(2);
    assert!(matches!(err, LemmError::Persistence { .. }));
    assert_eq!(left, 0);
}

#[test]
fn failed_song_save_removes_exported_stems() {
    // 2 clips * 4 stems, then the song
    let (err, left) = run_with_failing_writer(9);
    assert!(matches!(err, LemmError::Persistence { .. }));
    assert_eq!(left, 0);
}
