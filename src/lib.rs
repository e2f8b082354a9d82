//! # lemm-core
//!
//! Multi-clip song generation: analyse a prompt, generate clips with an
//! external model, separate and remix their stems, chain the clips with
//! crossfades and master the result to a WAV file.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod types;

pub use crate::{
    analysis::{lyrics_for_clip, MusicAnalysis, PromptAnalyzer},
    audio::{read_audio, read_mono, write_audio},
    config::{load_config, Config},
    core::{
        chain::{chain, final_fadeout},
        master::{master, soft_limit},
        mixer::mix_stems,
    },
    error::{LemmError, Result},
    io::{
        progress::{set_progress_callback, SongProgress},
        writer::{FileWriter, WavFileWriter},
    },
    model::{
        capabilities::{BackendKind, BackendPreference, Capabilities},
        generator::{CommandGenerator, SharedGenerator, ToneGenerator},
        separator::{CommandSeparator, PassthroughSeparator},
        ClipRequest, Generator, StemSeparator,
    },
    pipeline::SongPipeline,
    types::{
        AudioBuffer, Diagnostic, SongOutput, SongRequest, Stage, StemName, StemSet,
        DEFAULT_SAMPLE_RATE,
    },
};
