use std::sync::{Mutex, OnceLock};

use crate::types::Stage;

/// Progress events emitted while a song is being generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SongProgress {
    /// The pipeline entered a new stage.
    Stage(Stage),
    /// Clip `index` of `count` finished generation and separation.
    ClipDone { index: usize, count: usize },
}

type ProgressCallback = Box<dyn Fn(SongProgress) + Send + 'static>;

static SONG_PROGRESS_CB: OnceLock<Mutex<Option<ProgressCallback>>> = OnceLock::new();

/// Install the process-wide progress callback, replacing any previous one.
pub fn set_progress_callback(cb: impl Fn(SongProgress) + Send + 'static) {
    let slot = SONG_PROGRESS_CB.get_or_init(|| Mutex::new(None));
    if let Ok(mut g) = slot.lock() {
        *g = Some(Box::new(cb));
    }
}

pub fn emit_progress(event: SongProgress) {
    if let Some(m) = SONG_PROGRESS_CB.get() {
        if let Ok(g) = m.lock() {
            if let Some(cb) = &*g {
                cb(event);
            }
        }
    }
}
