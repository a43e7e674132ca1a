use std::sync::{Arc, Mutex, OnceLock};

/// Pipeline progress reported to an optional process-wide callback.
#[derive(Clone, Debug, PartialEq)]
pub enum SeparationProgress {
    Stage(&'static str),
    Chunks {
        done: usize,
        total: usize,
        percent: f32,
    },
    Writing {
        class: String,
        done: usize,
        total: usize,
        percent: f32,
    },
    Finished,
}

type ProgressCallback = Arc<dyn Fn(SeparationProgress) + Send + Sync + 'static>;

static PROGRESS_CB: OnceLock<Mutex<Option<ProgressCallback>>> = OnceLock::new();

/// Install the progress callback, replacing any previous one.
///
/// The callback runs without the registry lock held, so it may itself install
/// or clear callbacks.
pub fn set_progress_callback(cb: impl Fn(SeparationProgress) + Send + Sync + 'static) {
    let slot = PROGRESS_CB.get_or_init(|| Mutex::new(None));
    if let Ok(mut g) = slot.lock() {
        *g = Some(Arc::new(cb));
    }
}

pub fn clear_progress_callback() {
    if let Some(m) = PROGRESS_CB.get() {
        if let Ok(mut g) = m.lock() {
            *g = None;
        }
    }
}

pub(crate) fn emit(progress: SeparationProgress) {
    let cb = PROGRESS_CB
        .get()
        .and_then(|m| m.lock().ok().and_then(|g| g.clone()));
    if let Some(cb) = cb {
        cb(progress);
    }
}

pub(crate) fn percent(done: usize, total: usize) -> f32 {
    if total == 0 {
        100.0
    } else {
        done as f32 / total as f32 * 100.0
    }
}
