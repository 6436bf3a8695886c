use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context as _;
use tracing::{debug, warn};

use crate::error::LexreelResult;

// Distinguishes arenas created within the same clock tick.
static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Run-scoped scratch storage for frames, audio, and clips.
///
/// The backing directory is removed when the arena is dropped, on
/// success, error, and unwind alike, so no run can poison the next one
/// with stale files.
pub struct ScratchArena {
    root: PathBuf,
    frames: PathBuf,
    audio: PathBuf,
    clips: PathBuf,
}

impl ScratchArena {
    /// Create a fresh arena under `base` with a unique run directory.
    pub fn create(base: &Path) -> LexreelResult<Self> {
        let root = base.join(format!(
            "run_{}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
            RUN_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let frames = root.join("frames");
        let audio = root.join("audio");
        let clips = root.join("clips");
        for dir in [&frames, &audio, &clips] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create scratch directory '{}'", dir.display()))?;
        }
        debug!(root = %root.display(), "scratch arena created");
        Ok(Self {
            root,
            frames,
            audio,
            clips,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames(&self) -> &Path {
        &self.frames
    }

    pub fn audio(&self) -> &Path {
        &self.audio
    }

    pub fn clips(&self) -> &Path {
        &self.clips
    }
}

impl Drop for ScratchArena {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if self.root.exists() {
                warn!(root = %self.root.display(), error = %e, "failed to remove scratch arena");
            }
        } else {
            debug!(root = %self.root.display(), "scratch arena removed");
        }
    }
}
