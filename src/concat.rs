use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::info;

use crate::encode::{ensure_parent_dir, run_ffmpeg};
use crate::error::{LexreelError, LexreelResult};

/// External collaborator that splices ordered clips into one file.
pub trait Concatenator {
    /// Stream-copy concatenation; requires all clips to share identical
    /// codec/resolution/framerate (guaranteed upstream by the fixed
    /// encoder preset). No normalization happens here.
    fn concatenate(&self, clips: &[PathBuf], list_path: &Path, out: &Path) -> LexreelResult<()>;
}

/// Body of the concat demuxer manifest: one `file '...'` line per clip.
pub fn manifest_body(clips: &[PathBuf]) -> String {
    let mut body = String::new();
    for clip in clips {
        body.push_str("file '");
        body.push_str(&escape_concat_path(&clip.to_string_lossy()));
        body.push_str("'\n");
    }
    body
}

// The concat demuxer ends a quoted string at ', so embedded quotes become
// the '\'' splice.
fn escape_concat_path(path: &str) -> String {
    path.replace('\'', r"'\''")
}

pub fn concat_args(list_path: &Path, out: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_path.to_string_lossy().into_owned(),
        "-c".into(),
        "copy".into(),
        out.to_string_lossy().into_owned(),
    ]
}

/// System-ffmpeg concat demuxer implementation.
pub struct FfmpegConcatenator;

impl Concatenator for FfmpegConcatenator {
    fn concatenate(&self, clips: &[PathBuf], list_path: &Path, out: &Path) -> LexreelResult<()> {
        if clips.is_empty() {
            return Err(LexreelError::concatenation("no clips to concatenate"));
        }

        // Absolute paths keep the manifest independent of ffmpeg's cwd.
        let mut absolute = Vec::with_capacity(clips.len());
        for clip in clips {
            let abs = std::fs::canonicalize(clip).map_err(|e| {
                LexreelError::concatenation(format!(
                    "failed to resolve clip path '{}': {e}",
                    clip.display()
                ))
            })?;
            absolute.push(abs);
        }

        std::fs::write(list_path, manifest_body(&absolute))
            .with_context(|| format!("write concat manifest '{}'", list_path.display()))?;
        ensure_parent_dir(out)?;

        run_ffmpeg(&concat_args(list_path, out)).map_err(LexreelError::concatenation)?;

        if !out.is_file() {
            return Err(LexreelError::concatenation(format!(
                "concatenation reported success but '{}' does not exist",
                out.display()
            )));
        }
        info!(clips = clips.len(), out = %out.display(), "clips concatenated");
        Ok(())
    }
}
