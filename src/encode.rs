use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context as _;
use tracing::debug;

use crate::config::CanvasSize;
use crate::error::{LexreelError, LexreelResult};

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> LexreelResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Run the system ffmpeg with the given arguments.
///
/// Returns the combined status/stderr diagnostic on failure so each call
/// site can wrap it in its own error variant.
pub(crate) fn run_ffmpeg(args: &[String]) -> Result<(), String> {
    debug!(?args, "ffmpeg invocation");
    let output = Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| format!("failed to spawn ffmpeg (is it installed and on PATH?): {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "ffmpeg exited with status {}: {}",
            output.status,
            stderr.trim()
        ));
    }
    Ok(())
}

/// Arguments for encoding one still frame + audio track into a clip.
///
/// Audio-length-matched: `-shortest` truncates the looped still to the
/// (optionally apad-extended) audio duration. Video settings are a fixed
/// preset so every clip in a run is concat-compatible.
pub fn still_clip_args(
    frame: &Path,
    audio: &Path,
    out: &Path,
    canvas: CanvasSize,
    fps: u32,
    trailing_silence: f64,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-loop".into(),
        "1".into(),
        "-i".into(),
        frame.to_string_lossy().into_owned(),
        "-i".into(),
        audio.to_string_lossy().into_owned(),
    ];
    if trailing_silence > 0.0 {
        args.push("-af".into());
        args.push(format!("apad=pad_dur={trailing_silence}"));
    }
    args.extend([
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "fast".into(),
        "-profile:v".into(),
        "baseline".into(),
        "-level".into(),
        "3.0".into(),
        "-crf".into(),
        "25".into(),
        "-vf".into(),
        format!(
            "scale={}:{},format=yuv420p,fps={fps}",
            canvas.width, canvas.height
        ),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        "128k".into(),
        "-ar".into(),
        "44100".into(),
        "-shortest".into(),
        "-avoid_negative_ts".into(),
        "make_zero".into(),
        "-fflags".into(),
        "+genpts".into(),
        "-movflags".into(),
        "+faststart".into(),
        out.to_string_lossy().into_owned(),
    ]);
    args
}

/// Arguments for generating the black inter-item pause clip.
pub fn silence_clip_args(out: &Path, secs: f64, canvas: CanvasSize, fps: u32) -> Vec<String> {
    vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "lavfi".into(),
        "-i".into(),
        format!(
            "color=c=black:s={}x{}:d={secs}",
            canvas.width, canvas.height
        ),
        "-f".into(),
        "lavfi".into(),
        "-i".into(),
        "anullsrc=r=44100:cl=stereo".into(),
        "-t".into(),
        secs.to_string(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "fast".into(),
        "-profile:v".into(),
        "baseline".into(),
        "-level".into(),
        "3.0".into(),
        "-crf".into(),
        "25".into(),
        "-vf".into(),
        format!("format=yuv420p,fps={fps}"),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        "128k".into(),
        "-ar".into(),
        "44100".into(),
        "-movflags".into(),
        "+faststart".into(),
        out.to_string_lossy().into_owned(),
    ]
}

/// External video encoding collaborator for single clips.
pub trait SegmentEncoder {
    /// Encode one (frame, audio) pair; clip length follows the audio plus
    /// `trailing_silence` seconds of padding.
    fn encode_still(
        &self,
        frame: &Path,
        audio: &Path,
        out: &Path,
        trailing_silence: f64,
    ) -> LexreelResult<()>;

    /// Produce the silent pause clip used between items.
    fn encode_silence_clip(&self, out: &Path, secs: f64) -> LexreelResult<()>;
}

/// System-ffmpeg implementation with a fixed libx264/aac preset.
pub struct FfmpegSegmentEncoder {
    canvas: CanvasSize,
    fps: u32,
}

impl FfmpegSegmentEncoder {
    pub fn new(canvas: CanvasSize, fps: u32) -> LexreelResult<Self> {
        canvas.validate()?;
        if fps == 0 {
            return Err(LexreelError::validation("encode fps must be non-zero"));
        }
        if !is_ffmpeg_on_path() {
            return Err(LexreelError::encoding(
                "ffmpeg is required for clip encoding, but was not found on PATH",
            ));
        }
        Ok(Self { canvas, fps })
    }
}

impl SegmentEncoder for FfmpegSegmentEncoder {
    fn encode_still(
        &self,
        frame: &Path,
        audio: &Path,
        out: &Path,
        trailing_silence: f64,
    ) -> LexreelResult<()> {
        ensure_parent_dir(out)?;
        let args = still_clip_args(frame, audio, out, self.canvas, self.fps, trailing_silence);
        run_ffmpeg(&args).map_err(LexreelError::encoding)
    }

    fn encode_silence_clip(&self, out: &Path, secs: f64) -> LexreelResult<()> {
        if !(secs.is_finite() && secs > 0.0) {
            return Err(LexreelError::validation(
                "silence clip duration must be > 0",
            ));
        }
        ensure_parent_dir(out)?;
        let args = silence_clip_args(out, secs, self.canvas, self.fps);
        run_ffmpeg(&args).map_err(LexreelError::encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn still_clip_args_loop_the_frame_and_truncate_to_audio() {
        let args = still_clip_args(
            &PathBuf::from("f.png"),
            &PathBuf::from("a.wav"),
            &PathBuf::from("c.mp4"),
            CanvasSize::PORTRAIT,
            30,
            0.0,
        );
        let joined = args.join(" ");
        assert!(joined.contains("-loop 1 -i f.png -i a.wav"));
        assert!(joined.contains("scale=1080:1920,format=yuv420p,fps=30"));
        assert!(joined.contains("-shortest"));
        assert!(!joined.contains("apad"));
        assert_eq!(args.last().unwrap(), "c.mp4");
    }

    #[test]
    fn trailing_silence_adds_apad_filter() {
        let args = still_clip_args(
            &PathBuf::from("f.png"),
            &PathBuf::from("a.wav"),
            &PathBuf::from("c.mp4"),
            CanvasSize::LANDSCAPE,
            30,
            0.5,
        );
        let i = args.iter().position(|a| a == "-af").unwrap();
        assert_eq!(args[i + 1], "apad=pad_dur=0.5");
    }

    #[test]
    fn silence_clip_args_use_black_source_and_null_audio() {
        let args = silence_clip_args(&PathBuf::from("pause.mp4"), 0.5, CanvasSize::PORTRAIT, 30);
        let joined = args.join(" ");
        assert!(joined.contains("color=c=black:s=1080x1920:d=0.5"));
        assert!(joined.contains("anullsrc=r=44100:cl=stereo"));
        assert!(joined.contains("-t 0.5"));
        assert_eq!(args.last().unwrap(), "pause.mp4");
    }
}
