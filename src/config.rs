use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::content::ContentKind;
use crate::error::{LexreelError, LexreelResult};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CanvasSize {
    /// Portrait reel preset (1080x1920).
    pub const PORTRAIT: CanvasSize = CanvasSize {
        width: 1080,
        height: 1920,
    };

    /// Landscape preset (1920x1080).
    pub const LANDSCAPE: CanvasSize = CanvasSize {
        width: 1920,
        height: 1080,
    };

    /// Whether the canvas is wider than tall.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    pub fn validate(&self) -> LexreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LexreelError::validation("canvas width/height must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // Encoder presets target yuv420p output.
            return Err(LexreelError::validation(
                "canvas width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

/// Fill color for rendered text.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TextColor {
    White,
    Black,
    #[default]
    Beige,
}

impl TextColor {
    /// Straight-alpha RGBA8 fill color.
    pub fn rgba8(&self) -> [u8; 4] {
        match self {
            TextColor::White => [255, 255, 255, 255],
            TextColor::Black => [0, 0, 0, 255],
            TextColor::Beige => [245, 245, 220, 255],
        }
    }

    /// Contrasting solid color used for the outline pass.
    pub fn outline_rgba8(&self) -> [u8; 4] {
        match self {
            TextColor::Black => [255, 255, 255, 255],
            _ => [0, 0, 0, 255],
        }
    }
}

/// Font-size cascade bounds, in pixels.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct FontSizeRange {
    /// Starting (largest) size.
    pub max: f32,
    /// Floor size, accepted even if the text still overflows.
    pub min: f32,
    /// Decrement applied while the text is too wide.
    pub step: f32,
}

impl FontSizeRange {
    pub fn new(max: f32, min: f32, step: f32) -> Self {
        Self { max, min, step }
    }

    pub fn validate(&self) -> LexreelResult<()> {
        if !(self.max.is_finite() && self.min.is_finite() && self.step.is_finite()) {
            return Err(LexreelError::validation("font sizes must be finite"));
        }
        if self.min <= 0.0 || self.max < self.min {
            return Err(LexreelError::validation(
                "font size range requires 0 < min <= max",
            ));
        }
        if self.step <= 0.0 {
            return Err(LexreelError::validation("font size step must be > 0"));
        }
        Ok(())
    }
}

impl Default for FontSizeRange {
    fn default() -> Self {
        // Primary-line cascade used by all shipped presets.
        Self::new(120.0, 20.0, 10.0)
    }
}

/// Shadow/outline pass configuration. A zero offset disables the pass.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TextEffects {
    /// Pixel offset of the dark semi-transparent shadow pass.
    #[serde(default = "default_shadow_offset")]
    pub shadow_offset: u32,
    /// Pixel offset of the 8-direction outline pass.
    #[serde(default = "default_outline_offset")]
    pub outline_offset: u32,
}

fn default_shadow_offset() -> u32 {
    8
}

fn default_outline_offset() -> u32 {
    5
}

impl TextEffects {
    /// No shadow, no outline; fill pass only.
    pub const PLAIN: TextEffects = TextEffects {
        shadow_offset: 0,
        outline_offset: 0,
    };
}

impl Default for TextEffects {
    fn default() -> Self {
        Self {
            shadow_offset: default_shadow_offset(),
            outline_offset: default_outline_offset(),
        }
    }
}

/// How text maps onto a template image for one content kind.
///
/// Chosen once per run; the frame renderer and layout engine treat it as
/// immutable.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RenderSpec {
    /// Base template image (PNG) the text is composited onto.
    pub template_path: PathBuf,
    /// Fraction of the canvas width the widest line may occupy, in (0, 1].
    pub max_text_width_ratio: f32,
    /// Cascade for the primary and secondary lines.
    pub font_size: FontSizeRange,
    /// Cascade for the tertiary (pronunciation/example) line.
    pub detail_font: FontSizeRange,
    /// Fill color.
    pub text_color: TextColor,
    /// Vertical gap between stacked lines, in pixels.
    pub line_spacing: u32,
    /// Shadow/outline passes.
    pub effects: TextEffects,
}

impl RenderSpec {
    /// Preset for a content kind on the given canvas.
    ///
    /// Landscape canvases allow 80% of the width, portrait 90% (portrait
    /// templates keep a larger horizontal safe area).
    pub fn preset(template_path: impl Into<PathBuf>, canvas: CanvasSize) -> Self {
        let ratio = if canvas.is_landscape() { 0.8 } else { 0.9 };
        Self {
            template_path: template_path.into(),
            max_text_width_ratio: ratio,
            font_size: FontSizeRange::default(),
            detail_font: FontSizeRange::new(75.0, 20.0, 10.0),
            text_color: TextColor::default(),
            line_spacing: 20,
            effects: TextEffects::default(),
        }
    }

    pub fn validate(&self) -> LexreelResult<()> {
        if !(self.max_text_width_ratio > 0.0 && self.max_text_width_ratio <= 1.0) {
            return Err(LexreelError::validation(
                "max_text_width_ratio must be in (0, 1]",
            ));
        }
        self.font_size.validate()?;
        self.detail_font.validate()?;
        Ok(())
    }
}

/// Presentation direction for each item's clip group.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Native (secondary) clip first, then the repeated target clip.
    #[default]
    SecondaryFirst,
    /// Repeated target clip first, then the native clip.
    PrimaryFirst,
}

/// Whether every item shares one base template or resolves its own.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemplateGranularity {
    /// One template decoded once and reused for the whole run.
    #[default]
    Shared,
    /// Each item looks for a numbered sibling of the base template
    /// (`word_01.png` next to `word.png`), falling back to the base.
    PerItem,
}

/// What to do when one item's speech synthesis fails.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemFailurePolicy {
    /// Abort the whole run (fail-fast).
    #[default]
    Abort,
    /// Log, drop the item from the sequence, continue.
    Skip,
}

/// Declarative clip-ordering policy for the run.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct AssemblyPolicy {
    #[serde(default)]
    pub direction: Direction,
    /// Times the target-language clip is appended per item. Must be >= 1.
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
    /// Inter-item pause length in seconds; 0 disables pauses.
    #[serde(default)]
    pub pause_duration: f64,
    #[serde(default)]
    pub template_granularity: TemplateGranularity,
}

fn default_repeat_count() -> u32 {
    1
}

impl Default for AssemblyPolicy {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            repeat_count: 1,
            pause_duration: 0.0,
            template_granularity: TemplateGranularity::default(),
        }
    }
}

impl AssemblyPolicy {
    pub fn validate(&self) -> LexreelResult<()> {
        if self.repeat_count < 1 {
            return Err(LexreelError::validation("repeat_count must be >= 1"));
        }
        if !self.pause_duration.is_finite() || self.pause_duration < 0.0 {
            return Err(LexreelError::validation("pause_duration must be >= 0"));
        }
        Ok(())
    }
}

/// Command template for one external TTS collaborator invocation.
///
/// `{text}` and `{out}` placeholders are substituted per call; voice and
/// rate parameters are baked into the argument list.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TtsCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TtsCommand {
    pub fn validate(&self) -> LexreelResult<()> {
        if self.program.is_empty() {
            return Err(LexreelError::validation("tts program must be non-empty"));
        }
        if !self.args.iter().any(|a| a.contains("{out}")) {
            return Err(LexreelError::validation(
                "tts args must contain an {out} placeholder",
            ));
        }
        Ok(())
    }
}

/// Per-kind template registry.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TemplateSet {
    pub word: PathBuf,
    pub idiom: PathBuf,
    pub sentence: PathBuf,
}

impl TemplateSet {
    pub fn for_kind(&self, kind: ContentKind) -> &Path {
        match kind {
            ContentKind::Word => &self.word,
            ContentKind::Idiom => &self.idiom,
            ContentKind::Sentence => &self.sentence,
        }
    }
}

/// Immutable configuration for one pipeline run.
///
/// Every component receives this (or a slice of it) at construction; no
/// process-wide state is read after load.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_canvas")]
    pub canvas: CanvasSize,
    /// Frame rate for encoded clips.
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Font used for every rendered line.
    pub font_path: PathBuf,
    pub templates: TemplateSet,
    /// JSON content store consumed by the default content source.
    pub content_path: PathBuf,
    /// Run-scoped scratch directory; deleted when the run ends.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    /// Directory the final deliverable is written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub tts_native: TtsCommand,
    pub tts_target: TtsCommand,
    /// File extension for synthesized audio; the TTS collaborator picks
    /// its container from it.
    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,
    #[serde(default)]
    pub policy: AssemblyPolicy,
    #[serde(default)]
    pub on_item_error: ItemFailurePolicy,
    /// Trailing silence appended to every synthesized clip, in seconds.
    #[serde(default = "default_sync_padding")]
    pub sync_padding: f64,
    /// Optional pre-encoded clip prepended to the sequence.
    #[serde(default)]
    pub intro_clip: Option<PathBuf>,
    /// Run the per-item synthesis/encode stage on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
    /// Optional per-kind render overrides; defaults come from presets.
    #[serde(default)]
    pub render: RenderOverrides,
}

/// Optional knobs layered over [`RenderSpec::preset`].
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RenderOverrides {
    #[serde(default)]
    pub text_color: Option<TextColor>,
    #[serde(default)]
    pub font_size: Option<FontSizeRange>,
    #[serde(default)]
    pub detail_font: Option<FontSizeRange>,
    #[serde(default)]
    pub line_spacing: Option<u32>,
    #[serde(default)]
    pub effects: Option<TextEffects>,
}

fn default_canvas() -> CanvasSize {
    CanvasSize::PORTRAIT
}

fn default_fps() -> u32 {
    30
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("scratch")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("final-video")
}

fn default_sync_padding() -> f64 {
    0.5
}

fn default_audio_extension() -> String {
    "wav".to_string()
}

impl PipelineConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_path(path: &Path) -> LexreelResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: PipelineConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> LexreelResult<()> {
        self.canvas.validate()?;
        if self.fps == 0 {
            return Err(LexreelError::validation("fps must be non-zero"));
        }
        self.policy.validate()?;
        self.tts_native.validate()?;
        self.tts_target.validate()?;
        if !self.sync_padding.is_finite() || self.sync_padding < 0.0 {
            return Err(LexreelError::validation("sync_padding must be >= 0"));
        }
        if let Some(fs) = &self.render.font_size {
            fs.validate()?;
        }
        if let Some(fs) = &self.render.detail_font {
            fs.validate()?;
        }
        Ok(())
    }

    /// Resolve the effective [`RenderSpec`] for a content kind.
    pub fn render_spec_for(&self, kind: ContentKind) -> RenderSpec {
        let mut spec = RenderSpec::preset(self.templates.for_kind(kind), self.canvas);
        if let Some(c) = self.render.text_color {
            spec.text_color = c;
        }
        if let Some(fs) = self.render.font_size {
            spec.font_size = fs;
        }
        if let Some(fs) = self.render.detail_font {
            spec.detail_font = fs;
        }
        if let Some(ls) = self.render.line_spacing {
            spec.line_spacing = ls;
        }
        if let Some(fx) = self.render.effects {
            spec.effects = fx;
        }
        spec
    }
}
