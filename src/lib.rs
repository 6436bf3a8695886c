//! Lexreel turns date-keyed language-learning content into a finished
//! short video: per-item frames rendered from templates, synthesized
//! speech, per-pair encoded clips, and one stream-copy concatenation.
//!
//! The library is session-oriented around a single [`PipelineRun`]:
//!
//! - Load a [`PipelineConfig`]
//! - Wire a content source and the external collaborators
//! - Execute the run for one date and [`ContentKind`]
#![forbid(unsafe_code)]

mod assembly;
mod compose;
mod concat;
mod config;
mod content;
mod encode;
mod error;
mod frames;
mod pipeline;
mod scratch;
mod text;
mod tts;

pub use crate::assembly::{ItemState, SequenceAssembler, expected_sequence_len};
pub use crate::compose::{ComposedFrame, FrameComposer, Line};
pub use crate::concat::{Concatenator, FfmpegConcatenator, concat_args, manifest_body};
pub use crate::config::{
    AssemblyPolicy, CanvasSize, Direction, FontSizeRange, ItemFailurePolicy, PipelineConfig,
    RenderOverrides, RenderSpec, TemplateGranularity, TemplateSet, TextColor, TextEffects,
    TtsCommand,
};
pub use crate::content::{
    ContentItem, ContentKind, ContentSource, JsonContentSource, Language,
};
pub use crate::encode::{
    FfmpegSegmentEncoder, SegmentEncoder, ensure_parent_dir, is_ffmpeg_on_path, silence_clip_args,
    still_clip_args,
};
pub use crate::error::{LexreelError, LexreelResult};
pub use crate::frames::{FrameRenderer, FrameTag, ItemRenderer, RenderedFrame, resolve_template};
pub use crate::pipeline::{PipelineRun, RunManifest, deliverable_name};
pub use crate::scratch::ScratchArena;
pub use crate::text::{TextBrushRgba8, TextStyler, fit_size};
pub use crate::tts::{CommandSynthesizer, SpeechSynthesizer, substitute_args};
