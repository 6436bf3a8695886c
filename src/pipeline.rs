use std::path::PathBuf;

use anyhow::Context as _;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::assembly::SequenceAssembler;
use crate::concat::Concatenator;
use crate::config::{ItemFailurePolicy, PipelineConfig};
use crate::content::{ContentItem, ContentKind, ContentSource, Language};
use crate::encode::SegmentEncoder;
use crate::error::{LexreelError, LexreelResult};
use crate::frames::{FrameTag, ItemRenderer, RenderedFrame};
use crate::scratch::ScratchArena;
use crate::tts::SpeechSynthesizer;

/// Deliverable file name: two-digit date prefix plus the content kind.
pub fn deliverable_name(date: NaiveDate, kind: ContentKind) -> String {
    format!("{}_{kind}.mp4", date.format("%y%m%d"))
}

/// Terminal summary of one run. A run either returns this with
/// `success: true` or aborts with an error after cleanup.
#[derive(Clone, Debug, Serialize)]
pub struct RunManifest {
    pub final_file_name: String,
    pub final_path: PathBuf,
    pub content_count: usize,
    pub skipped_count: usize,
    pub success: bool,
    pub error: Option<String>,
}

/// One pipeline run wiring content, rendering, synthesis, encoding, and
/// concatenation together.
///
/// Collaborators are injected so tests can run the whole flow with
/// fakes; production wiring lives in the binary.
pub struct PipelineRun<'a> {
    pub config: &'a PipelineConfig,
    pub source: &'a dyn ContentSource,
    pub renderer: &'a mut dyn ItemRenderer,
    pub native_synth: &'a (dyn SpeechSynthesizer + Sync),
    pub target_synth: &'a (dyn SpeechSynthesizer + Sync),
    pub encoder: &'a (dyn SegmentEncoder + Sync),
    pub concatenator: &'a dyn Concatenator,
}

struct ItemClips {
    item: usize,
    native: PathBuf,
    target: PathBuf,
}

impl PipelineRun<'_> {
    /// Execute the full run for one date and content kind.
    pub fn execute(&mut self, date: NaiveDate, kind: ContentKind) -> LexreelResult<RunManifest> {
        self.config.validate()?;

        // Fetch before any artifact exists so an empty date leaves no
        // scratch behind.
        let items = self.source.fetch_by_date(date, kind)?;
        info!(count = items.len(), %date, %kind, "content fetched");

        let arena = ScratchArena::create(&self.config.scratch_dir)?;

        let mut frames: Vec<[RenderedFrame; 2]> = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            frames.push(self.renderer.render_item(i, item, arena.frames())?);
        }
        info!(frames = frames.len() * 2, "frames rendered");

        let silence_clip = if self.config.policy.pause_duration > 0.0 {
            let path = arena.clips().join("pause.mp4");
            self.encoder
                .encode_silence_clip(&path, self.config.policy.pause_duration)?;
            Some(path)
        } else {
            None
        };

        let (config, native_synth, target_synth, encoder) = (
            self.config,
            self.native_synth,
            self.target_synth,
            self.encoder,
        );
        let results: Vec<LexreelResult<ItemClips>> = if config.parallel {
            items
                .par_iter()
                .enumerate()
                .map(|(i, item)| {
                    process_item(
                        config,
                        native_synth,
                        target_synth,
                        encoder,
                        i,
                        item,
                        &frames[i],
                        &arena,
                    )
                })
                .collect()
        } else {
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    process_item(
                        config,
                        native_synth,
                        target_synth,
                        encoder,
                        i,
                        item,
                        &frames[i],
                        &arena,
                    )
                })
                .collect()
        };

        let mut assembler =
            SequenceAssembler::new(self.config.policy, items.len(), silence_clip)?;
        let mut skipped = 0usize;
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(clips) => {
                    assembler.record_clip(
                        FrameTag {
                            item: clips.item,
                            language: Language::Native,
                        },
                        clips.native,
                    )?;
                    assembler.record_clip(
                        FrameTag {
                            item: clips.item,
                            language: Language::Target,
                        },
                        clips.target,
                    )?;
                }
                Err(e) => {
                    let skippable = matches!(e, LexreelError::Synthesis(_))
                        && self.config.on_item_error == ItemFailurePolicy::Skip;
                    if !skippable {
                        return Err(e);
                    }
                    warn!(item = i, error = %e, "synthesis failed, skipping item");
                    assembler.mark_skipped(i)?;
                    skipped += 1;
                }
            }
        }
        if skipped == items.len() {
            return Err(LexreelError::synthesis(
                "every item failed synthesis; nothing to assemble",
            ));
        }

        let mut sequence = assembler.finish()?;
        if let Some(intro) = &self.config.intro_clip {
            if !intro.is_file() {
                return Err(LexreelError::io(format!(
                    "intro clip '{}' does not exist",
                    intro.display()
                )));
            }
            sequence.insert(0, intro.clone());
        }
        info!(clips = sequence.len(), "sequence assembled");

        let final_file_name = deliverable_name(date, kind);
        std::fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!(
                "create output directory '{}'",
                self.config.output_dir.display()
            )
        })?;
        let final_path = self.config.output_dir.join(&final_file_name);
        let list_path = arena.root().join("filelist.txt");
        self.concatenator
            .concatenate(&sequence, &list_path, &final_path)?;
        info!(out = %final_path.display(), "deliverable written");

        Ok(RunManifest {
            final_file_name,
            final_path,
            content_count: items.len(),
            skipped_count: skipped,
            success: true,
            error: None,
        })
    }

}

/// Synthesize both audio tracks for one item and encode its two clips.
/// Independent across items, so safe to run on the rayon pool; ordering
/// is restored by the assembler.
#[allow(clippy::too_many_arguments)]
fn process_item(
    config: &PipelineConfig,
    native_synth: &(dyn SpeechSynthesizer + Sync),
    target_synth: &(dyn SpeechSynthesizer + Sync),
    encoder: &(dyn SegmentEncoder + Sync),
    item_index: usize,
    item: &ContentItem,
    frames: &[RenderedFrame; 2],
    arena: &ScratchArena,
) -> LexreelResult<ItemClips> {
    let ext = &config.audio_extension;
    let mut native = None;
    let mut target = None;
    for frame in frames {
        let language = frame.tag.language;
        let synth = match language {
            Language::Native => native_synth,
            Language::Target => target_synth,
        };
        let audio = arena
            .audio()
            .join(format!("audio_{item_index:03}_{}.{ext}", language.as_str()));
        synth.synthesize(&item.speech_text(language), &audio)?;

        let clip = arena
            .clips()
            .join(format!("clip_{item_index:03}_{}.mp4", language.as_str()));
        encoder.encode_still(&frame.path, &audio, &clip, config.sync_padding)?;
        match language {
            Language::Native => native = Some(clip),
            Language::Target => target = Some(clip),
        }
    }
    let (Some(native), Some(target)) = (native, target) else {
        return Err(LexreelError::validation(format!(
            "item {item_index} is missing a frame for one language"
        )));
    };
    Ok(ItemClips {
        item: item_index,
        native,
        target,
    })
}
