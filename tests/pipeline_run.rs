use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use lexreel::{
    AssemblyPolicy, CanvasSize, Concatenator, ContentItem, ContentKind, ContentSource, Direction,
    FrameTag, ItemFailurePolicy, ItemRenderer, Language, LexreelError, LexreelResult,
    PipelineConfig, PipelineRun, RenderOverrides, RenderedFrame, SegmentEncoder,
    SpeechSynthesizer, TemplateGranularity, TemplateSet, TtsCommand,
};

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "lexreel_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn item(n: usize) -> ContentItem {
    ContentItem {
        primary: format!("word {n}"),
        primary_line2: None,
        secondary: format!("단어 {n}"),
        secondary_line2: None,
        tertiary: format!("hint {n}"),
    }
}

fn config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        canvas: CanvasSize::PORTRAIT,
        fps: 30,
        font_path: root.join("font.ttf"),
        templates: TemplateSet {
            word: root.join("word.png"),
            idiom: root.join("idiom.png"),
            sentence: root.join("sentence.png"),
        },
        content_path: root.join("content.json"),
        scratch_dir: root.join("scratch"),
        output_dir: root.join("final-video"),
        tts_native: TtsCommand {
            program: "true".to_string(),
            args: vec!["{out}".to_string()],
        },
        tts_target: TtsCommand {
            program: "true".to_string(),
            args: vec!["{out}".to_string()],
        },
        audio_extension: "wav".to_string(),
        policy: AssemblyPolicy {
            direction: Direction::SecondaryFirst,
            repeat_count: 2,
            pause_duration: 0.5,
            template_granularity: TemplateGranularity::Shared,
        },
        on_item_error: ItemFailurePolicy::Abort,
        sync_padding: 0.5,
        intro_clip: None,
        parallel: false,
        render: RenderOverrides::default(),
    }
}

struct FakeSource {
    items: Vec<ContentItem>,
}

impl ContentSource for FakeSource {
    fn fetch_by_date(&self, date: NaiveDate, kind: ContentKind) -> LexreelResult<Vec<ContentItem>> {
        if self.items.is_empty() {
            return Err(LexreelError::not_found(format!(
                "no {kind} content for {date}"
            )));
        }
        Ok(self.items.clone())
    }
}

struct FakeRenderer;

impl ItemRenderer for FakeRenderer {
    fn render_item(
        &mut self,
        item_index: usize,
        _item: &ContentItem,
        out_dir: &Path,
    ) -> LexreelResult<[RenderedFrame; 2]> {
        let mut out = Vec::new();
        for language in [Language::Native, Language::Target] {
            let path = out_dir.join(format!("frame_{item_index:03}_{}.png", language.as_str()));
            std::fs::write(&path, b"frame").unwrap();
            out.push(RenderedFrame {
                tag: FrameTag {
                    item: item_index,
                    language,
                },
                path,
            });
        }
        Ok([out.remove(0), out.remove(0)])
    }
}

/// Fails synthesis for any text listed in `fail_texts`.
struct FakeSynth {
    fail_texts: Vec<String>,
}

impl FakeSynth {
    fn ok() -> Self {
        Self {
            fail_texts: Vec::new(),
        }
    }
}

impl SpeechSynthesizer for FakeSynth {
    fn synthesize(&self, text: &str, out_path: &Path) -> LexreelResult<()> {
        if self.fail_texts.iter().any(|t| t == text) {
            return Err(LexreelError::synthesis(format!("no voice for '{text}'")));
        }
        std::fs::write(out_path, b"audio").unwrap();
        Ok(())
    }
}

struct FakeEncoder;

impl SegmentEncoder for FakeEncoder {
    fn encode_still(
        &self,
        frame: &Path,
        audio: &Path,
        out: &Path,
        _trailing_silence: f64,
    ) -> LexreelResult<()> {
        assert!(frame.is_file(), "frame must exist before encoding");
        assert!(audio.is_file(), "audio must exist before encoding");
        std::fs::write(out, b"clip").unwrap();
        Ok(())
    }

    fn encode_silence_clip(&self, out: &Path, _secs: f64) -> LexreelResult<()> {
        std::fs::write(out, b"silence").unwrap();
        Ok(())
    }
}

/// Records the exact clip order handed to concatenation.
struct FakeConcat {
    recorded: Mutex<Vec<PathBuf>>,
}

impl FakeConcat {
    fn new() -> Self {
        Self {
            recorded: Mutex::new(Vec::new()),
        }
    }

    fn file_names(&self) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }
}

impl Concatenator for FakeConcat {
    fn concatenate(&self, clips: &[PathBuf], _list_path: &Path, out: &Path) -> LexreelResult<()> {
        for clip in clips {
            assert!(clip.is_file(), "clip '{}' must exist", clip.display());
        }
        *self.recorded.lock().unwrap() = clips.to_vec();
        std::fs::write(out, b"final").unwrap();
        Ok(())
    }
}

fn scratch_is_clean(config: &PipelineConfig) -> bool {
    match std::fs::read_dir(&config.scratch_dir) {
        Ok(entries) => entries.count() == 0,
        Err(_) => !config.scratch_dir.exists(),
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 7).unwrap()
}

#[test]
fn full_run_orders_clips_and_names_the_deliverable() {
    let root = temp_dir("pipeline_full_run");
    std::fs::create_dir_all(&root).unwrap();
    let cfg = config(&root);
    let source = FakeSource {
        items: (0..3).map(item).collect(),
    };
    let (native, target) = (FakeSynth::ok(), FakeSynth::ok());
    let concat = FakeConcat::new();
    let mut renderer = FakeRenderer;

    let mut run = PipelineRun {
        config: &cfg,
        source: &source,
        renderer: &mut renderer,
        native_synth: &native,
        target_synth: &target,
        encoder: &FakeEncoder,
        concatenator: &concat,
    };
    let manifest = run.execute(date(), ContentKind::Word).unwrap();

    assert!(manifest.success);
    assert_eq!(manifest.final_file_name, "250907_word.mp4");
    assert_eq!(manifest.content_count, 3);
    assert_eq!(manifest.skipped_count, 0);
    assert!(manifest.final_path.is_file());

    assert_eq!(
        concat.file_names(),
        [
            "clip_000_native.mp4",
            "pause.mp4",
            "clip_000_target.mp4",
            "clip_000_target.mp4",
            "pause.mp4",
            "clip_001_native.mp4",
            "pause.mp4",
            "clip_001_target.mp4",
            "clip_001_target.mp4",
            "pause.mp4",
            "clip_002_native.mp4",
            "pause.mp4",
            "clip_002_target.mp4",
            "clip_002_target.mp4",
        ]
    );
    assert!(scratch_is_clean(&cfg));

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn parallel_run_preserves_item_order() {
    let root = temp_dir("pipeline_parallel");
    std::fs::create_dir_all(&root).unwrap();
    let mut cfg = config(&root);
    cfg.parallel = true;
    cfg.policy.repeat_count = 1;
    cfg.policy.pause_duration = 0.0;

    let source = FakeSource {
        items: (0..4).map(item).collect(),
    };
    let (native, target) = (FakeSynth::ok(), FakeSynth::ok());
    let concat = FakeConcat::new();
    let mut renderer = FakeRenderer;

    let mut run = PipelineRun {
        config: &cfg,
        source: &source,
        renderer: &mut renderer,
        native_synth: &native,
        target_synth: &target,
        encoder: &FakeEncoder,
        concatenator: &concat,
    };
    run.execute(date(), ContentKind::Word).unwrap();

    assert_eq!(
        concat.file_names(),
        [
            "clip_000_native.mp4",
            "clip_000_target.mp4",
            "clip_001_native.mp4",
            "clip_001_target.mp4",
            "clip_002_native.mp4",
            "clip_002_target.mp4",
            "clip_003_native.mp4",
            "clip_003_target.mp4",
        ]
    );

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn empty_fetch_fails_before_creating_scratch() {
    let root = temp_dir("pipeline_empty_fetch");
    std::fs::create_dir_all(&root).unwrap();
    let cfg = config(&root);
    let source = FakeSource { items: Vec::new() };
    let (native, target) = (FakeSynth::ok(), FakeSynth::ok());
    let concat = FakeConcat::new();
    let mut renderer = FakeRenderer;

    let mut run = PipelineRun {
        config: &cfg,
        source: &source,
        renderer: &mut renderer,
        native_synth: &native,
        target_synth: &target,
        encoder: &FakeEncoder,
        concatenator: &concat,
    };
    let err = run.execute(date(), ContentKind::Word).unwrap_err();

    assert!(matches!(err, LexreelError::NotFound(_)));
    assert!(!cfg.scratch_dir.exists());
    assert!(concat.recorded.lock().unwrap().is_empty());

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn synthesis_failure_aborts_and_still_cleans_scratch() {
    let root = temp_dir("pipeline_abort");
    std::fs::create_dir_all(&root).unwrap();
    let cfg = config(&root);
    let source = FakeSource {
        items: (0..3).map(item).collect(),
    };
    let native = FakeSynth::ok();
    let target = FakeSynth {
        fail_texts: vec!["word 1".to_string()],
    };
    let concat = FakeConcat::new();
    let mut renderer = FakeRenderer;

    let mut run = PipelineRun {
        config: &cfg,
        source: &source,
        renderer: &mut renderer,
        native_synth: &native,
        target_synth: &target,
        encoder: &FakeEncoder,
        concatenator: &concat,
    };
    let err = run.execute(date(), ContentKind::Word).unwrap_err();

    assert!(matches!(err, LexreelError::Synthesis(_)));
    assert!(scratch_is_clean(&cfg));
    assert!(concat.recorded.lock().unwrap().is_empty());

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn skip_policy_drops_the_failed_item_only() {
    let root = temp_dir("pipeline_skip");
    std::fs::create_dir_all(&root).unwrap();
    let mut cfg = config(&root);
    cfg.on_item_error = ItemFailurePolicy::Skip;
    cfg.policy.repeat_count = 1;
    cfg.policy.pause_duration = 0.0;

    let source = FakeSource {
        items: (0..3).map(item).collect(),
    };
    let native = FakeSynth::ok();
    let target = FakeSynth {
        fail_texts: vec!["word 1".to_string()],
    };
    let concat = FakeConcat::new();
    let mut renderer = FakeRenderer;

    let mut run = PipelineRun {
        config: &cfg,
        source: &source,
        renderer: &mut renderer,
        native_synth: &native,
        target_synth: &target,
        encoder: &FakeEncoder,
        concatenator: &concat,
    };
    let manifest = run.execute(date(), ContentKind::Word).unwrap();

    assert_eq!(manifest.content_count, 3);
    assert_eq!(manifest.skipped_count, 1);
    assert_eq!(
        concat.file_names(),
        [
            "clip_000_native.mp4",
            "clip_000_target.mp4",
            "clip_002_native.mp4",
            "clip_002_target.mp4",
        ]
    );

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn intro_clip_is_prepended_to_the_sequence() {
    let root = temp_dir("pipeline_intro");
    std::fs::create_dir_all(&root).unwrap();
    let intro = root.join("intro.mp4");
    std::fs::write(&intro, b"intro").unwrap();

    let mut cfg = config(&root);
    cfg.intro_clip = Some(intro);
    cfg.policy.repeat_count = 1;
    cfg.policy.pause_duration = 0.0;

    let source = FakeSource {
        items: vec![item(0)],
    };
    let (native, target) = (FakeSynth::ok(), FakeSynth::ok());
    let concat = FakeConcat::new();
    let mut renderer = FakeRenderer;

    let mut run = PipelineRun {
        config: &cfg,
        source: &source,
        renderer: &mut renderer,
        native_synth: &native,
        target_synth: &target,
        encoder: &FakeEncoder,
        concatenator: &concat,
    };
    run.execute(date(), ContentKind::Word).unwrap();

    assert_eq!(
        concat.file_names(),
        ["intro.mp4", "clip_000_native.mp4", "clip_000_target.mp4"]
    );

    std::fs::remove_dir_all(&root).ok();
}
