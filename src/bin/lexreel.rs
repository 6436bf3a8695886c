use std::path::PathBuf;

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::Parser;

use lexreel::{
    CommandSynthesizer, ContentKind, FfmpegConcatenator, FfmpegSegmentEncoder, FrameComposer,
    FrameRenderer, JsonContentSource, PipelineConfig, PipelineRun, TextStyler,
};

#[derive(Parser, Debug)]
#[command(name = "lexreel", version)]
struct Cli {
    /// Target content date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Content kind: word, idiom, or sentence.
    #[arg(long)]
    kind: ContentKind,

    /// Pipeline configuration JSON.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let date = cli.date.unwrap_or_else(|| chrono::Local::now().date_naive());

    let config = PipelineConfig::from_path(&cli.config)?;
    let source = JsonContentSource::new(&config.content_path);

    let styler = TextStyler::from_font_file(&config.font_path)?;
    let composer = FrameComposer::new(styler, config.render_spec_for(cli.kind))?;
    let mut renderer = FrameRenderer::new(composer, config.policy.template_granularity);

    let native_synth = CommandSynthesizer::new(config.tts_native.clone())?;
    let target_synth = CommandSynthesizer::new(config.tts_target.clone())?;
    let encoder = FfmpegSegmentEncoder::new(config.canvas, config.fps)?;
    let concatenator = FfmpegConcatenator;

    let mut run = PipelineRun {
        config: &config,
        source: &source,
        renderer: &mut renderer,
        native_synth: &native_synth,
        target_synth: &target_synth,
        encoder: &encoder,
        concatenator: &concatenator,
    };

    let manifest = run.execute(date, cli.kind)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&manifest).context("serialize run manifest")?
    );
    Ok(())
}
