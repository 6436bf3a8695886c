use std::path::{Path, PathBuf};

use tracing::debug;

use crate::compose::{FrameComposer, Line};
use crate::config::TemplateGranularity;
use crate::content::{ContentItem, Language};
use crate::error::LexreelResult;

/// Explicit identity of a rendered frame or encoded clip.
///
/// Carried alongside every artifact path so downstream pairing never
/// depends on filename numbering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameTag {
    /// Index of the content item in fetch order.
    pub item: usize,
    pub language: Language,
}

/// A frame written to the scratch arena.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    pub tag: FrameTag,
    pub path: PathBuf,
}

/// Tertiary text is presented as a parenthesized hint under the target
/// line.
fn detail_line(text: &str) -> String {
    format!("( {text} )")
}

/// Template used for `item_index` under the given granularity.
///
/// `PerItem` looks for a numbered sibling of the base template
/// (`word_01.png` next to `word.png`, 1-based) and falls back to the base
/// when the sibling does not exist.
pub fn resolve_template(
    base: &Path,
    granularity: TemplateGranularity,
    item_index: usize,
) -> PathBuf {
    if granularity == TemplateGranularity::Shared {
        return base.to_path_buf();
    }
    let Some(stem) = base.file_stem().and_then(|s| s.to_str()) else {
        return base.to_path_buf();
    };
    let ext = base.extension().and_then(|s| s.to_str()).unwrap_or("png");
    let candidate = base.with_file_name(format!("{stem}_{:02}.{ext}", item_index + 1));
    if candidate.is_file() {
        candidate
    } else {
        base.to_path_buf()
    }
}

/// Produces the two frames each content item contributes.
pub trait ItemRenderer {
    /// Render both frames for one item into `out_dir`.
    fn render_item(
        &mut self,
        item_index: usize,
        item: &ContentItem,
        out_dir: &Path,
    ) -> LexreelResult<[RenderedFrame; 2]>;
}

/// Template-compositing renderer.
///
/// Frame assignment is fixed: the native frame shows the secondary text,
/// the target frame shows the primary text plus the tertiary hint. Same
/// item, same output.
pub struct FrameRenderer {
    composer: FrameComposer,
    granularity: TemplateGranularity,
}

impl FrameRenderer {
    pub fn new(composer: FrameComposer, granularity: TemplateGranularity) -> Self {
        Self {
            composer,
            granularity,
        }
    }

    fn render_one(
        &mut self,
        template: &Path,
        lines: &[Line],
        item_index: usize,
        language: Language,
        out_dir: &Path,
    ) -> LexreelResult<RenderedFrame> {
        let frame = self.composer.compose(template, lines)?;
        let path = out_dir.join(format!("frame_{item_index:03}_{}.png", language.as_str()));
        frame.save_png(&path)?;
        debug!(item = item_index, language = language.as_str(), path = %path.display(), "frame rendered");
        Ok(RenderedFrame {
            tag: FrameTag {
                item: item_index,
                language,
            },
            path,
        })
    }
}

impl ItemRenderer for FrameRenderer {
    fn render_item(
        &mut self,
        item_index: usize,
        item: &ContentItem,
        out_dir: &Path,
    ) -> LexreelResult<[RenderedFrame; 2]> {
        let spec = self.composer.spec();
        let template = resolve_template(&spec.template_path, self.granularity, item_index);
        let body = spec.font_size;
        let detail = spec.detail_font;

        let mut native_lines = vec![Line {
            text: item.secondary.clone(),
            range: body,
        }];
        if let Some(line2) = &item.secondary_line2 {
            native_lines.push(Line {
                text: line2.clone(),
                range: body,
            });
        }

        let mut target_lines = vec![Line {
            text: item.primary.clone(),
            range: body,
        }];
        if let Some(line2) = &item.primary_line2 {
            target_lines.push(Line {
                text: line2.clone(),
                range: body,
            });
        }
        if !item.tertiary.is_empty() {
            target_lines.push(Line {
                text: detail_line(&item.tertiary),
                range: detail,
            });
        }

        let native = self.render_one(&template, &native_lines, item_index, Language::Native, out_dir)?;
        let target = self.render_one(&template, &target_lines, item_index, Language::Target, out_dir)?;
        Ok([native, target])
    }
}
