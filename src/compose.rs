use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{FontSizeRange, RenderSpec};
use crate::error::{LexreelError, LexreelResult};
use crate::text::{TextBrushRgba8, TextStyler};

/// Shadow pass color, straight alpha.
const SHADOW_RGBA: [u8; 4] = [0, 0, 0, 96];

/// Vertical offset of the first line from canvas center, in pixels.
/// Portrait canvases push text further up to clear the bottom safe area.
fn first_line_offset(width: u32, height: u32) -> f64 {
    if width > height { -100.0 } else { -180.0 }
}

/// One line of text to place on the canvas, with its own size cascade.
#[derive(Clone, Debug)]
pub struct Line {
    pub text: String,
    pub range: FontSizeRange,
}

/// Finished frame in straight-alpha, fully opaque RGBA8.
#[derive(Clone, Debug)]
pub struct ComposedFrame {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl ComposedFrame {
    pub fn save_png(&self, path: &Path) -> LexreelResult<()> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.rgba8.clone())
            .ok_or_else(|| LexreelError::render("frame buffer size mismatch"))?;
        img.save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| LexreelError::io(format!("write frame '{}': {e}", path.display())))?;
        Ok(())
    }
}

#[derive(Clone)]
struct TemplatePaint {
    paint: vello_cpu::Image,
    width: u32,
    height: u32,
}

/// Composites stacked text lines onto a template image.
///
/// Templates are decoded once and cached by path; the render context is
/// reused across frames of matching dimensions.
pub struct FrameComposer {
    styler: TextStyler,
    spec: RenderSpec,
    template_cache: HashMap<PathBuf, TemplatePaint>,
    ctx: Option<vello_cpu::RenderContext>,
}

impl FrameComposer {
    pub fn new(styler: TextStyler, spec: RenderSpec) -> LexreelResult<Self> {
        spec.validate()?;
        Ok(Self {
            styler,
            spec,
            template_cache: HashMap::new(),
            ctx: None,
        })
    }

    pub fn spec(&self) -> &RenderSpec {
        &self.spec
    }

    /// Fit and composite `lines` onto the template at `template_path`.
    ///
    /// Empty lines are skipped. Output dimensions equal the template's.
    pub fn compose(&mut self, template_path: &Path, lines: &[Line]) -> LexreelResult<ComposedFrame> {
        let template = self.template_paint_for(template_path)?;
        let (width, height) = (template.width, template.height);
        let max_width = self.spec.max_text_width_ratio * width as f32;

        // Fit and shape all lines before touching the render context.
        let mut placed: Vec<(parley::Layout<TextBrushRgba8>, f64, f64)> = Vec::new();
        let fill: TextBrushRgba8 = self.spec.text_color.rgba8().into();
        let mut y = height as f64 / 2.0 + first_line_offset(width, height);
        for line in lines {
            if line.text.is_empty() {
                continue;
            }
            let size = self.styler.fit(&line.text, line.range, max_width)?;
            let layout = self.styler.layout(&line.text, size, fill)?;
            let x = (width as f64 - layout.width() as f64) / 2.0;
            let line_height = layout.height() as f64;
            placed.push((layout, x, y));
            y += line_height + self.spec.line_spacing as f64;
        }

        let w16: u16 = width
            .try_into()
            .map_err(|_| LexreelError::render("template width exceeds u16"))?;
        let h16: u16 = height
            .try_into()
            .map_err(|_| LexreelError::render("template height exceeds u16"))?;

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w16 && ctx.height() == h16 => ctx,
            _ => vello_cpu::RenderContext::new(w16, h16),
        };
        ctx.reset();

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(template.paint.clone());
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            width as f64,
            height as f64,
        ));

        let fx = self.spec.effects;
        let outline = self.spec.text_color.outline_rgba8();
        for (layout, x, y) in &placed {
            if fx.shadow_offset > 0 {
                let d = fx.shadow_offset as f64;
                draw_layout(&mut ctx, self.styler.font(), layout, x + d, y + d, SHADOW_RGBA);
            }
            if fx.outline_offset > 0 {
                let d = fx.outline_offset as f64;
                for (ox, oy) in [
                    (-d, 0.0),
                    (d, 0.0),
                    (0.0, -d),
                    (0.0, d),
                    (-d, -d),
                    (-d, d),
                    (d, -d),
                    (d, d),
                ] {
                    draw_layout(&mut ctx, self.styler.font(), layout, x + ox, y + oy, outline);
                }
            }
            draw_layout(
                &mut ctx,
                self.styler.font(),
                layout,
                *x,
                *y,
                self.spec.text_color.rgba8(),
            );
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.render_to_pixmap(&mut pixmap);
        self.ctx = Some(ctx);

        let mut rgba8 = vec![0u8; (width as usize) * (height as usize) * 4];
        flatten_premul_to_opaque(&mut rgba8, pixmap.data_as_u8_slice())?;
        Ok(ComposedFrame {
            width,
            height,
            rgba8,
        })
    }

    fn template_paint_for(&mut self, path: &Path) -> LexreelResult<TemplatePaint> {
        if let Some(p) = self.template_cache.get(path) {
            return Ok(p.clone());
        }
        let bytes = std::fs::read(path)
            .map_err(|e| LexreelError::io(format!("read template '{}': {e}", path.display())))?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| LexreelError::io(format!("decode template '{}': {e}", path.display())))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        let mut premul = decoded.into_raw();
        premultiply_rgba8_in_place(&mut premul);

        let pixmap = pixmap_from_premul_bytes(&premul, width, height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        let out = TemplatePaint {
            paint,
            width,
            height,
        };
        self.template_cache.insert(path.to_path_buf(), out.clone());
        Ok(out)
    }
}

fn draw_layout(
    ctx: &mut vello_cpu::RenderContext,
    font: &vello_cpu::peniko::FontData,
    layout: &parley::Layout<TextBrushRgba8>,
    x: f64,
    y: f64,
    color: [u8; 4],
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((x, y)));
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color[0], color[1], color[2], color[3],
    ));
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        px[0] = mul_div255(px[0] as u16, a);
        px[1] = mul_div255(px[1] as u16, a);
        px[2] = mul_div255(px[2] as u16, a);
    }
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> LexreelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| LexreelError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| LexreelError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(LexreelError::render("pixmap byte len mismatch"));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

/// Composite premultiplied pixels over opaque black and force alpha 255.
/// Templates are opaque, so in practice this is a straight copy.
fn flatten_premul_to_opaque(dst: &mut [u8], src: &[u8]) -> LexreelResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(LexreelError::render(
            "flatten expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        d[0] = s[0];
        d[1] = s[1];
        d[2] = s[2];
        d[3] = 255;
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_offset_depends_on_orientation() {
        assert_eq!(first_line_offset(1920, 1080), -100.0);
        assert_eq!(first_line_offset(1080, 1920), -180.0);
    }

    #[test]
    fn premultiply_scales_color_by_alpha() {
        let mut px = [255u8, 128, 0, 128, 10, 20, 30, 255];
        premultiply_rgba8_in_place(&mut px);
        assert_eq!(&px[..4], &[128, 64, 0, 128]);
        // Opaque pixels untouched.
        assert_eq!(&px[4..], &[10, 20, 30, 255]);
    }

    #[test]
    fn flatten_forces_opaque_alpha() {
        let src = [5u8, 6, 7, 42];
        let mut dst = [0u8; 4];
        flatten_premul_to_opaque(&mut dst, &src).unwrap();
        assert_eq!(dst, [5, 6, 7, 255]);
    }

    #[test]
    fn flatten_rejects_mismatched_buffers() {
        let src = [0u8; 8];
        let mut dst = [0u8; 4];
        assert!(flatten_premul_to_opaque(&mut dst, &src).is_err());
    }

    #[test]
    fn save_png_into_missing_directory_is_an_io_error() {
        let frame = ComposedFrame {
            width: 2,
            height: 2,
            rgba8: vec![0u8; 16],
        };
        let path = std::env::temp_dir()
            .join(format!(
                "lexreel_compose_missing_dir_{}_{}",
                std::process::id(),
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap()
                    .as_nanos()
            ))
            .join("f.png");
        let err = frame.save_png(&path).unwrap_err();
        assert!(matches!(err, LexreelError::Io(_)));
    }

    #[test]
    fn mul_div255_bounds() {
        assert_eq!(mul_div255(255, 255), 255);
        assert_eq!(mul_div255(255, 0), 0);
        assert_eq!(mul_div255(128, 255), 128);
    }
}
