use std::path::Path;

use anyhow::Context as _;

use crate::config::FontSizeRange;
use crate::error::{LexreelError, LexreelResult};

/// RGBA8 brush color carried through Parley layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<[u8; 4]> for TextBrushRgba8 {
    fn from(c: [u8; 4]) -> Self {
        Self {
            r: c[0],
            g: c[1],
            b: c[2],
            a: c[3],
        }
    }
}

/// Largest size in `range` at which the measured width fits `max_width`.
///
/// Starts at `range.max` and decrements by `range.step`; the floor
/// `range.min` is accepted even when the text still overflows, so long
/// strings degrade to a visual overflow instead of an error. The cascade
/// is deterministic: same measure function, same result.
pub fn fit_size(
    range: FontSizeRange,
    max_width: f32,
    mut measure: impl FnMut(f32) -> LexreelResult<f32>,
) -> LexreelResult<f32> {
    range.validate()?;
    let mut size = range.max;
    loop {
        if measure(size)? <= max_width {
            return Ok(size);
        }
        let next = size - range.step;
        if next <= range.min {
            return Ok(range.min);
        }
        size = next;
    }
}

/// Stateful text shaper: owns the Parley contexts and one registered font.
///
/// The font is registered once at construction; every layout call reuses
/// the resolved family name and the shared `FontData` blob the raster
/// backend draws glyphs from.
pub struct TextStyler {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

impl TextStyler {
    pub fn from_font_bytes(font_bytes: Vec<u8>) -> LexreelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| LexreelError::render("no font families registered from font bytes"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| LexreelError::render("registered font family has no name"))?
            .to_string();

        let font =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font,
        })
    }

    pub fn from_font_file(path: &Path) -> LexreelResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read font '{}'", path.display()))?;
        Self::from_font_bytes(bytes)
    }

    /// Font blob for glyph rasterization.
    pub fn font(&self) -> &vello_cpu::peniko::FontData {
        &self.font
    }

    /// Shape and lay out one line of plain text at a fixed size.
    pub fn layout(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> LexreelResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(LexreelError::render("text size_px must be finite and > 0"));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }

    /// Advance width of `text` at `size_px`, in pixels.
    pub fn measure_width(&mut self, text: &str, size_px: f32) -> LexreelResult<f32> {
        Ok(self.layout(text, size_px, TextBrushRgba8::default())?.width())
    }

    /// Run the size cascade against real shaped widths.
    pub fn fit(
        &mut self,
        text: &str,
        range: FontSizeRange,
        max_width: f32,
    ) -> LexreelResult<f32> {
        fit_size(range, max_width, |size| self.measure_width(text, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Linear fake measure: width grows with size, no font needed.
    fn measure_for(char_count: usize) -> impl FnMut(f32) -> LexreelResult<f32> {
        move |size| Ok(size * 0.6 * char_count as f32)
    }

    #[test]
    fn short_text_keeps_max_size() {
        let range = FontSizeRange::new(120.0, 20.0, 10.0);
        let size = fit_size(range, 1000.0, measure_for(5)).unwrap();
        assert_eq!(size, 120.0);
    }

    #[test]
    fn shrink_is_monotonic_in_step_increments() {
        let range = FontSizeRange::new(120.0, 20.0, 10.0);
        let size = fit_size(range, 900.0, measure_for(20)).unwrap();
        assert!(size <= range.max);
        assert!(size >= range.min);
        // Size must sit on the cascade lattice max - k*step.
        let steps = (range.max - size) / range.step;
        assert!((steps - steps.round()).abs() < 1e-4);
        // Chosen size fits, one step larger would not.
        assert!(size * 0.6 * 20.0 <= 900.0);
        assert!((size + range.step) * 0.6 * 20.0 > 900.0);
    }

    #[test]
    fn floor_is_accepted_even_when_overflowing() {
        let range = FontSizeRange::new(120.0, 20.0, 10.0);
        let size = fit_size(range, 10.0, measure_for(500)).unwrap();
        assert_eq!(size, 20.0);
    }

    #[test]
    fn fit_is_idempotent() {
        let range = FontSizeRange::new(75.0, 20.0, 10.0);
        let a = fit_size(range, 400.0, measure_for(17)).unwrap();
        let b = fit_size(range, 400.0, measure_for(17)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_range_is_rejected() {
        let range = FontSizeRange::new(10.0, 20.0, 10.0);
        assert!(fit_size(range, 100.0, measure_for(3)).is_err());
    }
}
