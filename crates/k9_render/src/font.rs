//! TrueType/OpenType text rasterised into RGBA bitmaps.
//!
//! A font is parsed once and can be rendered at any size in
//! [`FONT_POINT_SIZES`]. Text is rendered blended: glyph coverage becomes the
//! alpha channel and every pixel carries the requested color.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font as _, FontArc, Glyph, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use k9_core::{Color, FONT_POINT_SIZES};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("'{name}' is not a valid TrueType/OpenType font")]
    Invalid { name: String },
    #[error("point size {size} is unsupported in font '{name}'")]
    UnsupportedSize { size: u32, name: String },
    #[error("cannot render empty text")]
    EmptyText,
}

pub struct Font {
    name: String,
    font: FontArc,
}

impl Font {
    pub const SUPPORTED_SIZES: &'static [u32] = FONT_POINT_SIZES;

    pub fn load(path: &Path) -> Result<Self, FontError> {
        let bytes = fs::read(path).map_err(|source| FontError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let font = Self::from_bytes(bytes, &path.display().to_string())?;
        log::info!(
            "Loaded font '{}' in {} sizes",
            font.name,
            Self::SUPPORTED_SIZES.len()
        );
        Ok(font)
    }

    pub fn from_bytes(bytes: Vec<u8>, name: &str) -> Result<Self, FontError> {
        let font = FontArc::try_from_vec(bytes).map_err(|_| FontError::Invalid {
            name: name.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            font,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supports(point_size: u32) -> bool {
        Self::SUPPORTED_SIZES.contains(&point_size)
    }

    /// Rasterise a single line of `text`. The bitmap is exactly one line tall
    /// (ascent to descent) and as wide as the laid-out glyphs.
    pub fn render_text(
        &self,
        text: &str,
        color: Color,
        point_size: u32,
    ) -> Result<RgbaImage, FontError> {
        if !Self::supports(point_size) {
            return Err(FontError::UnsupportedSize {
                size: point_size,
                name: self.name.clone(),
            });
        }
        if text.is_empty() {
            return Err(FontError::EmptyText);
        }

        // Point sizes are em sizes at 72 dpi; PxScale measures ascent-to-descent.
        let scale = self
            .font
            .pt_to_px_scale(point_size as f32)
            .unwrap_or_else(|| PxScale::from(point_size as f32));
        let scaled = self.font.as_scaled(scale);
        let ascent = scaled.ascent();

        let mut glyphs: Vec<Glyph> = Vec::with_capacity(text.len());
        let mut caret = 0.0f32;
        let mut previous = None;
        for ch in text.chars().filter(|c| !c.is_control()) {
            let mut glyph = scaled.scaled_glyph(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, glyph.id);
            }
            glyph.position = point(caret, ascent);
            caret += scaled.h_advance(glyph.id);
            previous = Some(glyph.id);
            glyphs.push(glyph);
        }
        if glyphs.is_empty() {
            return Err(FontError::EmptyText);
        }

        let outlined: Vec<_> = glyphs
            .into_iter()
            .filter_map(|g| scaled.outline_glyph(g))
            .collect();
        // Glyphs with a negative left bearing start left of the caret origin.
        let left_edge = outlined
            .iter()
            .map(|g| g.px_bounds().min.x)
            .fold(0.0, f32::min)
            .floor();
        let right_edge = outlined
            .iter()
            .map(|g| g.px_bounds().max.x)
            .fold(caret, f32::max);
        let width = ((right_edge - left_edge).ceil() as u32).max(1);
        let height = ((ascent - scaled.descent()).ceil() as u32).max(1);
        let origin_x = -left_edge as i32;

        let [r, g, b, a] = color.to_array();
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 0]));
        for glyph in &outlined {
            let bounds = glyph.px_bounds();
            glyph.draw(|gx, gy, coverage| {
                let x = origin_x + bounds.min.x as i32 + gx as i32;
                let y = bounds.min.y as i32 + gy as i32;
                if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
                    return;
                }
                let alpha = (coverage.clamp(0.0, 1.0) * a as f32).round() as u8;
                let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                pixel.0[3] = pixel.0[3].max(alpha);
            });
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_sizes_match_the_size_table() {
        assert!(Font::supports(8));
        assert!(Font::supports(30));
        assert!(Font::supports(72));
        assert!(!Font::supports(13));
        assert!(!Font::supports(100));
    }

    #[test]
    fn invalid_bytes_are_rejected() {
        let err = Font::from_bytes(b"not a font".to_vec(), "bogus.ttf")
            .err()
            .expect("garbage should not parse");
        assert!(matches!(err, FontError::Invalid { .. }));
        assert!(err.to_string().contains("bogus.ttf"));
    }

    fn fixture() -> Font {
        let bytes = include_bytes!("../fixtures/DejaVuSans.ttf").to_vec();
        Font::from_bytes(bytes, "DejaVuSans.ttf").expect("fixture font parses")
    }

    fn lit_pixels(image: &RgbaImage) -> usize {
        image.pixels().filter(|p| p.0[3] > 0).count()
    }

    #[test]
    fn unsupported_size_is_checked_before_text() {
        let font = fixture();
        let err = font.render_text("", Color::WHITE, 13).unwrap_err();
        assert!(matches!(err, FontError::UnsupportedSize { size: 13, .. }));
        assert!(err.to_string().contains("DejaVuSans.ttf"));
    }

    #[test]
    fn empty_and_control_only_text_are_rejected() {
        let font = fixture();
        assert!(matches!(
            font.render_text("", Color::WHITE, 24),
            Err(FontError::EmptyText)
        ));
        assert!(matches!(
            font.render_text("\n\t\r", Color::WHITE, 24),
            Err(FontError::EmptyText)
        ));
    }

    #[test]
    fn bitmap_is_one_line_tall() {
        let font = fixture();
        let image = font.render_text("Hello", Color::WHITE, 30).unwrap();

        let scaled = font.font.as_scaled(font.font.pt_to_px_scale(30.0).unwrap());
        let expected = (scaled.ascent() - scaled.descent()).ceil() as u32;
        assert_eq!(image.height(), expected);
        assert!(image.width() > image.height());

        let descender = font.render_text("gyp", Color::WHITE, 30).unwrap();
        assert_eq!(descender.height(), expected);
    }

    #[test]
    fn coverage_goes_to_alpha_and_color_is_uniform() {
        let font = fixture();
        let color = Color::rgba(200, 40, 10, 255);
        let image = font.render_text("Ab", color, 24).unwrap();

        assert!(lit_pixels(&image) > 0);
        assert!(image.pixels().any(|p| p.0[3] == 255));
        assert!(image.pixels().any(|p| p.0[3] == 0));
        assert!(image.pixels().all(|p| p.0[..3] == [200, 40, 10]));
    }

    #[test]
    fn color_alpha_scales_coverage() {
        let font = fixture();
        let image = font
            .render_text("A", Color::rgba(255, 255, 255, 128), 24)
            .unwrap();
        let max_alpha = image.pixels().map(|p| p.0[3]).max().unwrap();
        assert_eq!(max_alpha, 128);
    }

    #[test]
    fn control_characters_are_skipped() {
        let font = fixture();
        let plain = font.render_text("AB", Color::WHITE, 24).unwrap();
        let mixed = font.render_text("A\tB", Color::WHITE, 24).unwrap();
        assert_eq!(plain.dimensions(), mixed.dimensions());
        assert_eq!(lit_pixels(&plain), lit_pixels(&mixed));
    }

    #[test]
    fn negative_left_bearing_is_not_clipped() {
        let font = fixture();
        let scaled = font.font.as_scaled(font.font.pt_to_px_scale(72.0).unwrap());
        let mut glyph = scaled.scaled_glyph('J');
        glyph.position = point(0.0, scaled.ascent());
        let outline = scaled.outline_glyph(glyph).unwrap();
        assert!(outline.px_bounds().min.x < 0.0);

        let mut expected = 0;
        outline.draw(|_, _, coverage| {
            if (coverage.clamp(0.0, 1.0) * 255.0).round() as u8 > 0 {
                expected += 1;
            }
        });

        let image = font.render_text("J", Color::WHITE, 72).unwrap();
        assert_eq!(lit_pixels(&image), expected);
    }

    #[test]
    fn missing_file_reports_path() {
        let path = Path::new("assets/fonts/__missing__.ttf");
        let err = Font::load(path).err().expect("missing file should fail");
        assert!(matches!(err, FontError::Read { .. }));
    }
}
