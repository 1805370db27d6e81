use ab_glyph::PxScale;
use image::{Rgba, RgbaImage, imageops, imageops::FilterType};
use imageproc::drawing::{draw_text_mut, text_size};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use crate::assets::AssetCatalog;
use crate::color::{self, Rgb3};
use crate::error::Result;

/// Alphanumerics that may be drawn on a target.
pub const GLYPHS: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Base silhouettes are normalized to this square before recoloring.
const BASE_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeKind {
    Circle,
    Cross,
    Pentagon,
    QuarterCircle,
    Rectangle,
    Semicircle,
    Square,
    Star,
    Trapezoid,
    Triangle,
}

/// Fixed enumeration; a kind's position here is its detector class index.
pub const SHAPE_KINDS: [ShapeKind; 10] = [
    ShapeKind::Circle,
    ShapeKind::Cross,
    ShapeKind::Pentagon,
    ShapeKind::QuarterCircle,
    ShapeKind::Rectangle,
    ShapeKind::Semicircle,
    ShapeKind::Square,
    ShapeKind::Star,
    ShapeKind::Trapezoid,
    ShapeKind::Triangle,
];

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Cross => "cross",
            ShapeKind::Pentagon => "pentagon",
            ShapeKind::QuarterCircle => "quarter-circle",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Semicircle => "semicircle",
            ShapeKind::Square => "square",
            ShapeKind::Star => "star",
            ShapeKind::Trapezoid => "trapezoid",
            ShapeKind::Triangle => "triangle",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        SHAPE_KINDS.iter().copied().find(|k| k.as_str() == s)
    }

    pub fn class_index(self) -> usize {
        match self {
            ShapeKind::Circle => 0,
            ShapeKind::Cross => 1,
            ShapeKind::Pentagon => 2,
            ShapeKind::QuarterCircle => 3,
            ShapeKind::Rectangle => 4,
            ShapeKind::Semicircle => 5,
            ShapeKind::Square => 6,
            ShapeKind::Star => 7,
            ShapeKind::Trapezoid => 8,
            ShapeKind::Triangle => 9,
        }
    }

    /// Glyph height as a fraction of the silhouette height. Calibrated
    /// per kind; cosmetic, not a correctness invariant.
    pub fn glyph_scale(self) -> f32 {
        match self {
            ShapeKind::Star => 0.14,
            ShapeKind::Triangle => 0.50,
            ShapeKind::Rectangle => 0.72,
            ShapeKind::QuarterCircle => 0.60,
            ShapeKind::Square => 0.60,
            ShapeKind::Trapezoid => 0.60,
            _ => 0.55,
        }
    }

    /// Nudge applied after centering so glyphs sit visually centered on
    /// asymmetric silhouettes. Same calibration status as `glyph_scale`.
    pub fn glyph_offset(self) -> (i32, i32) {
        match self {
            ShapeKind::Trapezoid => (0, -20),
            ShapeKind::Triangle => (-120, 50),
            ShapeKind::QuarterCircle => (14, -40),
            ShapeKind::Cross => (0, -25),
            ShapeKind::Square => (0, -10),
            _ => (0, 0),
        }
    }
}

/// Fully-resolved description of one placed shape. All randomness is
/// drawn by the scheduler before this exists; rendering is pure.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSpec {
    pub kind: ShapeKind,
    pub glyph: char,
    /// Index into the catalog's base silhouettes for `kind`.
    pub base: usize,
    /// Index into the catalog's fonts.
    pub font: usize,
    pub fill: Rgb3,
    pub glyph_color: Rgb3,
    pub size: u32,
    pub angle: u32,
    /// Placement in full-scene coordinates.
    pub x: u32,
    pub y: u32,
}

impl ShapeSpec {
    pub fn label(&self) -> String {
        format!("{}_{}", self.kind.as_str(), self.glyph)
    }
}

/// Build one RGBA shape image, tightly cropped to content: recolored
/// silhouette, centered glyph, resized, rotated on an expanded canvas,
/// edge-cleaned.
pub fn compose(spec: &ShapeSpec, catalog: &AssetCatalog) -> Result<RgbaImage> {
    let base = &catalog.bases(spec.kind)[spec.base];
    let mut img = imageops::resize(base, BASE_SIZE, BASE_SIZE, FilterType::Nearest);
    color::recolor(&mut img, spec.fill);
    let mut img = color::strip_white(img);

    draw_glyph(&mut img, spec, catalog);

    let img = imageops::resize(&img, spec.size, spec.size, FilterType::Triangle);
    let img = rotate_expanded(&img, spec.angle as f32);
    Ok(color::strip_rotation_artifacts(img))
}

fn draw_glyph(img: &mut RgbaImage, spec: &ShapeSpec, catalog: &AssetCatalog) {
    let px = (spec.kind.glyph_scale() * img.height() as f32).round();
    let scale = PxScale { x: px, y: px };
    let font = &catalog.fonts[spec.font];
    let text = spec.glyph.to_string();

    let (tw, th) = text_size(scale, font, &text);
    let (ox, oy) = spec.kind.glyph_offset();
    let tx = (img.width() as i32 - tw as i32) / 2 + ox;
    let ty = (img.height() as i32 - th as i32) / 2 + oy;

    let [r, g, b] = spec.glyph_color;
    draw_text_mut(img, Rgba([r, g, b, 255]), tx, ty, scale, font, &text);
}

/// Rotate without clipping corners: pad to the diagonal, then rotate
/// about the center with a transparent fill.
fn rotate_expanded(img: &RgbaImage, degrees: f32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let diag = ((w as f32).powi(2) + (h as f32).powi(2)).sqrt().ceil() as u32 + 2;
    let mut canvas = RgbaImage::from_pixel(diag, diag, Rgba([0, 0, 0, 0]));
    imageops::overlay(
        &mut canvas,
        img,
        ((diag - w) / 2) as i64,
        ((diag - h) / 2) as i64,
    );
    rotate_about_center(
        &canvas,
        degrees.to_radians(),
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrips_through_labels() {
        for kind in SHAPE_KINDS {
            assert_eq!(ShapeKind::parse(kind.as_str()), Some(kind));
            assert_eq!(SHAPE_KINDS[kind.class_index()], kind);
        }
    }

    #[test]
    fn glyph_tables_cover_every_kind() {
        for kind in SHAPE_KINDS {
            assert!(kind.glyph_scale() > 0.0 && kind.glyph_scale() < 1.0);
            let (ox, oy) = kind.glyph_offset();
            assert!(ox.abs() < BASE_SIZE as i32 && oy.abs() < BASE_SIZE as i32);
        }
    }

    #[test]
    fn rotation_expands_canvas_and_keeps_content() {
        let mut img = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 0]));
        for y in 10..30 {
            for x in 10..30 {
                img.put_pixel(x, y, Rgba([120, 40, 40, 255]));
            }
        }
        let rotated = rotate_expanded(&img, 45.0);
        assert!(rotated.width() > img.width());
        assert!(crate::color::content_bounds(&rotated).is_some());
    }
}
