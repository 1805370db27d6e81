use std::collections::BTreeMap;

use image::{Rgba, RgbaImage, imageops};
use once_cell::sync::Lazy;
use rand::Rng;

pub type Rgb3 = [u8; 3];

/// Named color groups for target fills and glyphs. Each name maps to a
/// handful of RGB variants; which variant is used is drawn per instance.
pub static COLORS: Lazy<BTreeMap<&'static str, Vec<Rgb3>>> = Lazy::new(|| {
    let mut m = BTreeMap::new();
    m.insert("black", vec![[20, 20, 20], [40, 40, 40]]);
    m.insert(
        "blue",
        vec![[82, 82, 148], [127, 127, 255], [0, 0, 255], [0, 0, 135]],
    );
    m.insert("brown", vec![[153, 76, 0], [122, 61, 0]]);
    m.insert("gray", vec![[128, 128, 128], [96, 96, 96]]);
    m.insert(
        "green",
        vec![[64, 115, 64], [148, 255, 148], [0, 255, 0], [0, 128, 4]],
    );
    m.insert(
        "orange",
        vec![[216, 172, 83], [255, 204, 101], [255, 165, 0], [210, 140, 0]],
    );
    m.insert("purple", vec![[128, 0, 128], [96, 0, 96]]);
    m.insert(
        "red",
        vec![[188, 60, 60], [255, 80, 80], [255, 0, 0], [154, 0, 0]],
    );
    m.insert("white", vec![[255, 255, 255], [240, 240, 240]]);
    m.insert(
        "yellow",
        vec![[225, 221, 104], [255, 252, 122], [255, 247, 0], [210, 203, 0]],
    );
    m
});

pub const TARGET_COLOR_NAMES: &[&str] = &[
    "black", "blue", "brown", "gray", "green", "orange", "purple", "red", "white", "yellow",
];

pub const GLYPH_COLOR_NAMES: &[&str] = TARGET_COLOR_NAMES;

pub fn variants(name: &str) -> &'static [Rgb3] {
    COLORS.get(name).map(Vec::as_slice).unwrap_or(&[[255, 255, 255]])
}

/// ±10 per-channel jitter, clamped away from both pure black (stripped as
/// a rotation artifact) and pure white (stripped as cutout background).
pub fn jitter<R: Rng>(rgb: Rgb3, rng: &mut R) -> Rgb3 {
    let mut out = [0u8; 3];
    for (o, &c) in out.iter_mut().zip(rgb.iter()) {
        let d: i32 = rng.random_range(-10..=10);
        *o = (c as i32 + d).clamp(6, 254) as u8;
    }
    out
}

/// Recolor every non-white pixel of a base silhouette to the fill color.
/// White is the cutout background in the source art and is left alone.
pub fn recolor(img: &mut RgbaImage, fill: Rgb3) {
    for p in img.pixels_mut() {
        let [r, g, b, _] = p.0;
        if r != 255 || g != 255 || b != 255 {
            *p = Rgba([fill[0], fill[1], fill[2], 255]);
        }
    }
}

/// Turn pure-white pixels fully transparent and crop to remaining content.
pub fn strip_white(mut img: RgbaImage) -> RgbaImage {
    for p in img.pixels_mut() {
        let [r, g, b, _] = p.0;
        if r == 255 && g == 255 && b == 255 {
            *p = Rgba([0, 0, 0, 0]);
        }
    }
    crop_to_content(img)
}

/// Drop the near-black fringe that bilinear rotation leaves along shape
/// edges, then re-crop to content.
pub fn strip_rotation_artifacts(mut img: RgbaImage) -> RgbaImage {
    for p in img.pixels_mut() {
        let [r, g, b, _] = p.0;
        if r < 5 && g < 5 && b < 5 {
            *p = Rgba([0, 0, 0, 0]);
        }
    }
    crop_to_content(img)
}

/// Tight bounding box of opaque pixels as `(x, y, w, h)`.
pub fn content_bounds(img: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0u32, 0u32);
    let mut any = false;
    for (x, y, p) in img.enumerate_pixels() {
        if p.0[3] != 0 {
            any = true;
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
    }
    any.then(|| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

pub fn crop_to_content(img: RgbaImage) -> RgbaImage {
    match content_bounds(&img) {
        Some((x, y, w, h)) => imageops::crop_imm(&img, x, y, w, h).to_image(),
        None => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn white_with_square(side: u32, x: u32, y: u32, sq: u32) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(side, side, Rgba([255, 255, 255, 255]));
        for dy in 0..sq {
            for dx in 0..sq {
                img.put_pixel(x + dx, y + dy, Rgba([200, 30, 30, 255]));
            }
        }
        img
    }

    #[test]
    fn jitter_stays_in_safe_range() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..200 {
            let c = jitter([0, 128, 255], &mut rng);
            assert!(c.iter().all(|&v| (6..=254).contains(&v)));
        }
    }

    #[test]
    fn jitter_is_deterministic_per_seed() {
        let mut a = Xoshiro256PlusPlus::seed_from_u64(3);
        let mut b = Xoshiro256PlusPlus::seed_from_u64(3);
        assert_eq!(jitter([90, 90, 90], &mut a), jitter([90, 90, 90], &mut b));
    }

    #[test]
    fn recolor_spares_white() {
        let mut img = white_with_square(16, 4, 4, 8);
        recolor(&mut img, [10, 200, 10]);
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(5, 5).0, [10, 200, 10, 255]);
    }

    #[test]
    fn strip_white_crops_to_content() {
        let img = strip_white(white_with_square(32, 8, 10, 6));
        assert_eq!(img.dimensions(), (6, 6));
        assert_eq!(img.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn content_bounds_of_transparent_image_is_none() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        assert!(content_bounds(&img).is_none());
    }
}
