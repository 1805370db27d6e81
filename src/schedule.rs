//! Deterministic parameter scheduling.
//!
//! Every random choice for a whole generation run is drawn up front,
//! sequentially, from a stream keyed by a stable string (the partition
//! name or the shape kind). Workers then consume fully-resolved specs,
//! so re-runs are bit-identical regardless of parallelism, partial runs
//! resume cleanly, and sibling runs never perturb each other's draws.

use rand::seq::IndexedRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::{SplitMix64, Xoshiro256PlusPlus};

use crate::assets::AssetCatalog;
use crate::color::{self, GLYPH_COLOR_NAMES, Rgb3, TARGET_COLOR_NAMES};
use crate::config::Config;
use crate::scene::SceneSpec;
use crate::shape::{GLYPHS, SHAPE_KINDS, ShapeKind, ShapeSpec};

/// Seeded stream for a named subsystem. FNV-1a folds the key, SplitMix64
/// whitens it; distinct keys (e.g. "train" vs "val") give disjoint
/// streams.
pub fn stream(key: &str) -> Xoshiro256PlusPlus {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in key.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    let mut sm = SplitMix64::seed_from_u64(h);
    Xoshiro256PlusPlus::seed_from_u64(sm.next_u64())
}

/// Asset counts the scheduler draws indices against. Decoupled from the
/// catalog itself so plans can be built and tested without decoding
/// images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogIndex {
    pub backgrounds: usize,
    pub fonts: usize,
    /// Base-silhouette count per kind, indexed by class index.
    pub bases: [usize; SHAPE_KINDS.len()],
}

impl CatalogIndex {
    pub fn of(catalog: &AssetCatalog) -> Self {
        let mut bases = [0usize; SHAPE_KINDS.len()];
        for kind in SHAPE_KINDS {
            bases[kind.class_index()] = catalog.bases(kind).len();
        }
        Self {
            backgrounds: catalog.backgrounds.len(),
            fonts: catalog.fonts.len(),
            bases,
        }
    }
}

/// Pre-draw every scene for a partition. Pure in (partition, count, cfg,
/// idx); invoked once per run before any parallel work.
pub fn plan_scenes(
    partition: &str,
    count: usize,
    cfg: &Config,
    idx: &CatalogIndex,
) -> Vec<SceneSpec> {
    let mut rng = stream(partition);
    (0..count).map(|i| draw_scene(i, &mut rng, cfg, idx)).collect()
}

fn draw_scene(
    index: usize,
    rng: &mut Xoshiro256PlusPlus,
    cfg: &Config,
    idx: &CatalogIndex,
) -> SceneSpec {
    let background = rng.random_range(0..idx.backgrounds);
    let flip = rng.random_bool(0.5);
    let mirror = rng.random_bool(0.5);
    let blur_max = cfg.scene_blur_max.max(cfg.scene_blur_min + 1);
    let blur = rng.random_range(cfg.scene_blur_min..blur_max) as f32;
    let n = rng.random_range(1..cfg.max_per_shape.max(2));

    let shapes = (0..n)
        .map(|_| {
            let kind = draw_kind(rng);
            let (fill, glyph_color) = draw_colors(rng);
            ShapeSpec {
                kind,
                glyph: draw_glyph(rng),
                base: rng.random_range(0..idx.bases[kind.class_index()]),
                font: rng.random_range(0..idx.fonts),
                fill,
                glyph_color,
                size: rng.random_range(35..55),
                angle: rng.random_range(0..360),
                x: grid_coord(rng, cfg.full_width),
                y: grid_coord(rng, cfg.full_height),
            }
        })
        .collect();

    SceneSpec {
        index,
        background,
        flip,
        mirror,
        blur,
        shapes,
    }
}

/// A fully-resolved single-shape corpus instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeInstance {
    pub index: usize,
    pub spec: ShapeSpec,
    pub background: usize,
    pub padding: u32,
    /// Crop-in strength in 60..=80; larger values leave less margin
    /// around the shape, so the corpus varies in apparent shape scale.
    pub crop: u32,
    pub blur: f32,
}

/// Pre-draw a kind's whole corpus, seeded by the kind name so per-kind
/// runs are independent of each other and of scene generation.
pub fn plan_shape_instances(
    kind: ShapeKind,
    count: usize,
    idx: &CatalogIndex,
) -> Vec<ShapeInstance> {
    let mut rng = stream(kind.as_str());
    (0..count)
        .map(|index| {
            let (fill, glyph_color) = draw_colors(&mut rng);
            ShapeInstance {
                index,
                spec: ShapeSpec {
                    kind,
                    glyph: draw_glyph(&mut rng),
                    base: rng.random_range(0..idx.bases[kind.class_index()]),
                    font: rng.random_range(0..idx.fonts),
                    fill,
                    glyph_color,
                    size: rng.random_range(50..=200),
                    angle: rng.random_range(0..360),
                    x: 0,
                    y: 0,
                },
                background: rng.random_range(0..idx.backgrounds),
                padding: rng.random_range(10..=30),
                crop: rng.random_range(60..=80),
                blur: rng.random_range(1..7) as f32,
            }
        })
        .collect()
}

fn draw_kind(rng: &mut Xoshiro256PlusPlus) -> ShapeKind {
    *SHAPE_KINDS
        .as_slice()
        .choose(rng)
        .unwrap_or(&ShapeKind::Circle)
}

fn draw_glyph(rng: &mut Xoshiro256PlusPlus) -> char {
    *GLYPHS.as_slice().choose(rng).unwrap_or(&'A')
}

/// Draw a fill and a glyph color. A glyph color whose name matches the
/// fill falls back to white before the variant/jitter draws.
fn draw_colors(rng: &mut Xoshiro256PlusPlus) -> (Rgb3, Rgb3) {
    let fill_name = TARGET_COLOR_NAMES.choose(rng).copied().unwrap_or("gray");
    let mut glyph_name = GLYPH_COLOR_NAMES.choose(rng).copied().unwrap_or("white");
    if glyph_name == fill_name {
        glyph_name = "white";
    }
    let fill = *color::variants(fill_name)
        .choose(rng)
        .unwrap_or(&[128, 128, 128]);
    let glyph = *color::variants(glyph_name)
        .choose(rng)
        .unwrap_or(&[255, 255, 255]);
    (color::jitter(fill, rng), color::jitter(glyph, rng))
}

/// Placement on a 50px grid with a 200px margin on each side, matching
/// the maximum shape extent so placed shapes stay inside the scene.
fn grid_coord(rng: &mut Xoshiro256PlusPlus, dim: u32) -> u32 {
    if dim <= 400 {
        return 0;
    }
    let steps = (dim - 400).div_ceil(50);
    200 + 50 * rng.random_range(0..steps)
}
