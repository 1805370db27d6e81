//! Generation drivers: full scenes per partition, and the single-shape
//! corpus per kind. Both draw their full parameter plans first, skip
//! indices that already exist on disk, and fan the rest over the pool,
//! so a resumed run regenerates exactly the missing outputs.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbImage, Rgba, RgbaImage, imageops, imageops::FilterType};
use imageproc::filter::gaussian_blur_f32;
use log::info;

use crate::assets::{AssetCatalog, list_files};
use crate::config::Config;
use crate::error::Result;
use crate::labels;
use crate::pool;
use crate::scene;
use crate::schedule::{self, CatalogIndex, ShapeInstance};
use crate::shape::{SHAPE_KINDS, ShapeKind, compose};

/// Generate `count` full scenes with label sidecars for a partition.
pub fn generate_scenes(partition: &str, count: usize, cfg: &Config) -> Result<()> {
    let mut catalog = AssetCatalog::load(cfg)?;
    catalog.resize_backgrounds(cfg.full_width, cfg.full_height);
    let idx = CatalogIndex::of(&catalog);

    let dir = cfg.data_dir.join(partition).join("images");
    fs::create_dir_all(&dir)?;

    let specs = schedule::plan_scenes(partition, count, cfg, &idx);
    let todo: Vec<_> = specs
        .into_iter()
        .filter(|s| {
            !(dir.join(format!("ex{}.png", s.index)).exists()
                && dir.join(format!("ex{}.txt", s.index)).exists())
        })
        .collect();
    info!(
        "generating {} of {count} scenes for partition {partition}",
        todo.len()
    );

    pool::parallel_map(
        &format!("Data Generation for {partition}"),
        cfg.workers,
        todo,
        |spec| {
            let (img, boxes) = scene::render(&spec, &catalog)?;
            img.save(dir.join(format!("ex{}.png", spec.index)))?;
            labels::write_scene_labels(&dir.join(format!("ex{}.txt", spec.index)), &boxes)?;
            Ok(())
        },
    )
}

/// Generate the single-shape corpus for every kind (or one kind).
pub fn generate_shape_corpus(kind_filter: Option<ShapeKind>, cfg: &Config) -> Result<()> {
    let catalog = AssetCatalog::load(cfg)?;
    let idx = CatalogIndex::of(&catalog);
    for kind in SHAPE_KINDS {
        if kind_filter.is_some_and(|k| k != kind) {
            continue;
        }
        generate_kind(kind, cfg, &catalog, &idx)?;
    }
    Ok(())
}

fn generate_kind(
    kind: ShapeKind,
    cfg: &Config,
    catalog: &AssetCatalog,
    idx: &CatalogIndex,
) -> Result<()> {
    let dir = cfg.shapes_dir.join(kind.as_str());
    fs::create_dir_all(&dir)?;

    let mut existing = scan_existing(&dir, kind);
    let excess: Vec<usize> = existing
        .iter()
        .copied()
        .filter(|&i| i >= cfg.num_shapes)
        .collect();
    if !excess.is_empty() {
        info!("clearing {} excess {} images", excess.len(), kind.as_str());
        for i in excess {
            fs::remove_file(instance_path(&dir, kind, i))?;
            existing.remove(&i);
        }
    }
    if existing.len() == cfg.num_shapes {
        info!("{} image count already met, skipping", kind.as_str());
        return Ok(());
    }

    let plan = schedule::plan_shape_instances(kind, cfg.num_shapes, idx);
    let todo: Vec<ShapeInstance> = plan
        .into_iter()
        .filter(|inst| !existing.contains(&inst.index))
        .collect();

    pool::parallel_map(
        &format!("{} Generation", kind.as_str()),
        cfg.workers,
        todo,
        |inst| {
            let img = render_instance(&inst, catalog)?;
            img.save(instance_path(&dir, kind, inst.index))?;
            Ok(())
        },
    )
}

/// Indices already produced for a kind, parsed from `{kind}-NNNNNN.jpg`.
pub fn scan_existing(dir: &Path, kind: ShapeKind) -> BTreeSet<usize> {
    let prefix = format!("{}-", kind.as_str());
    list_files(dir, &["jpg"])
        .into_iter()
        .filter_map(|p| {
            let stem = p.file_stem()?.to_str()?.to_string();
            let number = stem.strip_prefix(&prefix)?;
            number.parse::<usize>().ok()
        })
        .collect()
}

fn instance_path(dir: &Path, kind: ShapeKind, index: usize) -> PathBuf {
    dir.join(format!("{}-{index:06}.jpg", kind.as_str()))
}

/// Compose the shape, reframe it by the instance's crop-in draw, paste
/// it centered onto a crop-sized background, and blur the whole small
/// canvas for edge blending.
fn render_instance(inst: &ShapeInstance, catalog: &AssetCatalog) -> Result<RgbImage> {
    let shape_img = frame_shape(&compose(&inst.spec, catalog)?, inst);
    let side = inst.spec.size + inst.padding;
    let bg = &catalog.backgrounds[inst.background];
    let mut canvas = imageops::resize(bg, side, side, FilterType::Triangle);

    let ox = (side as i64 - shape_img.width() as i64) / 2;
    let oy = (side as i64 - shape_img.height() as i64) / 2;
    imageops::overlay(&mut canvas, &shape_img, ox, oy);

    let canvas = gaussian_blur_f32(&canvas, inst.blur);
    Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

/// Center the shape on a square frame with the crop-in margin, then
/// resize the frame to the drawn size. A tighter crop leaves a smaller
/// margin, so the shape fills more of the final image.
fn frame_shape(shape_img: &RgbaImage, inst: &ShapeInstance) -> RgbaImage {
    let extent = shape_img.width().max(shape_img.height()).max(1);
    let margin = crop_margin(inst.spec.kind, inst.crop) * extent / 256;
    let frame = extent + 2 * margin;

    let mut framed = RgbaImage::from_pixel(frame, frame, Rgba([0, 0, 0, 0]));
    let ox = ((frame - shape_img.width()) / 2) as i64;
    let oy = ((frame - shape_img.height()) / 2) as i64;
    imageops::overlay(&mut framed, shape_img, ox, oy);
    imageops::resize(&framed, inst.spec.size, inst.spec.size, FilterType::Triangle)
}

/// Margin per side in 256-frame pixels for a crop-in draw. Wide kinds
/// are cropped harder; their content is short, so a tight frame keeps
/// them legible.
fn crop_margin(kind: ShapeKind, crop: u32) -> u32 {
    match kind {
        ShapeKind::Rectangle | ShapeKind::Semicircle | ShapeKind::Trapezoid => {
            120u32.saturating_sub(2 * crop)
        }
        _ => 100u32.saturating_sub(crop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeSpec;

    fn instance(crop: u32, size: u32) -> ShapeInstance {
        ShapeInstance {
            index: 0,
            spec: ShapeSpec {
                kind: ShapeKind::Circle,
                glyph: 'A',
                base: 0,
                font: 0,
                fill: [188, 60, 60],
                glyph_color: [240, 240, 240],
                size,
                angle: 0,
                x: 0,
                y: 0,
            },
            background: 0,
            padding: 10,
            crop,
            blur: 1.0,
        }
    }

    fn opaque_fraction(img: &RgbaImage) -> f64 {
        let hits = img.pixels().filter(|p| p.0[3] > 128).count();
        hits as f64 / (img.width() * img.height()) as f64
    }

    #[test]
    fn tighter_crop_scales_the_shape_up() {
        let shape = RgbaImage::from_pixel(100, 100, Rgba([188, 60, 60, 255]));
        let loose = frame_shape(&shape, &instance(60, 120));
        let tight = frame_shape(&shape, &instance(80, 120));
        assert_eq!(loose.dimensions(), (120, 120));
        assert_eq!(tight.dimensions(), (120, 120));
        assert!(opaque_fraction(&tight) > opaque_fraction(&loose));
    }

    #[test]
    fn wide_kinds_are_cropped_harder() {
        for crop in 60..=80 {
            assert!(crop_margin(ShapeKind::Semicircle, crop) < crop_margin(ShapeKind::Circle, crop));
        }
        // The tightest draws leave wide kinds with no margin at all.
        assert_eq!(crop_margin(ShapeKind::Trapezoid, 80), 0);
    }

    #[test]
    fn scans_only_matching_indices() {
        let dir = std::env::temp_dir().join(format!("targetgen-scan-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        for name in [
            "circle-000000.jpg",
            "circle-000007.jpg",
            "circle-junk.jpg",
            "square-000001.jpg",
            "circle-000002.png",
        ] {
            fs::write(dir.join(name), b"x").unwrap();
        }
        let found = scan_existing(&dir, ShapeKind::Circle);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![0, 7]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn quarter_circle_prefix_parses_despite_hyphen() {
        let dir =
            std::env::temp_dir().join(format!("targetgen-scan-qc-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("quarter-circle-000004.jpg"), b"x").unwrap();
        let found = scan_existing(&dir, ShapeKind::QuarterCircle);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![4]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
