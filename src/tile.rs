use std::fs;
use std::path::Path;

use image::{RgbaImage, imageops, imageops::FilterType};
use log::info;
use rand::seq::SliceRandom;

use crate::assets::list_files;
use crate::config::Config;
use crate::error::{GenError, Result};
use crate::geom::{SceneBox, TileBox, Window, windows};
use crate::labels;
use crate::pool;
use crate::schedule;

/// Which training dataset a tiling run feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMode {
    /// One image, many normalized boxes; empty tiles are dropped.
    Detector,
    /// One image, binary target/background label, class-balanced.
    Classifier,
}

impl TileMode {
    pub fn prefix(self) -> &'static str {
        match self {
            TileMode::Detector => "detector",
            TileMode::Classifier => "clf",
        }
    }

    fn output_side(self, cfg: &Config) -> u32 {
        match self {
            TileMode::Detector => cfg.detector_size,
            TileMode::Classifier => cfg.clf_size,
        }
    }
}

/// Enumerate every window over a scene with the boxes each one fully
/// contains, already re-expressed tile-locally. Partially-intersecting
/// boxes are dropped, never clipped.
pub fn tile_plan(
    boxes: &[SceneBox],
    scene_w: u32,
    scene_h: u32,
    size: u32,
    stride: u32,
) -> Result<Vec<(Window, Vec<TileBox>)>> {
    windows(scene_w, scene_h, size, stride)
        .into_iter()
        .map(|win| {
            let kept = boxes
                .iter()
                .filter(|b| win.contains(b))
                .map(|b| win.localize(b))
                .collect::<Result<Vec<_>>>()?;
            Ok((win, kept))
        })
        .collect()
}

/// Derive all tiles for one scene. Returns the number of emitted tiles.
pub fn derive_scene(
    scene: &RgbaImage,
    boxes: &[SceneBox],
    stem: &str,
    mode: TileMode,
    cfg: &Config,
    images_dir: &Path,
    manifest: &Path,
) -> Result<usize> {
    let plan = tile_plan(
        boxes,
        scene.width(),
        scene.height(),
        cfg.crop_size,
        cfg.stride(),
    )?;
    let side = mode.output_side(cfg);

    match mode {
        TileMode::Detector => {
            let mut emitted = 0;
            for (win, kept) in plan {
                if kept.is_empty() {
                    continue;
                }
                let tile = cut(scene, win, side);
                let name = format!("{stem}_crop{emitted}");
                let img_path = images_dir.join(format!("{name}.png"));
                tile.save(&img_path)?;

                let norm: Vec<_> = kept
                    .into_iter()
                    .map(|b| b.normalize(cfg.crop_size))
                    .collect();
                labels::write_detector_labels(&images_dir.join(format!("{name}.txt")), &norm)?;
                labels::append_manifest(manifest, &std::path::absolute(&img_path)?)?;
                emitted += 1;
            }
            Ok(emitted)
        }
        TileMode::Classifier => {
            let mut targets = Vec::new();
            let mut backgrounds = Vec::new();
            for (k, (win, kept)) in plan.into_iter().enumerate() {
                let tile = cut(scene, win, side);
                if kept.is_empty() {
                    backgrounds.push((tile, format!("{stem}_{k}_background.png")));
                } else {
                    targets.push((tile, format!("{stem}_{k}_target.png")));
                }
            }

            // Balance the two populations per scene. The truncation of
            // the larger side is shuffled (seeded by the scene stem) so
            // kept backgrounds carry no systematic spatial bias.
            let n = targets.len().min(backgrounds.len());
            let mut rng = schedule::stream(&format!("clf-balance/{stem}"));
            backgrounds.shuffle(&mut rng);
            targets.shuffle(&mut rng);

            for (tile, name) in targets.into_iter().take(n).chain(backgrounds.into_iter().take(n))
            {
                let img_path = images_dir.join(&name);
                tile.save(&img_path)?;
                labels::append_manifest(manifest, &std::path::absolute(&img_path)?)?;
            }
            Ok(2 * n)
        }
    }
}

fn cut(scene: &RgbaImage, win: Window, out_side: u32) -> RgbaImage {
    let tile = imageops::crop_imm(scene, win.x, win.y, win.size, win.size).to_image();
    imageops::resize(&tile, out_side, out_side, FilterType::CatmullRom)
}

/// Tile every scene of a partition into `{mode}_{partition}` datasets.
pub fn derive_partition(partition: &str, mode: TileMode, cfg: &Config) -> Result<()> {
    let src = cfg.data_dir.join(partition).join("images");
    let mut scenes = list_files(&src, &["png"]);
    scenes.sort();
    if scenes.is_empty() {
        return Err(GenError::MissingAssets {
            kind: "scene",
            dir: src,
        });
    }

    let out_name = format!("{}_{partition}", mode.prefix());
    let images_dir = cfg.data_dir.join(&out_name).join("images");
    fs::create_dir_all(&images_dir)?;
    let manifest = cfg
        .data_dir
        .join(&out_name)
        .join(format!("{out_name}_list.txt"));
    fs::File::create(&manifest)?;

    info!("tiling {} scenes into {out_name}", scenes.len());
    pool::parallel_map("Cropping", cfg.workers, scenes, |path| {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("scene")
            .to_string();
        let img = image::open(&path)?.to_rgba8();
        let boxes = labels::read_scene_labels(&path.with_extension("txt"))?;
        derive_scene(&img, &boxes, &stem, mode, cfg, &images_dir, &manifest)?;
        if cfg.delete_on_convert {
            fs::remove_file(&path)?;
            fs::remove_file(path.with_extension("txt"))?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn test_cfg() -> Config {
        Config {
            crop_size: 300,
            crop_overlap: 100,
            detector_size: 608,
            clf_size: 64,
            ..Config::default()
        }
    }

    fn gray_scene(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([90, 90, 90, 255]))
    }

    fn boxed(label: &str, x: u32, y: u32, w: u32, h: u32) -> SceneBox {
        SceneBox {
            label: label.to_string(),
            x,
            y,
            w,
            h,
        }
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("targetgen-tile-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn partial_boxes_never_leak_into_any_tile() {
        // 900x600 scene, 300px window, 200px stride -> windows at
        // x in {0, 200, 400}, y = 0.
        let straddler = boxed("circle_A", 150, 50, 200, 100);
        let plan = tile_plan(&[straddler], 900, 600, 300, 200).unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|(_, kept)| kept.is_empty()));
    }

    #[test]
    fn contained_box_lands_in_exactly_one_tile() {
        let inside = boxed("star_7", 250, 50, 100, 100);
        let plan = tile_plan(&[inside], 900, 600, 300, 200).unwrap();
        let hits: Vec<_> = plan.iter().filter(|(_, kept)| !kept.is_empty()).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.x, 200);
        let b = hits[0].1[0];
        assert_eq!((b.x, b.y), (50, 50));
        assert_eq!(b.class, 7);
    }

    #[test]
    fn detector_mode_drops_empty_tiles_and_normalizes() {
        let dir = temp_dir("det");
        let images = dir.join("images");
        fs::create_dir_all(&images).unwrap();
        let manifest = dir.join("list.txt");
        let cfg = test_cfg();

        let scene = gray_scene(900, 600);
        let boxes = vec![boxed("circle_A", 250, 50, 100, 100)];
        let emitted =
            derive_scene(&scene, &boxes, "ex0", TileMode::Detector, &cfg, &images, &manifest)
                .unwrap();
        assert_eq!(emitted, 1);

        let label_text = fs::read_to_string(images.join("ex0_crop0.txt")).unwrap();
        let fields: Vec<f64> = label_text
            .split_whitespace()
            .skip(1)
            .map(|f| f.parse().unwrap())
            .collect();
        assert_eq!(fields.len(), 4);
        assert!(fields.iter().all(|v| (0.0..=1.0).contains(v)));

        let manifest_text = fs::read_to_string(&manifest).unwrap();
        assert_eq!(manifest_text.lines().count(), 1);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn classifier_mode_emits_balanced_classes() {
        let dir = temp_dir("clf");
        let images = dir.join("images");
        fs::create_dir_all(&images).unwrap();
        let manifest = dir.join("list.txt");
        let cfg = test_cfg();

        // One of three windows contains the box, so one target and two
        // raw backgrounds; balancing truncates backgrounds to one.
        let scene = gray_scene(900, 600);
        let boxes = vec![boxed("circle_A", 250, 50, 100, 100)];
        let emitted = derive_scene(
            &scene,
            &boxes,
            "ex1",
            TileMode::Classifier,
            &cfg,
            &images,
            &manifest,
        )
        .unwrap();
        assert_eq!(emitted, 2);

        let names: Vec<String> = fs::read_dir(&images)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        let targets = names.iter().filter(|n| n.contains("_target")).count();
        let backgrounds = names.iter().filter(|n| n.contains("_background")).count();
        assert_eq!(targets, 1);
        assert_eq!(backgrounds, 1);
        assert_eq!(fs::read_to_string(&manifest).unwrap().lines().count(), 2);
        fs::remove_dir_all(&dir).unwrap();
    }
}
