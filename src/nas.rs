//! Distractor ("not a shape") extraction.
//!
//! Carves small clutter crops out of natural photographs by contour
//! detection. The crops feed the classifier corpus as negative
//! examples; no state is carried across input files, so a stopped run
//! restarts cleanly on the next file.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbaImage, imageops};
use imageproc::contours::{BorderType, find_contours};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::geometry::arc_length;
use imageproc::morphology::{dilate, erode};
use imageproc::point::Point;
use log::{info, warn};

use crate::assets::list_files;
use crate::config::Config;
use crate::error::{GenError, Result};

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 200.0;

/// Joint acceptance thresholds for a candidate blob. All three must
/// hold: an area ceiling, a perimeter-to-area bound that rejects thin
/// wiry contours, and a minimum crop dimension.
#[derive(Debug, Clone, Copy)]
pub struct BlobPolicy {
    pub max_area: f64,
    pub max_perimeter_ratio: f64,
    pub min_dim: u32,
    pub padding: u32,
}

impl Default for BlobPolicy {
    fn default() -> Self {
        Self {
            max_area: 5000.0,
            max_perimeter_ratio: 0.5,
            min_dim: 30,
            padding: 10,
        }
    }
}

pub fn accept(policy: &BlobPolicy, area: f64, perimeter: f64, crop_w: u32, crop_h: u32) -> bool {
    area < policy.max_area
        && perimeter < area * policy.max_perimeter_ratio
        && crop_w > policy.min_dim
        && crop_h > policy.min_dim
}

/// Extract accepted blob crops from one photograph.
///
/// Edge detection, one dilation and one erosion pass to close small
/// gaps, binarize, then external contours only; nested contours are
/// ignored.
pub fn extract_blobs(img: &RgbaImage, policy: &BlobPolicy) -> Vec<RgbaImage> {
    let gray = imageops::grayscale(img);
    let edges = canny(&gray, CANNY_LOW, CANNY_HIGH);
    let closed = erode(&dilate(&edges, Norm::LInf, 1), Norm::LInf, 1);
    let binary = threshold(&closed, 127, ThresholdType::Binary);

    let mut blobs = Vec::new();
    for contour in find_contours::<i32>(&binary) {
        if contour.border_type != BorderType::Outer {
            continue;
        }
        let Some((x, y, w, h)) = bounding_rect(&contour.points) else {
            continue;
        };

        let x1 = x.saturating_sub(policy.padding);
        let y1 = y.saturating_sub(policy.padding);
        let x2 = (x + w + policy.padding).min(img.width());
        let y2 = (y + h + policy.padding).min(img.height());
        let (crop_w, crop_h) = (x2 - x1, y2 - y1);

        let area = contour_area(&contour.points);
        let perimeter = arc_length(&contour.points, true);
        if accept(policy, area, perimeter, crop_w, crop_h) {
            blobs.push(imageops::crop_imm(img, x1, y1, crop_w, crop_h).to_image());
        }
    }
    blobs
}

fn bounding_rect(points: &[Point<i32>]) -> Option<(u32, u32, u32, u32)> {
    let first = points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Some((
        x0.max(0) as u32,
        y0.max(0) as u32,
        (x1 - x0 + 1) as u32,
        (y1 - y0 + 1) as u32,
    ))
}

/// Shoelace area of the contour polygon.
fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0i64;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        acc += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    acc.abs() as f64 / 2.0
}

/// Extract distractor crops from every photograph in the NAS asset
/// directory until the configured count is reached. Exhausting the
/// corpus first is a shortfall, not an error.
pub fn run_nas(cfg: &Config) -> Result<()> {
    let src = cfg.nas_images_dir();
    let mut files = list_files(&src, &["jpg", "jpeg", "png"]);
    files.sort();
    if files.is_empty() {
        return Err(GenError::MissingAssets {
            kind: "nas image",
            dir: src,
        });
    }

    let out_dir = cfg.shapes_dir.join("nas");
    fs::create_dir_all(&out_dir)?;
    let policy = BlobPolicy {
        padding: cfg.nas_padding,
        ..BlobPolicy::default()
    };

    let mut produced = 0usize;
    'files: for file in &files {
        let img = image::open(file)?.to_rgba8();
        for blob in extract_blobs(&img, &policy) {
            if produced == cfg.nas_count {
                break 'files;
            }
            save_jpeg(&blob, &out_dir.join(format!("nas-{produced:06}.jpg")))?;
            produced += 1;
        }
    }

    if produced < cfg.nas_count {
        warn!(
            "only {produced} of {} distractor crops could be extracted",
            cfg.nas_count
        );
    } else {
        info!("extracted {produced} distractor crops");
    }
    Ok(())
}

/// The `blobs` subcommand: same acceptance-policy shape, but over
/// already-rendered images with caller-supplied thresholds.
pub fn run_blobs(
    inputs: &[PathBuf],
    output: &Path,
    min_width: u32,
    limit: usize,
    padding: u32,
) -> Result<()> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
        } else if input.is_dir() {
            let mut found = list_files(input, &["png"]);
            found.sort();
            files.extend(found);
        } else {
            return Err(GenError::MissingAssets {
                kind: "input image",
                dir: input.clone(),
            });
        }
    }
    if files.is_empty() {
        return Err(GenError::MissingAssets {
            kind: "input image",
            dir: output.to_path_buf(),
        });
    }

    fs::create_dir_all(output)?;
    let policy = BlobPolicy {
        min_dim: min_width,
        padding,
        ..BlobPolicy::default()
    };

    let mut blob_num = 0usize;
    for file in &files {
        let img = image::open(file)?.to_rgba8();
        for blob in extract_blobs(&img, &policy).into_iter().take(limit) {
            let name = format!("blob-{blob_num:06}.png");
            info!("saving blob {name} from {}", file.display());
            blob.save(output.join(name))?;
            blob_num += 1;
        }
    }
    info!("saved {blob_num} blobs");
    Ok(())
}

fn save_jpeg(img: &RgbaImage, path: &Path) -> Result<()> {
    DynamicImage::ImageRgba8(img.clone()).to_rgb8().save(path)?;
    Ok(())
}
