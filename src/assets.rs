use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc};
use image::{RgbaImage, imageops, imageops::FilterType};
use log::info;

use crate::config::Config;
use crate::error::{GenError, Result};
use crate::shape::{GLYPHS, SHAPE_KINDS, ShapeKind};

/// Read-only asset catalog: backgrounds, per-kind base silhouettes and
/// fonts, loaded once before generation begins and shared immutably by
/// every worker afterwards.
pub struct AssetCatalog {
    pub backgrounds: Vec<RgbaImage>,
    bases: BTreeMap<ShapeKind, Vec<RgbaImage>>,
    pub fonts: Vec<FontArc>,
}

impl AssetCatalog {
    pub fn load(cfg: &Config) -> Result<Self> {
        let backgrounds = load_images(&cfg.backgrounds_dir(), "background")?;

        let mut bases = BTreeMap::new();
        for kind in SHAPE_KINDS {
            let dir = cfg.base_shapes_dir().join(kind.as_str());
            bases.insert(kind, load_images(&dir, "base shape")?);
        }

        let fonts = load_fonts(&cfg.fonts_dir())?;
        info!(
            "catalog loaded: {} backgrounds, {} fonts",
            backgrounds.len(),
            fonts.len()
        );

        Ok(Self {
            backgrounds,
            bases,
            fonts,
        })
    }

    pub fn bases(&self, kind: ShapeKind) -> &[RgbaImage] {
        // Every kind is validated non-empty at load time.
        &self.bases[&kind]
    }

    /// Pre-size all backgrounds to the full scene dimensions. Done once
    /// by the scene driver so workers only clone.
    pub fn resize_backgrounds(&mut self, w: u32, h: u32) {
        for bg in &mut self.backgrounds {
            if bg.dimensions() != (w, h) {
                *bg = imageops::resize(bg, w, h, FilterType::Triangle);
            }
        }
    }
}

/// Sorted decode of every png/jpg in a directory; empty is fatal.
fn load_images(dir: &Path, kind: &'static str) -> Result<Vec<RgbaImage>> {
    let mut paths = list_files(dir, &["png", "jpg", "jpeg"]);
    paths.sort();
    if paths.is_empty() {
        return Err(GenError::MissingAssets {
            kind,
            dir: dir.to_path_buf(),
        });
    }
    paths
        .iter()
        .map(|p| Ok(image::open(p)?.to_rgba8()))
        .collect()
}

fn load_fonts(dir: &Path) -> Result<Vec<FontArc>> {
    let mut paths = list_files(dir, &["ttf", "otf"]);
    paths.sort();

    let mut fonts = Vec::new();
    for path in paths {
        let bytes = fs::read(&path)?;
        let font = FontArc::try_from_vec(bytes).map_err(|_| GenError::BadFont(path.clone()))?;
        // A font without full glyph coverage is a broken asset.
        if GLYPHS.iter().any(|&ch| font.glyph_id(ch).0 == 0) {
            return Err(GenError::BadFont(path));
        }
        fonts.push(font);
    }

    if fonts.is_empty() {
        return Err(GenError::MissingAssets {
            kind: "font",
            dir: dir.to_path_buf(),
        });
    }
    Ok(fonts)
}

pub fn list_files(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .ok()
        .into_iter()
        .flat_map(|rd| rd.filter_map(|e| e.ok()))
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_backgrounds_are_fatal() {
        let cfg = Config {
            assets_dir: PathBuf::from("/nonexistent-targetgen-assets"),
            ..Config::default()
        };
        match AssetCatalog::load(&cfg).err() {
            Some(GenError::MissingAssets { kind, .. }) => assert_eq!(kind, "background"),
            other => panic!("expected missing-asset error, got {other:?}"),
        }
    }

    #[test]
    fn list_files_ignores_other_extensions() {
        let dir = std::env::temp_dir().join(format!("targetgen-list-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.png"), b"x").unwrap();
        fs::write(dir.join("b.txt"), b"x").unwrap();
        let found = list_files(&dir, &["png"]);
        assert_eq!(found.len(), 1);
        fs::remove_dir_all(&dir).unwrap();
    }
}
