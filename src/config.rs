use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{GenError, Result};

/// Run configuration. Every knob has a default matching the published
/// asset layout; a JSON file can override any subset of fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the pre-fetched, versioned asset trees.
    pub assets_dir: PathBuf,
    /// Output directory for the single-shape corpus.
    pub shapes_dir: PathBuf,
    /// Output directory for scenes, tiles and model artifacts.
    pub data_dir: PathBuf,

    pub backgrounds_version: String,
    pub base_shapes_version: String,
    pub nas_images_version: String,

    /// Single-shape corpus size per shape kind.
    pub num_shapes: usize,
    /// Scenes to generate per partition.
    pub num_images: usize,
    /// Exclusive upper bound on shapes placed per scene.
    pub max_per_shape: usize,

    pub full_width: u32,
    pub full_height: u32,
    pub crop_size: u32,
    pub crop_overlap: u32,
    pub detector_size: u32,
    pub clf_size: u32,

    pub scene_blur_min: u32,
    pub scene_blur_max: u32,

    pub nas_padding: u32,
    /// Total distractor crops to extract across all source images.
    pub nas_count: usize,

    /// Remove scene images and sidecars once tiles are derived.
    pub delete_on_convert: bool,

    /// Worker pool size; `None` uses all available cores.
    pub workers: Option<usize>,

    pub retrain_program: PathBuf,
    pub bottleneck_dir: PathBuf,
    pub graph_output: PathBuf,
    pub labels_output: PathBuf,
    pub training_steps: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            shapes_dir: PathBuf::from("shapes"),
            data_dir: PathBuf::from("data"),
            backgrounds_version: "v1".to_string(),
            base_shapes_version: "v1".to_string(),
            nas_images_version: "v1".to_string(),
            num_shapes: 5000,
            num_images: 100,
            max_per_shape: 4,
            full_width: 4240,
            full_height: 2400,
            crop_size: 400,
            crop_overlap: 100,
            detector_size: 608,
            clf_size: 64,
            scene_blur_min: 1,
            scene_blur_max: 2,
            nas_padding: 10,
            nas_count: 5000,
            delete_on_convert: false,
            workers: None,
            retrain_program: PathBuf::from("retrain"),
            bottleneck_dir: PathBuf::from("bottlenecks"),
            graph_output: PathBuf::from("data/graph.pb"),
            labels_output: PathBuf::from("data/labels.txt"),
            training_steps: 8000,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let cfg: Self = match path {
            Some(p) => {
                let raw = fs::read_to_string(p)?;
                serde_json::from_str(&raw)?
            }
            None => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Cross-field checks an override file can violate.
    fn validate(&self) -> Result<()> {
        if self.crop_overlap >= self.crop_size {
            return Err(GenError::BadConfig(format!(
                "crop_overlap {} must be smaller than crop_size {}",
                self.crop_overlap, self.crop_size
            )));
        }
        Ok(())
    }

    pub fn backgrounds_dir(&self) -> PathBuf {
        self.assets_dir
            .join(format!("backgrounds-{}", self.backgrounds_version))
    }

    pub fn base_shapes_dir(&self) -> PathBuf {
        self.assets_dir
            .join(format!("base-shapes-{}", self.base_shapes_version))
    }

    pub fn nas_images_dir(&self) -> PathBuf {
        self.assets_dir
            .join(format!("nas-images-{}", self.nas_images_version))
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.assets_dir.join("fonts")
    }

    pub fn stride(&self) -> u32 {
        self.crop_size - self.crop_overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let cfg = Config::default();
        assert!(cfg.crop_overlap < cfg.crop_size);
        assert_eq!(cfg.stride(), 300);
        assert!(cfg.scene_blur_min < cfg.scene_blur_max);
    }

    #[test]
    fn json_overrides_subset_of_fields() {
        let cfg: Config =
            serde_json::from_str(r#"{"num_images": 7, "crop_size": 200}"#).unwrap();
        assert_eq!(cfg.num_images, 7);
        assert_eq!(cfg.crop_size, 200);
        assert_eq!(cfg.crop_overlap, 100);
        assert_eq!(cfg.full_width, 4240);
    }

    #[test]
    fn overlap_not_smaller_than_crop_is_rejected() {
        let dir = std::env::temp_dir().join(format!("targetgen-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        fs::write(&path, r#"{"crop_size": 200, "crop_overlap": 200}"#).unwrap();
        match Config::load(Some(&path)).err() {
            Some(GenError::BadConfig(_)) => {}
            other => panic!("expected bad-config error, got {other:?}"),
        }
        fs::write(&path, r#"{"crop_size": 200, "crop_overlap": 50}"#).unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap().stride(), 150);
        fs::remove_dir_all(&dir).unwrap();
    }
}
