use crate::error::{GenError, Result};
use crate::shape::ShapeKind;

/// Bounding box in absolute scene pixels. `label` is `{kind}_{glyph}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneBox {
    pub label: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl SceneBox {
    /// Detector class index for this box's shape kind.
    pub fn class_index(&self) -> Result<usize> {
        let (kind, _) = self
            .label
            .rsplit_once('_')
            .ok_or_else(|| GenError::UnknownShape(self.label.clone()))?;
        ShapeKind::parse(kind)
            .map(ShapeKind::class_index)
            .ok_or_else(|| GenError::UnknownShape(self.label.clone()))
    }
}

/// Bounding box re-expressed in tile-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBox {
    pub class: usize,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl TileBox {
    /// Normalized center/size form relative to a square tile of `side`
    /// pixels. All four values land in `[0, 1]` for a contained box.
    pub fn normalize(self, side: u32) -> NormBox {
        let s = side as f64;
        NormBox {
            class: self.class,
            cx: (self.x as f64 + self.w as f64 / 2.0) / s,
            cy: (self.y as f64 + self.h as f64 / 2.0) / s,
            w: self.w as f64 / s,
            h: self.h as f64 / s,
        }
    }
}

/// Normalized detector label: center x/y and width/height in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormBox {
    pub class: usize,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

/// One sliding-window position over a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl Window {
    /// Strict containment on all four edges. A box touching a window
    /// border is not contained; partial boxes are never clipped.
    pub fn contains(&self, b: &SceneBox) -> bool {
        self.x < b.x
            && b.x + b.w < self.x + self.size
            && self.y < b.y
            && b.y + b.h < self.y + self.size
    }

    /// Re-express a contained box in this window's local frame.
    pub fn localize(&self, b: &SceneBox) -> Result<TileBox> {
        Ok(TileBox {
            class: b.class_index()?,
            x: b.x - self.x,
            y: b.y - self.y,
            w: b.w,
            h: b.h,
        })
    }
}

/// Row-major window positions. Starts run strictly below `dim - size`,
/// so trailing remainder pixels are dropped and a scene not strictly
/// larger than one window yields no tiles.
pub fn windows(scene_w: u32, scene_h: u32, size: u32, stride: u32) -> Vec<Window> {
    let mut out = Vec::new();
    if scene_w <= size || scene_h <= size || stride == 0 {
        return out;
    }
    let mut y = 0;
    while y < scene_h - size {
        let mut x = 0;
        while x < scene_w - size {
            out.push(Window { x, y, size });
            x += stride;
        }
        y += stride;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle_box(x: u32, y: u32, side: u32) -> SceneBox {
        SceneBox {
            label: "circle_A".to_string(),
            x,
            y,
            w: side,
            h: side,
        }
    }

    #[test]
    fn class_index_parses_hyphenated_kinds() {
        let b = SceneBox {
            label: "quarter-circle_7".to_string(),
            x: 0,
            y: 0,
            w: 1,
            h: 1,
        };
        assert_eq!(b.class_index().unwrap(), 3);
        assert!(circle_box(0, 0, 1).class_index().unwrap() == 0);
        let bad = SceneBox {
            label: "blob".to_string(),
            x: 0,
            y: 0,
            w: 1,
            h: 1,
        };
        assert!(bad.class_index().is_err());
    }

    #[test]
    fn boxes_touching_window_edges_are_rejected() {
        let win = Window { x: 100, y: 100, size: 200 };
        assert!(win.contains(&circle_box(150, 150, 50)));
        // touching left edge
        assert!(!win.contains(&circle_box(100, 150, 50)));
        // touching right edge
        assert!(!win.contains(&circle_box(250, 150, 50)));
        // straddling bottom edge
        assert!(!win.contains(&circle_box(150, 280, 50)));
    }

    #[test]
    fn normalized_values_stay_in_unit_range() {
        let win = Window { x: 300, y: 300, size: 400 };
        let b = circle_box(301, 598, 100);
        assert!(win.contains(&b));
        let n = win.localize(&b).unwrap().normalize(400);
        for v in [n.cx, n.cy, n.w, n.h] {
            assert!((0.0..=1.0).contains(&v));
        }
        assert!(n.cx - n.w / 2.0 >= 0.0);
        assert!(n.cy + n.h / 2.0 <= 1.0);
    }

    #[test]
    fn undersized_scene_yields_no_windows() {
        assert!(windows(400, 400, 400, 300).is_empty());
        assert!(windows(350, 800, 400, 300).is_empty());
    }

    // Worked example: 4240x2400 scene, 400px window, 100px overlap,
    // circle of size 45 at (1000, 1000) -> only the window at (900, 900)
    // fully contains it.
    #[test]
    fn single_window_contains_the_example_circle() {
        let wins = windows(4240, 2400, 400, 300);
        let b = circle_box(1000, 1000, 45);
        let hits: Vec<&Window> = wins.iter().filter(|w| w.contains(&b)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].x, hits[0].y), (900, 900));
    }

    #[test]
    fn windows_drop_trailing_remainder() {
        let wins = windows(1000, 700, 400, 300);
        // x starts: 0, 300; 600 is excluded because 600 == 1000 - 400.
        assert!(wins.iter().all(|w| w.x < 600 && w.y < 300));
        assert_eq!(wins.len(), 2);
    }
}
