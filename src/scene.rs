use image::{RgbaImage, imageops};
use imageproc::filter::gaussian_blur_f32;

use crate::assets::AssetCatalog;
use crate::error::Result;
use crate::geom::SceneBox;
use crate::shape::{ShapeSpec, compose};

/// One full training scene, fully resolved before rendering begins.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSpec {
    pub index: usize,
    /// Index into the catalog's backgrounds.
    pub background: usize,
    pub flip: bool,
    pub mirror: bool,
    pub blur: f32,
    pub shapes: Vec<ShapeSpec>,
}

/// Render a scene: composite each shape onto the (possibly flipped)
/// background and record its bounding box.
///
/// Blur is applied to the pasted patch only, so shape edges blend into
/// the background without softening the whole scene. Shapes are applied
/// in order; a later shape occludes earlier pixels, but boxes are
/// recorded pre-occlusion.
pub fn render(spec: &SceneSpec, catalog: &AssetCatalog) -> Result<(RgbaImage, Vec<SceneBox>)> {
    let mut bg = catalog.backgrounds[spec.background].clone();
    if spec.flip {
        bg = imageops::flip_vertical(&bg);
    }
    if spec.mirror {
        bg = imageops::flip_horizontal(&bg);
    }

    let mut boxes = Vec::with_capacity(spec.shapes.len());
    for shape in &spec.shapes {
        let img = compose(shape, catalog)?;
        let (w, h) = img.dimensions();

        // Rotation can grow the cropped content past the drawn size;
        // clamp so the placement region stays inside the scene.
        let x = shape.x.min(bg.width().saturating_sub(w));
        let y = shape.y.min(bg.height().saturating_sub(h));

        let mut patch = imageops::crop_imm(&bg, x, y, w, h).to_image();
        imageops::overlay(&mut patch, &img, 0, 0);
        let patch = gaussian_blur_f32(&patch, spec.blur);
        imageops::replace(&mut bg, &patch, x as i64, y as i64);

        boxes.push(SceneBox {
            label: shape.label(),
            x,
            y,
            w,
            h,
        });
    }

    Ok((bg, boxes))
}
