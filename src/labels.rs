use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{GenError, Result};
use crate::geom::{NormBox, SceneBox};

/// Write a scene's label sidecar: one `label x y width height` line per
/// box, integer scene-absolute pixels, no header.
pub fn write_scene_labels(path: &Path, boxes: &[SceneBox]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    for b in boxes {
        writeln!(w, "{} {} {} {} {}", b.label, b.x, b.y, b.w, b.h)?;
    }
    w.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(())
}

/// Parse a scene sidecar. Any malformed line is fatal: it signals an
/// upstream generation bug, so no partial recovery is attempted.
pub fn read_scene_labels(path: &Path) -> Result<Vec<SceneBox>> {
    let reader = BufReader::new(File::open(path)?);
    let mut boxes = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        boxes.push(parse_line(&line).map_err(|reason| GenError::MalformedLabel {
            path: path.to_path_buf(),
            line: i + 1,
            reason,
        })?);
    }
    Ok(boxes)
}

fn parse_line(line: &str) -> std::result::Result<SceneBox, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(format!("expected 5 fields, found {}", fields.len()));
    }
    let num = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| format!("bad coordinate {s:?}"))
    };
    Ok(SceneBox {
        label: fields[0].to_string(),
        x: num(fields[1])?,
        y: num(fields[2])?,
        w: num(fields[3])?,
        h: num(fields[4])?,
    })
}

/// Write a tile's detector labels: `class cx cy w h`, normalized.
pub fn write_detector_labels(path: &Path, boxes: &[NormBox]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    for b in boxes {
        writeln!(
            w,
            "{} {:.6} {:.6} {:.6} {:.6}",
            b.class, b.cx, b.cy, b.w, b.h
        )?;
    }
    w.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(())
}

/// Append one path to a dataset manifest. The handle is opened and
/// closed per call so concurrent workers interleave whole lines only.
pub fn append_manifest(manifest: &Path, entry: &Path) -> Result<()> {
    let mut f = OpenOptions::new().create(true).append(true).open(manifest)?;
    writeln!(f, "{}", entry.display())?;
    Ok(())
}
