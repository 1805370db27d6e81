//! Synthetic training-imagery generation for a two-stage target
//! detection model: procedural scenes of alphanumeric-marked shapes on
//! photographic backgrounds, sliding-window tile derivation with
//! remapped bounding boxes, and contour-based distractor extraction.

pub mod assets;
pub mod color;
pub mod config;
pub mod error;
pub mod generate;
pub mod geom;
pub mod labels;
pub mod nas;
pub mod pool;
pub mod schedule;
pub mod scene;
pub mod shape;
pub mod tile;
pub mod train;

pub use config::Config;
pub use error::{GenError, Result};
