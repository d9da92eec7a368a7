//! Regions of interest: shapes, geometry, and the two region-set formats.
//!
//! - [`Region`] is the shape model shared by every analysis command.
//! - [`geometry`] and [`lengths`] hold the measurement primitives.
//! - [`svg`] reads region sets drawn in SVG editors.
//! - [`io_binary`] reads and writes the binary region-set stream.

mod coord;
pub mod geometry;
pub mod io_binary;
pub mod lengths;
mod region;
pub mod svg;
pub mod svg_path;
pub mod transform;

pub use coord::Coord;
pub use region::{Region, LINE_TOLERANCE};
