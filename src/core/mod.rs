//! Core coordinate types.
//!
//! - [`Cell`]: integer grid cell with its spatial key and packed form
//! - [`WorldBounds`]: horizontal border and valid vertical range

mod bounds;
mod cell;

pub use bounds::WorldBounds;
pub use cell::{Cell, spatial_key};
