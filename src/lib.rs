//! Pixel adjustments and importance-weighted panorama dewarping over an
//! owned 8-bit image buffer.

pub mod config;
pub mod error;
pub mod image;
pub mod processing;
pub mod state;
pub mod warp;

pub use crate::error::{ImageError, Result};
pub use crate::image::Image;
pub use crate::state::Adjustments;
pub use crate::warp::{MeshParams, apply_projection, apply_projection_with};
