//! Importance-weighted mesh warp that dewarps a wide panorama into a
//! fixed-aspect canvas.
//!
//! The target canvas is split into a regular grid of cells. Every grid vertex
//! is mapped back into the panorama with a radial, log-attenuated scale that
//! is multiplied by a per-vertex importance weight taken from a mask image.
//! Output pixels are then reconstructed cell by cell by bilinearly blending
//! the four warped corners and sampling the nearest source pixel.

pub mod importance;
pub mod mesh;

use serde::{Deserialize, Serialize};

use crate::error::{ImageError, Result};

pub use importance::build_importance;
pub use mesh::{apply_projection, apply_projection_with};

pub const GRID_ROWS: u32 = 100;
pub const GRID_COLS: u32 = 100;
/// Target width:height ratio.
pub const ASPECT_RATIO: f64 = 9.0;
pub const MIN_RADIUS: f64 = 0.01;
pub const MAX_RADIUS: f64 = 0.5;
pub const SCALE_EPSILON: f64 = 0.01;
pub const LUMINANCE_THRESHOLD: f64 = 128.0;
pub const BASELINE_IMPORTANCE: f64 = 1.0;
pub const SALIENT_IMPORTANCE: f64 = 1.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Tunables for the projection. `Default` carries the stock constants.
pub struct MeshParams {
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub aspect_ratio: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    pub scale_epsilon: f64,
    pub luminance_threshold: f64,
    pub salient_importance: f64,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            grid_rows: GRID_ROWS,
            grid_cols: GRID_COLS,
            aspect_ratio: ASPECT_RATIO,
            min_radius: MIN_RADIUS,
            max_radius: MAX_RADIUS,
            scale_epsilon: SCALE_EPSILON,
            luminance_threshold: LUMINANCE_THRESHOLD,
            salient_importance: SALIENT_IMPORTANCE,
        }
    }
}

impl MeshParams {
    pub fn validate(&self) -> Result<()> {
        if self.grid_rows == 0 || self.grid_cols == 0 {
            return Err(ImageError::Precondition(format!(
                "grid must have at least one cell, got {}x{}",
                self.grid_rows, self.grid_cols
            )));
        }
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            return Err(ImageError::Precondition(format!(
                "aspect ratio must be positive, got {}",
                self.aspect_ratio
            )));
        }
        if !(self.min_radius > 0.0 && self.min_radius <= self.max_radius) {
            return Err(ImageError::Precondition(format!(
                "radius clamp must satisfy 0 < min <= max, got [{}, {}]",
                self.min_radius, self.max_radius
            )));
        }
        if self.scale_epsilon < 0.0 {
            return Err(ImageError::Precondition(format!(
                "scale epsilon must be non-negative, got {}",
                self.scale_epsilon
            )));
        }
        Ok(())
    }
}

/// Row-major `(rows + 1) x (cols + 1)` array of per-vertex values.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// A grid with `cell_rows x cell_cols` cells, so one more vertex per axis.
    pub fn filled(cell_rows: u32, cell_cols: u32, value: T) -> Self {
        let rows = cell_rows as usize + 1;
        let cols = cell_cols as usize + 1;
        Self {
            rows,
            cols,
            values: vec![value; rows * cols],
        }
    }
}

impl<T> Grid<T> {
    /// Vertex rows (cell rows + 1).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Vertex columns (cell columns + 1).
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.values[row * self.cols + col]
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        &mut self.values[row * self.cols + col]
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}

/// Target canvas and its integer cell partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLayout {
    pub width: u32,
    pub height: u32,
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl CellLayout {
    /// Canvas keeps the panorama height and takes `round(height * aspect)` as
    /// width. Cells are `width / grid_cols` by `height / grid_rows` pixels.
    /// When the canvas is not a whole number of cells, the strip past the last
    /// vertex belongs to the last cell row or column and extrapolates from it.
    pub fn for_panorama(panorama_height: u32, params: &MeshParams) -> Result<Self> {
        params.validate()?;
        let height = panorama_height;
        let width = (height as f64 * params.aspect_ratio).round() as u32;
        let cell_width = width / params.grid_cols;
        let cell_height = height / params.grid_rows;
        if cell_width == 0 || cell_height == 0 {
            return Err(ImageError::Precondition(format!(
                "canvas {}x{} is too small for a {}x{} grid (cell {}x{})",
                width, height, params.grid_cols, params.grid_rows, cell_width, cell_height
            )));
        }
        Ok(Self {
            width,
            height,
            grid_rows: params.grid_rows,
            grid_cols: params.grid_cols,
            cell_width,
            cell_height,
        })
    }

    /// Target-space x of vertex column `col`.
    pub fn vertex_x(&self, col: u32) -> u32 {
        col * self.cell_width
    }

    /// Target-space y of vertex row `row`.
    pub fn vertex_y(&self, row: u32) -> u32 {
        row * self.cell_height
    }

    /// Cell column containing target column `x`.
    pub fn cell_col(&self, x: u32) -> u32 {
        (x / self.cell_width).min(self.grid_cols - 1)
    }

    /// Cell row containing target row `y`.
    pub fn cell_row(&self, y: u32) -> u32 {
        (y / self.cell_height).min(self.grid_rows - 1)
    }

    /// Cell column of `x` and the cell-relative fraction across it.
    /// The fraction exceeds 1 inside the remainder strip.
    pub fn locate_x(&self, x: u32) -> (u32, f64) {
        let col = self.cell_col(x);
        let alpha = (x - self.vertex_x(col)) as f64 / self.cell_width as f64;
        (col, alpha)
    }

    /// Cell row of `y` and the cell-relative fraction down it.
    pub fn locate_y(&self, y: u32) -> (u32, f64) {
        let row = self.cell_row(y);
        let alpha = (y - self.vertex_y(row)) as f64 / self.cell_height as f64;
        (row, alpha)
    }
}
