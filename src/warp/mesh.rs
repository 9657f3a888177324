use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::image::Image;

use super::importance::build_importance;
use super::{CellLayout, Grid, MeshParams};

/// Source-space position of a warped vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Radial scale for normalized radius `r` (clamped into the configured range)
/// multiplied by the vertex importance.
pub fn warp_scale(r: f64, importance: f64, params: &MeshParams) -> f64 {
    let r = r.clamp(params.min_radius, params.max_radius);
    (1.0 + r).ln() / (r + params.scale_epsilon) * importance
}

/// Maps a target-canvas vertex into the `src_width x src_height` panorama.
///
/// The offset from the panorama center is scaled by [`warp_scale`] and the
/// result is clamped onto the image.
pub fn warp_vertex(
    target_x: f64,
    target_y: f64,
    canvas_width: u32,
    src_width: u32,
    src_height: u32,
    importance: f64,
    params: &MeshParams,
) -> Point {
    let w = src_width as f64;
    let h = src_height as f64;
    let x = target_x * w / canvas_width as f64;
    let y = target_y;
    let (cx, cy) = (w / 2.0, h / 2.0);
    let dx = (x - cx) / w;
    let dy = (y - cy) / h;
    let scale = warp_scale((dx * dx + dy * dy).sqrt(), importance, params);
    Point {
        x: (cx + scale * dx * w).clamp(0.0, w - 1.0),
        y: (cy + scale * dy * h).clamp(0.0, h - 1.0),
    }
}

/// Warped positions for every vertex of `layout`.
pub fn build_mesh(
    layout: &CellLayout,
    src_width: u32,
    src_height: u32,
    importance: &Grid<f64>,
    params: &MeshParams,
) -> Grid<Point> {
    let mut mesh = Grid::filled(layout.grid_rows, layout.grid_cols, Point::default());
    for row in 0..=layout.grid_rows {
        let y = layout.vertex_y(row) as f64;
        for col in 0..=layout.grid_cols {
            let x = layout.vertex_x(col) as f64;
            let (r, c) = (row as usize, col as usize);
            *mesh.get_mut(r, c) = warp_vertex(
                x,
                y,
                layout.width,
                src_width,
                src_height,
                *importance.get(r, c),
                params,
            );
        }
    }
    mesh
}

fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point {
        x: a.x + (b.x - a.x) * t,
        y: a.y + (b.y - a.y) * t,
    }
}

/// Fills the target canvas by position-interpolated nearest-sample lookup.
///
/// Within each cell the four warped corners are blended bilinearly to get a
/// source location, which is clamped and truncated to pick the source pixel.
/// Pixels past the last whole cell extrapolate from the last cell's corners.
/// Colors are copied as is, so seams between cells are expected.
pub fn resample(source: &Image, layout: &CellLayout, mesh: &Grid<Point>) -> Result<Image> {
    let channels = source.channels() as usize;
    let max_x = source.width() as f64 - 1.0;
    let max_y = source.height() as f64 - 1.0;

    Image::from_rows(layout.width, layout.height, source.channels(), |y, row| {
        let (cell_row, alpha_y) = layout.locate_y(y);
        let r = cell_row as usize;

        for x in 0..layout.width {
            let (cell_col, alpha_x) = layout.locate_x(x);
            let c = cell_col as usize;

            let top = lerp(*mesh.get(r, c), *mesh.get(r, c + 1), alpha_x);
            let bottom = lerp(*mesh.get(r + 1, c), *mesh.get(r + 1, c + 1), alpha_x);
            let p = lerp(top, bottom, alpha_y);

            let sx = p.x.clamp(0.0, max_x) as u32;
            let sy = p.y.clamp(0.0, max_y) as u32;
            if let Some(src) = source.pixel(sx, sy) {
                let dst = x as usize * channels;
                row[dst..dst + channels].copy_from_slice(src);
            }
        }
    })
}

/// Dewarps `panorama` into a 9:1 canvas of the same height, protecting the
/// regions marked bright in `mask`.
pub fn apply_projection(panorama: &Image, mask: &Image) -> Result<Image> {
    apply_projection_with(panorama, mask, &MeshParams::default())
}

#[instrument(skip_all, fields(width = panorama.width(), height = panorama.height()))]
pub fn apply_projection_with(
    panorama: &Image,
    mask: &Image,
    params: &MeshParams,
) -> Result<Image> {
    let (src_width, src_height) = panorama.dimensions();
    let layout = CellLayout::for_panorama(src_height, params)?;
    let importance = build_importance(panorama.dimensions(), &layout, mask, params)?;
    let mesh = build_mesh(&layout, src_width, src_height, &importance, params);
    debug!(
        cell_width = layout.cell_width,
        cell_height = layout.cell_height,
        "mesh built"
    );

    let out = resample(panorama, &layout, &mesh)?;
    info!(
        out_width = out.width(),
        out_height = out.height(),
        "projection applied"
    );
    Ok(out)
}
