use tracing::debug;

use crate::error::{ImageError, Result};
use crate::image::Image;

use super::{BASELINE_IMPORTANCE, CellLayout, Grid, MeshParams};

fn mask_luminance(px: &[u8]) -> f64 {
    0.2989 * px[0] as f64 + 0.5870 * px[1] as f64 + 0.1140 * px[2] as f64
}

/// Derives per-vertex importance weights from a mask the size of the panorama.
///
/// Each vertex samples the nearest mask pixel at its proportional position;
/// bright pixels (luminance above the threshold) mark salient vertices. One
/// 5-point smoothing pass then runs over interior vertices. That pass reads
/// neighbours from a snapshot taken before smoothing, so the result does not
/// depend on scan order.
pub fn build_importance(
    panorama: (u32, u32),
    layout: &CellLayout,
    mask: &Image,
    params: &MeshParams,
) -> Result<Grid<f64>> {
    if mask.dimensions() != panorama {
        return Err(ImageError::Precondition(format!(
            "mask is {}x{} but panorama is {}x{}",
            mask.width(),
            mask.height(),
            panorama.0,
            panorama.1
        )));
    }
    if mask.channels() < 3 {
        return Err(ImageError::Precondition(format!(
            "mask needs at least 3 channels for luminance, got {}",
            mask.channels()
        )));
    }

    let mut weights = Grid::filled(layout.grid_rows, layout.grid_cols, BASELINE_IMPORTANCE);
    let mut salient = 0usize;
    for row in 0..=layout.grid_rows {
        let mask_y = layout.vertex_y(row) as u64 * mask.height() as u64 / layout.height as u64;
        for col in 0..=layout.grid_cols {
            let mask_x = layout.vertex_x(col) as u64 * mask.width() as u64 / layout.width as u64;
            // Far-edge vertices of a whole-cell canvas fall outside the mask.
            let Some(px) = mask.pixel(mask_x as u32, mask_y as u32) else {
                continue;
            };
            if mask_luminance(px) > params.luminance_threshold {
                *weights.get_mut(row as usize, col as usize) = params.salient_importance;
                salient += 1;
            }
        }
    }

    let smoothed = smooth(&weights);
    debug!(
        salient,
        vertices = smoothed.values().len(),
        "importance map built"
    );
    Ok(smoothed)
}

/// One 5-point average over interior vertices, reading from `weights` only.
pub fn smooth(weights: &Grid<f64>) -> Grid<f64> {
    let mut out = weights.clone();
    let (rows, cols) = (weights.rows(), weights.cols());
    for row in 1..rows.saturating_sub(1) {
        for col in 1..cols.saturating_sub(1) {
            let sum = weights.get(row, col)
                + weights.get(row - 1, col)
                + weights.get(row + 1, col)
                + weights.get(row, col - 1)
                + weights.get(row, col + 1);
            *out.get_mut(row, col) = sum / 5.0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::error::ImageError;
    use crate::image::Image;
    use crate::warp::{CellLayout, Grid, MeshParams};

    use super::{build_importance, smooth};

    fn small_params() -> MeshParams {
        MeshParams {
            grid_rows: 4,
            grid_cols: 4,
            ..MeshParams::default()
        }
    }

    fn solid(width: u32, height: u32, value: u8) -> Image {
        Image::from_raw(vec![value; (width * height * 3) as usize], width, height, 3).unwrap()
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let params = small_params();
        let layout = CellLayout::for_panorama(8, &params).unwrap();
        let mask = solid(10, 8, 255);
        assert!(matches!(
            build_importance((12, 8), &layout, &mask, &params),
            Err(ImageError::Precondition(_))
        ));
    }

    #[test]
    fn gray_mask_is_rejected() {
        let params = small_params();
        let layout = CellLayout::for_panorama(8, &params).unwrap();
        let mask = Image::from_raw(vec![255; 12 * 8], 12, 8, 1).unwrap();
        assert!(matches!(
            build_importance((12, 8), &layout, &mask, &params),
            Err(ImageError::Precondition(_))
        ));
    }

    #[test]
    fn dark_mask_keeps_baseline() {
        let params = small_params();
        let layout = CellLayout::for_panorama(8, &params).unwrap();
        let weights = build_importance((12, 8), &layout, &solid(12, 8, 128), &params).unwrap();
        assert!(weights.values().iter().all(|&w| w == 1.0));
    }

    #[test]
    fn bright_mask_marks_in_range_vertices_salient() {
        let params = small_params();
        let layout = CellLayout::for_panorama(8, &params).unwrap();
        let weights = build_importance((12, 8), &layout, &solid(12, 8, 200), &params).unwrap();
        // Last row and column map past the mask edge and stay at baseline.
        assert_eq!(*weights.get(0, 0), 1.2);
        assert_eq!(*weights.get(0, 4), 1.0);
        assert_eq!(*weights.get(4, 0), 1.0);
        // Interior (3, 3) averages itself, two salient and two baseline neighbours.
        assert!((weights.get(3, 3) - (1.2 * 3.0 + 2.0) / 5.0).abs() < 1e-12);
        assert!((weights.get(1, 1) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn far_corner_is_sampled_when_canvas_has_remainder() {
        let params = MeshParams::default();
        let layout = CellLayout::for_panorama(150, &params).unwrap();
        let mask = solid(300, 150, 200);
        let weights = build_importance((300, 150), &layout, &mask, &params).unwrap();
        // Vertex (100, 100) sits at (1300, 100) and maps to mask pixel (288, 100).
        assert_eq!(*weights.get(100, 100), 1.2);
        assert_eq!(*weights.get(0, 100), 1.2);
    }

    #[test]
    fn smoothing_reads_pre_pass_snapshot() {
        let mut grid = Grid::filled(4, 4, 1.0);
        *grid.get_mut(1, 1) = 6.0;
        let out = smooth(&grid);
        // (1, 2) sees the original 6.0 at (1, 1), not the smoothed 2.0.
        assert!((out.get(1, 2) - 10.0 / 5.0).abs() < 1e-12);
        assert!((out.get(1, 1) - 10.0 / 5.0).abs() < 1e-12);
        assert!((out.get(2, 2) - 1.0).abs() < 1e-12);
        // Border vertices are never smoothed.
        assert_eq!(*out.get(0, 1), 1.0);
    }

    #[test]
    fn smoothing_is_transpose_symmetric() {
        let mut grid = Grid::filled(5, 5, 1.0);
        *grid.get_mut(2, 3) = 3.0;
        let mut transposed = Grid::filled(5, 5, 1.0);
        *transposed.get_mut(3, 2) = 3.0;
        let a = smooth(&grid);
        let b = smooth(&transposed);
        for r in 0..6 {
            for c in 0..6 {
                assert_eq!(a.get(r, c), b.get(c, r));
            }
        }
    }
}
