use crate::image::Image;

/// Box blur over a `(2 * radius + 1)²` window with edge clamping.
///
/// Each output sample is the truncated integer mean of its window, computed
/// per channel. Non-positive radii return the input unchanged.
pub fn blur(img: &Image, radius: i32) -> Image {
    if radius <= 0 {
        return img.clone();
    }
    let (width, height) = img.dimensions();
    let channels = img.channels() as usize;
    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;
    let r = radius as i64;
    let count = window_area(radius);

    img.map_rows(|y, row| {
        let y = y as i64;
        for x in 0..width as i64 {
            for c in 0..channels {
                let mut sum = 0u128;
                for ky in -r..=r {
                    let src_row = img.row((y + ky).clamp(0, max_y) as u32);
                    for kx in -r..=r {
                        let nx = (x + kx).clamp(0, max_x) as usize;
                        sum += src_row[nx * channels + c] as u128;
                    }
                }
                row[x as usize * channels + c] = (sum / count) as u8;
            }
        }
    })
}

/// Sample count of a `(2 * radius + 1)²` window. Wide enough for any `i32`.
fn window_area(radius: i32) -> u128 {
    let side = 2 * radius.max(0) as u128 + 1;
    side * side
}

/// Inverts every sample (`255 - v`), alpha included.
pub fn invert(img: &Image) -> Image {
    img.map_samples(|v| 255 - v)
}
