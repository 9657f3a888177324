use crate::image::Image;

const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

fn luma(r: f64, g: f64, b: f64) -> f64 {
    LUMA_R * r + LUMA_G * g + LUMA_B * b
}

/// Replaces R, G and B with their BT.601 luma. Alpha is carried over.
/// Images with fewer than three channels are returned unchanged.
pub fn grayscale(img: &Image) -> Image {
    if img.channels() < 3 {
        return img.clone();
    }
    img.map_pixels(|src, dst| {
        let gray = luma(src[0] as f64, src[1] as f64, src[2] as f64) as u8;
        dst[..3].fill(gray);
        dst[3..].copy_from_slice(&src[3..]);
    })
}

/// Pushes each color channel away from (or toward) the pixel's luma.
///
/// `1.0` keeps the image as is and `0.0` collapses every pixel to its luma.
/// Results are truncated, not rounded, back to 8 bits.
pub fn saturation(img: &Image, saturation: f32) -> Image {
    if img.channels() < 3 || saturation == 1.0 {
        return img.clone();
    }
    let saturation = saturation as f64;
    img.map_pixels(|src, dst| {
        let r = src[0] as f64 / 255.0;
        let g = src[1] as f64 / 255.0;
        let b = src[2] as f64 / 255.0;
        let gray = luma(r, g, b);
        for (c, v) in [r, g, b].into_iter().enumerate() {
            let adjusted = (gray + (v - gray) * saturation).clamp(0.0, 1.0);
            dst[c] = (adjusted * 255.0) as u8;
        }
        dst[3..].copy_from_slice(&src[3..]);
    })
}

/// Shifts white balance: positive values warm (more red, less blue),
/// negative values cool. Green and alpha are untouched.
pub fn temperature(img: &Image, temperature: i32) -> Image {
    if img.channels() < 3 {
        return img.clone();
    }
    img.map_pixels(|src, dst| {
        dst.copy_from_slice(src);
        dst[0] = (src[0] as i32).saturating_add(temperature).clamp(0, 255) as u8;
        dst[2] = (src[2] as i32).saturating_sub(temperature).clamp(0, 255) as u8;
    })
}
