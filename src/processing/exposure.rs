use crate::image::Image;

/// Adds `brightness` to every sample, saturating at the 8-bit range.
pub fn brightness(img: &Image, brightness: i32) -> Image {
    img.map_samples(|v| (v as i32).saturating_add(brightness).clamp(0, 255) as u8)
}

/// Scales every sample's distance from mid-gray (128) by `contrast`.
pub fn contrast(img: &Image, contrast: f32) -> Image {
    img.map_samples(|v| (128.0 + (v as f32 - 128.0) * contrast).clamp(0.0, 255.0) as u8)
}
