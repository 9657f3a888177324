use tracing::debug;

use crate::image::Image;
use crate::state::Adjustments;

use super::{color, exposure, filters};

/// Tone chain in fixed order: brightness → contrast → saturation → temperature.
/// Always returns a fresh image, even when every stage is an identity.
pub fn process_image(
    img: &Image,
    brightness: i32,
    contrast: f32,
    saturation: f32,
    temperature: i32,
) -> Image {
    let out = exposure::brightness(img, brightness);
    let out = exposure::contrast(&out, contrast);
    let out = color::saturation(&out, saturation);
    color::temperature(&out, temperature)
}

/// Apply a full recipe from `adj` to `img`.
/// Order: tone chain → grayscale → blur → invert.
pub fn apply(img: &Image, adj: &Adjustments) -> Image {
    debug!(?adj, "applying adjustments");
    let mut out = process_image(
        img,
        adj.brightness,
        adj.contrast,
        adj.saturation,
        adj.temperature,
    );

    if adj.grayscale {
        out = color::grayscale(&out);
    }
    if adj.blur_radius > 0 {
        out = filters::blur(&out, adj.blur_radius);
    }
    if adj.invert {
        out = filters::invert(&out);
    }

    out
}

#[cfg(test)]
mod tests {
    use crate::image::Image;
    use crate::state::Adjustments;

    use super::{apply, process_image};

    fn speckled() -> Image {
        let mut img = Image::from_raw([10u8, 20, 30].repeat(16), 4, 4, 3).unwrap();
        img.pixel_mut(2, 1).unwrap().copy_from_slice(&[200, 10, 10]);
        img
    }

    #[test]
    fn brightness_then_unit_contrast_is_exact() {
        let out = process_image(&speckled(), 20, 1.0, 1.0, 0);
        for y in 0..4 {
            for x in 0..4 {
                if (x, y) == (2, 1) {
                    continue;
                }
                assert_eq!(out.pixel(x, y).unwrap(), &[30, 40, 50]);
            }
        }
        assert_eq!(out.pixel(2, 1).unwrap(), &[220, 30, 30]);
    }

    #[test]
    fn identity_chain_reproduces_input() {
        let img = speckled();
        assert_eq!(process_image(&img, 0, 1.0, 1.0, 0), img);
    }

    #[test]
    fn stage_order_is_brightness_before_contrast() {
        let img = Image::from_raw(vec![100, 100, 100], 1, 1, 3).unwrap();
        // brightness first: (100 + 28 - 128) * 2 + 128 = 128
        // contrast first would give (100 - 128) * 2 + 128 + 28 = 100
        let out = process_image(&img, 28, 2.0, 1.0, 0);
        assert_eq!(out.data(), &[128, 128, 128]);
    }

    #[test]
    fn recipe_runs_optional_stages() {
        let img = speckled();
        let adj = Adjustments {
            grayscale: true,
            invert: true,
            ..Adjustments::default()
        };
        let out = apply(&img, &adj);
        // luma(10, 20, 30) = 2.99 + 11.74 + 3.42 = 18.15 -> 18, inverted 237
        assert_eq!(out.pixel(0, 0).unwrap(), &[237, 237, 237]);
    }

    #[test]
    fn default_recipe_is_identity() {
        let img = speckled();
        assert_eq!(apply(&img, &Adjustments::default()), img);
    }
}
