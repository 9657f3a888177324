//! Owned 8-bit raster buffer shared by every adjustment and the mesh warp.
//!
//! Samples are stored row-major and channel-interleaved: pixel `(x, y)`
//! occupies `data[(y * width + x) * channels ..][..channels]`. Callers go
//! through the accessors below instead of computing strides themselves.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{ImageError, Result};

#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

fn validate_shape(width: u32, height: u32, channels: u8) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(ImageError::Construction(format!(
            "dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    if !matches!(channels, 1 | 3 | 4) {
        return Err(ImageError::Construction(format!(
            "channel count must be 1, 3 or 4, got {}",
            channels
        )));
    }
    Ok(width as usize * height as usize * channels as usize)
}

impl Image {
    /// Allocates a zero-filled image.
    pub fn new(width: u32, height: u32, channels: u8) -> Result<Self> {
        let len = validate_shape(width, height, channels)?;
        Ok(Self {
            width,
            height,
            channels,
            data: vec![0; len],
        })
    }

    /// Wraps an existing sample buffer, which must match the dimensions exactly.
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<Self> {
        let len = validate_shape(width, height, channels)?;
        if data.len() != len {
            return Err(ImageError::Construction(format!(
                "buffer holds {} samples, {}x{}x{} needs {}",
                data.len(),
                width,
                height,
                channels,
                len
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    fn row_len(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize
    }

    fn bounds_error(&self, x: u32, y: u32, channel: u8) -> ImageError {
        ImageError::Bounds {
            x,
            y,
            channel,
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }

    fn in_bounds(&self, x: u32, y: u32, channel: u8) -> bool {
        x < self.width && y < self.height && channel < self.channels
    }

    /// Reads one sample.
    pub fn at(&self, x: u32, y: u32, channel: u8) -> Result<u8> {
        if !self.in_bounds(x, y, channel) {
            return Err(self.bounds_error(x, y, channel));
        }
        Ok(self.data[self.offset(x, y) + channel as usize])
    }

    /// Mutable access to one sample.
    pub fn at_mut(&mut self, x: u32, y: u32, channel: u8) -> Result<&mut u8> {
        if !self.in_bounds(x, y, channel) {
            return Err(self.bounds_error(x, y, channel));
        }
        let idx = self.offset(x, y) + channel as usize;
        Ok(&mut self.data[idx])
    }

    /// All channels of one pixel, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = self.offset(x, y);
        Some(&self.data[start..start + self.channels as usize])
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut [u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = self.offset(x, y);
        let channels = self.channels as usize;
        Some(&mut self.data[start..start + channels])
    }

    /// One row of interleaved samples. Callers guarantee `y < height`.
    pub(crate) fn row(&self, y: u32) -> &[u8] {
        let len = self.row_len();
        let start = y as usize * len;
        &self.data[start..start + len]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.row_len())
    }

    /// Builds a new image of the same shape by mapping every sample independently.
    pub(crate) fn map_samples<F>(&self, f: F) -> Image
    where
        F: Fn(u8) -> u8 + Sync,
    {
        let data = self.data.par_iter().map(|&v| f(v)).collect();
        self.with_data(data)
    }

    /// Builds a new image of the same shape by mapping every pixel independently.
    /// The closure receives the source pixel and the output pixel to fill.
    pub(crate) fn map_pixels<F>(&self, f: F) -> Image
    where
        F: Fn(&[u8], &mut [u8]) + Sync,
    {
        let channels = self.channels as usize;
        let mut data = vec![0u8; self.data.len()];
        data.par_chunks_exact_mut(channels)
            .zip(self.data.par_chunks_exact(channels))
            .for_each(|(dst, src)| f(src, dst));
        self.with_data(data)
    }

    /// Builds a new image of the same shape, filling its rows concurrently.
    pub(crate) fn map_rows<F>(&self, fill: F) -> Image
    where
        F: Fn(u32, &mut [u8]) + Sync,
    {
        let row_len = self.row_len();
        let mut data = vec![0u8; self.data.len()];
        data.par_chunks_exact_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| fill(y as u32, row));
        self.with_data(data)
    }

    /// Allocates an image and fills its rows concurrently. The closure receives
    /// the row index and that row's interleaved samples.
    pub(crate) fn from_rows<F>(width: u32, height: u32, channels: u8, fill: F) -> Result<Image>
    where
        F: Fn(u32, &mut [u8]) + Sync,
    {
        let mut out = Image::new(width, height, channels)?;
        let row_len = out.row_len();
        out.data
            .par_chunks_exact_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| fill(y as u32, row));
        Ok(out)
    }

    fn with_data(&self, data: Vec<u8>) -> Image {
        Image {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data,
        }
    }

    /// Decodes an image file into the interleaved 8-bit layout.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let dynamic = image::open(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let img = Self::try_from(dynamic)?;
        info!(
            path = %path.display(),
            width = img.width,
            height = img.height,
            channels = img.channels,
            "image loaded"
        );
        Ok(img)
    }

    /// Encodes the image to `path`. JPEG outputs honour `quality` (1..=100);
    /// other formats are inferred from the extension.
    pub fn save(&self, path: impl AsRef<Path>, quality: u8) -> Result<()> {
        let path = path.as_ref();
        if !(1..=100).contains(&quality) {
            return Err(ImageError::Precondition(format!(
                "jpeg quality must be within 1..=100, got {}",
                quality
            )));
        }
        let io_err = |source: image::ImageError| ImageError::Io {
            path: path.to_path_buf(),
            source,
        };

        let is_jpeg = path
            .extension()
            .map(|e| e.to_string_lossy())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));

        let dynamic = self.to_dynamic()?;
        if is_jpeg {
            // JPEG carries no alpha.
            let dynamic = if self.channels == 4 {
                DynamicImage::ImageRgb8(dynamic.to_rgb8())
            } else {
                dynamic
            };
            let file = File::create(path).map_err(|e| io_err(image::ImageError::IoError(e)))?;
            let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
            dynamic.write_with_encoder(encoder).map_err(io_err)?;
        } else {
            dynamic.save(path).map_err(io_err)?;
        }
        debug!(path = %path.display(), quality, "image saved");
        Ok(())
    }

    /// Copies the samples into an `image` crate buffer of matching layout.
    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        self.clone().into_dynamic()
    }

    /// Hands the sample buffer to an `image` crate buffer without copying.
    pub fn into_dynamic(self) -> Result<DynamicImage> {
        let (w, h, channels) = (self.width, self.height, self.channels);
        let data = self.into_raw();
        let dynamic = match channels {
            1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
            _ => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        };
        dynamic.ok_or_else(|| {
            ImageError::Construction(format!("buffer does not fit {}x{}x{}", w, h, channels))
        })
    }
}

impl TryFrom<DynamicImage> for Image {
    type Error = ImageError;

    fn try_from(dynamic: DynamicImage) -> Result<Self> {
        let (w, h) = (dynamic.width(), dynamic.height());
        match dynamic {
            DynamicImage::ImageLuma8(buf) => Image::from_raw(buf.into_raw(), w, h, 1),
            DynamicImage::ImageRgb8(buf) => Image::from_raw(buf.into_raw(), w, h, 3),
            DynamicImage::ImageRgba8(buf) => Image::from_raw(buf.into_raw(), w, h, 4),
            other if other.color().has_alpha() => {
                Image::from_raw(other.to_rgba8().into_raw(), w, h, 4)
            }
            other if other.color().has_color() => {
                Image::from_raw(other.to_rgb8().into_raw(), w, h, 3)
            }
            other => Image::from_raw(other.to_luma8().into_raw(), w, h, 1),
        }
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageBuffer, LumaA, Rgb};

    use crate::error::ImageError;

    use super::Image;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("panowarp-image-{}-{}", std::process::id(), name))
    }

    #[test]
    fn new_rejects_two_channels() {
        assert!(matches!(
            Image::new(4, 4, 2),
            Err(ImageError::Construction(_))
        ));
    }

    #[test]
    fn new_rejects_zero_dimensions() {
        assert!(matches!(Image::new(0, 4, 3), Err(ImageError::Construction(_))));
        assert!(matches!(Image::new(4, 0, 3), Err(ImageError::Construction(_))));
    }

    #[test]
    fn new_is_zero_filled() {
        let img = Image::new(3, 2, 4).unwrap();
        assert_eq!(img.data().len(), 24);
        assert!(img.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn from_raw_rejects_length_mismatch() {
        assert!(matches!(
            Image::from_raw(vec![0; 11], 2, 2, 3),
            Err(ImageError::Construction(_))
        ));
    }

    #[test]
    fn at_uses_interleaved_layout() {
        let data: Vec<u8> = (0..18).collect();
        let img = Image::from_raw(data, 3, 2, 3).unwrap();
        // (x=1, y=1) starts at (1 * 3 + 1) * 3 = 12
        assert_eq!(img.at(1, 1, 0).unwrap(), 12);
        assert_eq!(img.at(1, 1, 2).unwrap(), 14);
        assert_eq!(img.pixel(2, 0).unwrap(), &[6, 7, 8]);
    }

    #[test]
    fn at_reports_bounds_errors() {
        let mut img = Image::new(2, 2, 3).unwrap();
        assert!(matches!(img.at(2, 0, 0), Err(ImageError::Bounds { x: 2, .. })));
        assert!(matches!(img.at(0, 2, 0), Err(ImageError::Bounds { y: 2, .. })));
        assert!(matches!(
            img.at_mut(0, 0, 3),
            Err(ImageError::Bounds { channel: 3, .. })
        ));
        assert!(img.pixel(5, 5).is_none());
    }

    #[test]
    fn at_mut_writes_single_sample() {
        let mut img = Image::new(2, 2, 1).unwrap();
        *img.at_mut(1, 0, 0).unwrap() = 77;
        assert_eq!(img.data(), &[0, 77, 0, 0]);
        img.pixel_mut(0, 1).unwrap()[0] = 5;
        assert_eq!(img.rows().nth(1).unwrap(), &[5, 0]);
    }

    #[test]
    fn luma_alpha_decodes_as_rgba() {
        let dynamic =
            DynamicImage::ImageLumaA8(ImageBuffer::from_pixel(2, 1, LumaA([90u8, 128])));
        let img = Image::try_from(dynamic).unwrap();
        assert_eq!(img.channels(), 4);
        assert_eq!(img.pixel(1, 0).unwrap(), &[90, 90, 90, 128]);
    }

    #[test]
    fn into_dynamic_keeps_layout_and_samples() {
        let data: Vec<u8> = (0..24).collect();
        let img = Image::from_raw(data.clone(), 3, 2, 4).unwrap();
        assert_eq!(img.to_dynamic().unwrap(), img.clone().into_dynamic().unwrap());
        match img.into_dynamic().unwrap() {
            DynamicImage::ImageRgba8(buf) => {
                assert_eq!(buf.dimensions(), (3, 2));
                assert_eq!(buf.into_raw(), data);
            }
            other => panic!("expected rgba8, got {:?}", other.color()),
        }
        let gray = Image::from_raw(vec![1, 2], 2, 1, 1).unwrap();
        assert!(matches!(
            gray.into_dynamic().unwrap(),
            DynamicImage::ImageLuma8(_)
        ));
    }

    #[test]
    fn png_round_trip_preserves_samples() {
        let data: Vec<u8> = (0..48).map(|v| (v * 5) as u8).collect();
        let img = Image::from_raw(data, 4, 4, 3).unwrap();
        let path = temp_path("roundtrip.png");
        img.save(&path, 90).unwrap();
        let loaded = Image::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, img);
    }

    #[test]
    fn jpeg_save_drops_alpha_and_loads_as_rgb() {
        let dynamic = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(8, 8, Rgb([10u8, 200, 30])));
        let rgb = Image::try_from(dynamic).unwrap();
        let rgba = Image::from_raw(
            rgb.data()
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            8,
            8,
            4,
        )
        .unwrap();
        let path = temp_path("alpha.jpg");
        rgba.save(&path, 95).unwrap();
        let loaded = Image::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.channels(), 3);
        assert_eq!(loaded.dimensions(), (8, 8));
    }

    #[test]
    fn save_rejects_out_of_range_quality() {
        let img = Image::new(1, 1, 3).unwrap();
        let path = temp_path("never.jpg");
        assert!(matches!(img.save(&path, 0), Err(ImageError::Precondition(_))));
        assert!(matches!(img.save(&path, 101), Err(ImageError::Precondition(_))));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Image::load(temp_path("missing.png")).unwrap_err();
        assert!(matches!(err, ImageError::Io { .. }));
    }
}
