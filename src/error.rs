use std::path::PathBuf;

/// Failure modes for image construction, access, codecs, and warping.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("invalid image: {0}")]
    Construction(String),
    #[error("image I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(
        "pixel access out of bounds: ({x}, {y}, channel {channel}) in {width}x{height}x{channels}"
    )]
    Bounds {
        x: u32,
        y: u32,
        channel: u8,
        width: u32,
        height: u32,
        channels: u8,
    },
    #[error("precondition failed: {0}")]
    Precondition(String),
}

pub type Result<T> = std::result::Result<T, ImageError>;
