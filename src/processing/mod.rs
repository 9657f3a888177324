pub mod color;
pub mod exposure;
pub mod filters;
pub mod transform;

pub use color::{grayscale, saturation, temperature};
pub use exposure::{brightness, contrast};
pub use filters::{blur, invert};
pub use transform::process_image;
