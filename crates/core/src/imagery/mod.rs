//! Multi-band acquisitions and collections of them

mod collection;
mod image;

pub use collection::ImageCollection;
pub use image::SpectralImage;
