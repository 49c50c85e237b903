//! Page-addressable sources backing a folder collection: raw file streams
//! aggregated across folders, and decoded images on top of them.

pub mod image;
pub mod stream;

pub use self::image::{ImageCrateDecoder, ImageDecoder, ImageElement, PagedImageDecoder};
pub use self::stream::PagedFileAggregator;
