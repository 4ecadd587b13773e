pub mod listing;
pub mod model;

pub use listing::{classify_image, list_image, ClassifyLine, ListingLine};
pub use model::{load_image, read_u16, Image, ImageFormat};
