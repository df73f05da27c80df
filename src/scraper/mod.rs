pub mod client;
pub mod extract;
pub mod models;
mod scraper_error;
pub mod walker;

pub use extract::NextDataExtractor;
pub use scraper_error::{AcquisitionError, ExtractionError, TransportError};
pub use walker::PaginationWalker;
