pub mod categories;
pub mod listing;
pub mod normalizer;
pub mod quality;
pub mod session;
pub mod units;

pub use categories::PropertyType;
pub use listing::ListingQuery;
