pub mod coordinator;
pub mod report;

pub use coordinator::IngestionCoordinator;
