pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod ingest;
pub mod scraper;
pub mod spreadsheets;

#[cfg(test)]
mod tests;
