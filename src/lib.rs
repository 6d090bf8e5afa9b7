//! Course-catalog search and professor-rating resolution over a table of
//! historical course sections.

pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod professor;
pub mod report;
pub mod search;
pub mod store;
pub mod text;

pub use catalog::Catalog;
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
