//! pricebook-core - Core library for pricebook
//!
//! This crate contains the catalog models, local SQLite store, remote
//! document decoder, and the synchronizer used by all pricebook interfaces.

pub mod db;
pub mod decode;
pub mod error;
pub mod models;
pub mod remote;
pub mod search;
pub mod state;
pub mod sync;

pub use error::{Error, Result};
pub use models::{Product, ProductState, Watermark};
