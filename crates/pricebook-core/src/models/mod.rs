//! Data models shared across pricebook interfaces

mod product;
mod watermark;

pub use product::{Product, ProductState};
pub use watermark::Watermark;
