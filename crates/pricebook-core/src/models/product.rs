//! Product model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a catalog row.
///
/// The remote source encodes this as a numeric token: `"0"` means the
/// product is sellable, anything else means it has been voided upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductState {
    Active,
    Void,
}

impl ProductState {
    /// Decode the remote wire token.
    #[must_use]
    pub fn from_wire_token(token: &str) -> Self {
        if token.trim().parse::<i64>() == Ok(0) {
            Self::Active
        } else {
            Self::Void
        }
    }

    /// Parse the label stored in the local database.
    ///
    /// Unknown labels fall back to `Void` so a stale row never shows up
    /// as sellable.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("active") {
            Self::Active
        } else {
            Self::Void
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Void => "void",
        }
    }
}

impl fmt::Display for ProductState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog product row.
///
/// Identity is the remote-assigned `reference`; rows are only ever written
/// in bulk by the synchronizer and read by search/listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique reference within the catalog
    pub reference: String,
    /// Free-text description
    pub description: String,
    /// Category/family label
    pub family: String,
    /// Units per bulk pack
    pub pack_quantity: f64,
    /// Unit-of-sale quantity
    pub sale_unit: f64,
    /// Current stock on hand
    pub stock: f64,
    /// Current unit price
    pub price: f64,
    /// Discount, kept as free text (upstream representation is inconsistent)
    pub discount: String,
    /// Lifecycle state
    pub state: ProductState,
    /// Free-text warehouse location
    pub location: String,
    /// Last-modified timestamp (Unix ms)
    pub updated_at: i64,
}

impl Product {
    /// Whether the product should rank first in search results.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state == ProductState::Active && self.stock > 0.0
    }

    /// Normalized text indexed for full-text search.
    #[must_use]
    pub fn search_text(&self) -> String {
        crate::search::normalize(&format!(
            "{} {} {}",
            self.reference, self.description, self.family
        ))
    }
}
