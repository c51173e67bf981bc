//! Lenient product-document decoder
//!
//! The remote feed is a JSON array of hand-exported records with wobbly
//! typing: numbers arrive as native numbers, as strings (sometimes with a
//! comma decimal separator), or not at all. The policy is to prefer a
//! degraded record over discarding a whole batch: values coerce to a
//! default, and only records whose identity cannot be established are
//! rejected. Rejections carry a reason so sync reports stay observable
//! instead of silently shrinking.

#![allow(clippy::cast_possible_truncation)] // ms timestamps fit in i64

use crate::error::Result;
use crate::models::{Product, ProductState};
use serde_json::{Map, Value};
use std::fmt;

/// Why an individual document element was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The element was not a JSON object
    NotAnObject,
    /// The element had a missing or blank reference
    MissingReference,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => f.write_str("element is not an object"),
            Self::MissingReference => f.write_str("missing or blank reference"),
        }
    }
}

/// A document element that failed schema validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// Position in the document array
    pub index: usize,
    pub reason: RejectReason,
}

/// Outcome of decoding a whole product document
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDocument {
    /// Records that passed validation, in document order
    pub products: Vec<Product>,
    /// Records skipped, with reasons
    pub rejected: Vec<RejectedRecord>,
}

/// Decode a product-array document body.
///
/// A body that is not a JSON array at all is a whole-document decode
/// failure; a malformed element only skips that element.
pub fn decode_document(body: &str) -> Result<DecodedDocument> {
    let elements: Vec<Value> = serde_json::from_str(body)?;

    let mut products = Vec::with_capacity(elements.len());
    let mut rejected = Vec::new();

    for (index, element) in elements.iter().enumerate() {
        match decode_element(element) {
            Ok(product) => products.push(product),
            Err(reason) => {
                tracing::warn!(index, %reason, "skipping malformed record");
                rejected.push(RejectedRecord { index, reason });
            }
        }
    }

    Ok(DecodedDocument { products, rejected })
}

fn decode_element(element: &Value) -> std::result::Result<Product, RejectReason> {
    let record = element.as_object().ok_or(RejectReason::NotAnObject)?;

    let reference = string_field(record, "referencia");
    if reference.trim().is_empty() {
        return Err(RejectReason::MissingReference);
    }

    let state_token = record
        .get("estado")
        .map_or_else(|| "0".to_string(), coerce_string);

    Ok(Product {
        reference,
        description: string_field(record, "descripcion"),
        family: string_field(record, "familia"),
        pack_quantity: number_field(record, "cantidad_bulto"),
        sale_unit: number_field(record, "unidad_venta"),
        stock: number_field(record, "stock_actual"),
        price: number_field(record, "precio_actual"),
        discount: string_field(record, "descuento"),
        state: ProductState::from_wire_token(&state_token),
        location: string_field(record, "localizacion"),
        updated_at: timestamp_field(record, "ultima_actualizacion"),
    })
}

fn string_field(record: &Map<String, Value>, key: &str) -> String {
    record.get(key).map_or_else(String::new, coerce_string)
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn number_field(record: &Map<String, Value>, key: &str) -> f64 {
    record.get(key).map_or(0.0, coerce_number)
}

/// Numeric coercion policy: native number, numeric string (comma decimal
/// separator normalized), or null/absent all land on a finite f64,
/// defaulting to zero.
fn coerce_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Millisecond timestamps arrive as integers, floats, or numeric strings.
/// A missing or non-positive value falls back to the current wall clock so
/// the row still carries a usable last-modified stamp.
fn timestamp_field(record: &Map<String, Value>, key: &str) -> i64 {
    let parsed = match record.get(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    };

    match parsed {
        Some(ts) if ts > 0 => ts,
        _ => chrono::Utc::now().timestamp_millis(),
    }
}
