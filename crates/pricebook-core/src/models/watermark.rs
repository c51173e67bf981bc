//! Update watermark model

use serde::{Deserialize, Serialize};

/// The singleton record marking the most recently applied remote update.
///
/// Exactly one row ever exists in the store; it is overwritten (never
/// appended) after every successful sync and is the sole source of truth
/// for "do we need to sync". An absent row is equivalent to a timestamp
/// of zero, which doubles as the first-install signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    /// Timestamp of the applied remote dataset (Unix ms)
    pub timestamp: i64,
    /// Remote version label
    pub version: String,
}

impl Watermark {
    #[must_use]
    pub fn new(timestamp: i64, version: impl Into<String>) -> Self {
        Self {
            timestamp,
            version: version.into(),
        }
    }
}
