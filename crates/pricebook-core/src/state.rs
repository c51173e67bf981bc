//! Shared observable state types.

/// Synchronizer status as published to observers.
///
/// Terminal values (`Committed`, `UpToDate`, `Failed`) persist until the
/// next run starts, so a UI can keep showing the last outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    CheckingVersion,
    Downloading,
    Applying,
    UpToDate,
    Committed,
    Failed,
}
