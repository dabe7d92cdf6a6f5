//! TOML encoding of timer snapshots.

use hourglass_types::TimerSnapshot;

use super::StorageError;

/// Serialize a snapshot. Records keep their order.
pub fn encode_snapshot(snapshot: &TimerSnapshot) -> Result<String, StorageError> {
    Ok(toml::to_string_pretty(snapshot)?)
}

/// Parse a snapshot. An empty document is an empty snapshot.
pub fn decode_snapshot(blob: &str) -> Result<TimerSnapshot, StorageError> {
    Ok(toml::from_str(blob)?)
}
