//! Write-then-verify helper for durability-sensitive writes
//!
//! Some storage backends (browser privacy modes, full disks behind a cache)
//! accept a write and then fail to return it. [`write_verified`] performs the
//! write, reads it back, and retries a bounded number of times.

use crate::error::StorageError;

/// Retries after the first attempt (one retry means two attempts total)
pub const DEFAULT_WRITE_RETRIES: u32 = 1;

/// Run `write`, then `read_back`; retry up to `retries` more times until the
/// read-back succeeds.
///
/// Returns the number of attempts used, or [`StorageError::NotPersisted`]
/// when every attempt failed to write or to read back.
pub fn write_verified<W, R>(
    key: &str,
    retries: u32,
    mut write: W,
    mut read_back: R,
) -> Result<u32, StorageError>
where
    W: FnMut() -> Result<(), StorageError>,
    R: FnMut() -> bool,
{
    let attempts = retries.saturating_add(1);

    for attempt in 1..=attempts {
        match write() {
            Ok(()) if read_back() => {
                if attempt > 1 {
                    tracing::info!(key, attempt, "write persisted after retry");
                }
                return Ok(attempt);
            }
            Ok(()) => {
                tracing::warn!(key, attempt, "write did not read back");
            }
            Err(e) => {
                tracing::warn!(key, attempt, error = %e, "write failed");
            }
        }
    }

    Err(StorageError::NotPersisted {
        key: key.to_string(),
        attempts,
    })
}
