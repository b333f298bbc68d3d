//! Persisted key/value storage shared by every session store of one origin
//!
//! [`Storage`] models the browser's `localStorage`: synchronous string
//! reads and writes plus a change notification stream that carries writes
//! made by other handles of the same origin.

mod file;
mod memory;
mod traits;
mod verified;

pub use file::FileStorage;
pub use memory::{MemoryOrigin, MemoryStorage};
pub use traits::{Storage, StorageEvent};
pub use verified::{DEFAULT_WRITE_RETRIES, write_verified};
