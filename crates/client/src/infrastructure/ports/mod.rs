//! Port traits for infrastructure boundaries.
//!
//! These are the seams of the client. Ports exist for:
//! - Persistent data access (in-memory, local stub or SQLite)
//! - Durable key/value storage (file or in-memory)
//! - Clock (for testing)

mod clock;
mod error;
mod file_manager;
mod storage;

pub use clock::ClockPort;
pub use error::FileManagerError;
pub use file_manager::FileManager;
pub use storage::{load_json, save_json, storage_keys, StorageProvider};

#[cfg(test)]
pub use clock::MockClockPort;
#[cfg(test)]
pub use file_manager::MockFileManager;
