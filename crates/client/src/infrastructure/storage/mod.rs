//! Durable key/value storage implementations.

mod file;
mod memory;

pub use file::FileStorageProvider;
pub use memory::MemoryStorageProvider;
