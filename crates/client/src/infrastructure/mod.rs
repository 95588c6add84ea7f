//! Infrastructure: port traits and their concrete adapters.

pub mod clock;
pub mod file_manager;
pub mod locks;
pub mod ports;
pub mod storage;
