//! Compass client library.
//!
//! Local-first data layer for the ruleset authoring client.
//!
//! ## Structure
//!
//! - `infrastructure/` - Port traits and adapters (FileManager variants, durable storage, clock)
//! - `stores/` - Observable state containers over the FileManager
//! - `editor/` - Per-sheet editor session state
//! - `config` - Environment-driven configuration
//! - `app` - Application composition

pub mod app;
pub mod config;
pub mod editor;
pub mod infrastructure;
pub mod stores;

pub use app::App;
pub use config::{AppConfig, Environment};
