//! Sheet editor state, owned per session.

pub mod assets;
pub mod camera;
pub mod events;
pub mod session;

pub use assets::AssetCache;
pub use camera::{Camera, Point};
pub use events::{EditorEvent, EditorEventBus, Subscription};
pub use session::{EditorKey, EditorSession};
