//! Persisted entities.

mod asset;
mod base;
mod component;
mod content;
mod ruleset;
mod user;

pub use asset::{Asset, AssetKey};
pub use base::BaseDetails;
pub use component::{
    defaults_for, Component, ComponentDefaults, ComponentDraft, ComponentType, DEFAULT_SHAPE_SIZE,
};
pub use content::{Attribute, Chart, ContentDetails, ContentOwner, Item, OwnedContent, Sheet};
pub use ruleset::{Module, Ruleset};
pub use user::User;
