//! Compass domain types.
//!
//! Pure data and invariants for the local-first ruleset authoring client:
//! users, rulesets and modules with their content, sheet components and
//! stored assets. Nothing in this crate performs I/O.

extern crate self as compass_domain;

pub mod common;
pub mod entities;
pub mod error;
pub mod ids;

pub use entities::{
    defaults_for, Asset, AssetKey, Attribute, BaseDetails, Chart, Component, ComponentDefaults,
    ComponentDraft, ComponentType, ContentDetails, ContentOwner, Item, Module, Ruleset, Sheet,
    User,
};

pub use error::DomainError;

pub use ids::{
    ArchetypeId, AssetId, AttributeId, ChartId, ComponentId, ItemId, ModuleId, RulesetId, SheetId,
    UserId,
};
