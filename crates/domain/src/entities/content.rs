//! Content shared by rulesets and modules.
//!
//! Sheets, attributes, items and charts are placeholders for now: an id, an
//! optional owner back-reference and a title. The real content schema lives
//! with the sheet editor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AttributeId, ChartId, DomainError, ItemId, ModuleId, RulesetId, SheetId};

/// The container a piece of content belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum ContentOwner {
    Ruleset(RulesetId),
    Module(ModuleId),
}

impl fmt::Display for ContentOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ruleset(id) => write!(f, "ruleset {id}"),
            Self::Module(id) => write!(f, "module {id}"),
        }
    }
}

/// Content carrying an ownership back-reference.
pub trait OwnedContent {
    const ENTITY_TYPE: &'static str;

    fn content_id(&self) -> String;
    fn owner(&self) -> Option<ContentOwner>;
    fn set_owner(&mut self, owner: ContentOwner);
}

macro_rules! define_content {
    ($name:ident, $id:ident) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub id: $id,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub owner: Option<ContentOwner>,
            #[serde(default)]
            pub title: String,
        }

        impl $name {
            pub fn new(title: impl Into<String>) -> Self {
                Self {
                    id: $id::new(),
                    owner: None,
                    title: title.into(),
                }
            }
        }

        impl OwnedContent for $name {
            const ENTITY_TYPE: &'static str = stringify!($name);

            fn content_id(&self) -> String {
                self.id.to_string()
            }

            fn owner(&self) -> Option<ContentOwner> {
                self.owner
            }

            fn set_owner(&mut self, owner: ContentOwner) {
                self.owner = Some(owner);
            }
        }
    };
}

define_content!(Sheet, SheetId);
define_content!(Attribute, AttributeId);
define_content!(Item, ItemId);
define_content!(Chart, ChartId);

/// Title, description, author and the owned content collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentDetails {
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub sheets: Vec<Sheet>,
    pub attributes: Vec<Attribute>,
    pub items: Vec<Item>,
    pub charts: Vec<Chart>,
}

impl ContentDetails {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Check every content back-reference against `parent`.
    pub fn validate_ownership(&self, parent: ContentOwner) -> Result<(), DomainError> {
        check_all(&self.sheets, parent)?;
        check_all(&self.attributes, parent)?;
        check_all(&self.items, parent)?;
        check_all(&self.charts, parent)
    }
}

fn check_all<T: OwnedContent>(entries: &[T], parent: ContentOwner) -> Result<(), DomainError> {
    entries.iter().try_for_each(|entry| check_owner(entry, parent))
}

fn check_owner<T: OwnedContent>(entry: &T, parent: ContentOwner) -> Result<(), DomainError> {
    match entry.owner() {
        Some(owner) if owner != parent => {
            tracing::warn!(
                entity_type = T::ENTITY_TYPE,
                id = %entry.content_id(),
                %owner,
                %parent,
                "Content belongs to a different container"
            );
            Err(DomainError::ownership(
                T::ENTITY_TYPE,
                entry.content_id(),
                owner,
                parent,
            ))
        }
        _ => Ok(()),
    }
}

/// Stamp `entry` with `parent` and append it, rejecting foreign content.
pub(crate) fn adopt<T: OwnedContent>(
    entries: &mut Vec<T>,
    mut entry: T,
    parent: ContentOwner,
) -> Result<(), DomainError> {
    check_owner(&entry, parent)?;
    entry.set_owner(parent);
    entries.push(entry);
    Ok(())
}
