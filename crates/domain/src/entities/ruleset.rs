//! Rulesets and modules - versioned content containers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::{adopt, Attribute, Chart, ContentDetails, ContentOwner, Item, Sheet};
use super::BaseDetails;
use crate::{DomainError, ModuleId, RulesetId};

/// A versioned bundle of game-system content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ruleset {
    #[serde(flatten)]
    pub details: BaseDetails<RulesetId>,
    #[serde(flatten)]
    pub content: ContentDetails,
}

/// A content pack, either standalone or scoped to a ruleset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    #[serde(flatten)]
    pub details: BaseDetails<ModuleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruleset_id: Option<RulesetId>,
    #[serde(flatten)]
    pub content: ContentDetails,
}

macro_rules! impl_container {
    ($name:ident, $id:ident, $owner:ident) => {
        impl $name {
            pub fn id(&self) -> $id {
                *self.details.id()
            }

            pub fn owner(&self) -> ContentOwner {
                ContentOwner::$owner(self.id())
            }

            pub fn title(&self) -> &str {
                &self.content.title
            }

            pub fn add_sheet(&mut self, sheet: Sheet, now: DateTime<Utc>) -> Result<(), DomainError> {
                let owner = self.owner();
                adopt(&mut self.content.sheets, sheet, owner)?;
                self.details.touch(now);
                Ok(())
            }

            pub fn add_attribute(
                &mut self,
                attribute: Attribute,
                now: DateTime<Utc>,
            ) -> Result<(), DomainError> {
                let owner = self.owner();
                adopt(&mut self.content.attributes, attribute, owner)?;
                self.details.touch(now);
                Ok(())
            }

            pub fn add_item(&mut self, item: Item, now: DateTime<Utc>) -> Result<(), DomainError> {
                let owner = self.owner();
                adopt(&mut self.content.items, item, owner)?;
                self.details.touch(now);
                Ok(())
            }

            pub fn add_chart(&mut self, chart: Chart, now: DateTime<Utc>) -> Result<(), DomainError> {
                let owner = self.owner();
                adopt(&mut self.content.charts, chart, owner)?;
                self.details.touch(now);
                Ok(())
            }

            /// Check a record restored from storage.
            pub fn validate_ownership(&self) -> Result<(), DomainError> {
                self.content.validate_ownership(self.owner())
            }
        }
    };
}

impl_container!(Ruleset, RulesetId, Ruleset);
impl_container!(Module, ModuleId, Module);

impl Ruleset {
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            details: BaseDetails::new(RulesetId::new(), now),
            content: ContentDetails::new(title),
        }
    }
}

impl Module {
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            details: BaseDetails::new(ModuleId::new(), now),
            ruleset_id: None,
            content: ContentDetails::new(title),
        }
    }

    pub fn for_ruleset(mut self, ruleset_id: RulesetId) -> Self {
        self.ruleset_id = Some(ruleset_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn adding_content_touches_the_container() {
        let mut ruleset = Ruleset::new("Mothership", now());
        ruleset
            .add_attribute(Attribute::new("Strength"), now() + Duration::minutes(1))
            .unwrap();

        assert_eq!(ruleset.details.updated_at(), now() + Duration::minutes(1));
        assert_eq!(ruleset.content.attributes[0].owner, Some(ruleset.owner()));
    }

    #[test]
    fn module_content_cannot_be_moved_into_a_ruleset() {
        let module = Module::new("Dead Planet", now());
        let mut sheet = Sheet::new("Crew");
        sheet.owner = Some(module.owner());

        let mut ruleset = Ruleset::new("Mothership", now());
        let err = ruleset.add_sheet(sheet, now()).unwrap_err();
        assert!(matches!(err, DomainError::Ownership { .. }));
        assert_eq!(ruleset.details.updated_at(), now());
    }

    #[test]
    fn module_adopts_items_and_charts() {
        let mut module = Module::new("Dead Planet", now());
        module
            .add_item(Item::new("Flare gun"), now() + Duration::minutes(1))
            .unwrap();
        module
            .add_chart(Chart::new("Panic table"), now() + Duration::minutes(2))
            .unwrap();

        assert_eq!(module.content.items[0].owner, Some(module.owner()));
        assert_eq!(module.content.charts[0].owner, Some(module.owner()));
        assert_eq!(module.details.updated_at(), now() + Duration::minutes(2));
        assert!(module.validate_ownership().is_ok());
    }

    #[test]
    fn json_shape_is_flat() {
        let ruleset_id = RulesetId::new();
        let module = Module::new("Gradient Descent", now()).for_ruleset(ruleset_id);
        let json = serde_json::to_value(&module).unwrap();

        assert_eq!(json["title"], "Gradient Descent");
        assert_eq!(json["rulesetId"], ruleset_id.to_string());
        assert!(json.get("createdAt").is_some());

        let back: Module = serde_json::from_value(json).unwrap();
        assert_eq!(back, module);
    }

    #[test]
    fn standalone_module_omits_ruleset_id() {
        let module = Module::new("Homebrew", now());
        let json = serde_json::to_value(&module).unwrap();
        assert!(json.get("rulesetId").is_none());
    }
}
