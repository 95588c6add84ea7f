//! User identity record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::BaseDetails;
use crate::{DomainError, RulesetId, SheetId, UserId};

/// The person using the client.
///
/// In local-only mode there is no authentication: the current user is looked
/// up by `username`. Sheets and rulesets are owned by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub details: BaseDetails<UserId>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub onboarded: bool,
    #[serde(default)]
    pub preferences: Map<String, Value>,
    #[serde(default)]
    pub sheets: Vec<SheetId>,
    #[serde(default)]
    pub rulesets: Vec<RulesetId>,
}

impl User {
    pub fn new(username: impl Into<String>, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        Ok(Self {
            details: BaseDetails::new(UserId::new(), now),
            username,
            email: None,
            avatar: None,
            onboarded: false,
            preferences: Map::new(),
            sheets: Vec::new(),
            rulesets: Vec::new(),
        })
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn id(&self) -> UserId {
        *self.details.id()
    }

    pub fn preference(&self, key: &str) -> Option<&Value> {
        self.preferences.get(key)
    }

    pub fn set_preference(&mut self, key: impl Into<String>, value: Value, now: DateTime<Utc>) {
        self.preferences.insert(key.into(), value);
        self.details.touch(now);
    }

    pub fn mark_onboarded(&mut self, now: DateTime<Utc>) {
        if !self.onboarded {
            self.onboarded = true;
            self.details.touch(now);
        }
    }

    /// Returns false if the ruleset was already owned.
    pub fn add_ruleset(&mut self, ruleset_id: RulesetId, now: DateTime<Utc>) -> bool {
        if self.rulesets.contains(&ruleset_id) {
            return false;
        }
        self.rulesets.push(ruleset_id);
        self.details.touch(now);
        true
    }

    pub fn add_sheet(&mut self, sheet_id: SheetId, now: DateTime<Utc>) -> bool {
        if self.sheets.contains(&sheet_id) {
            return false;
        }
        self.sheets.push(sheet_id);
        self.details.touch(now);
        true
    }
}
