//! Sheet components - positioned visual elements on a sheet canvas.
//!
//! A component is created from a [`ComponentDraft`]. `type`, `x` and `y` are
//! required; anything else left out is filled from the per-type defaults.
//! Defaults never replace a field the draft sets explicitly, and style/data
//! objects are merged key by key with the draft's keys winning.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use validator::Validate;

use super::BaseDetails;
use crate::{ComponentId, DomainError, SheetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Shape,
    Text,
    Image,
    Input,
    Checkbox,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Shape => "shape",
            Self::Text => "text",
            Self::Image => "image",
            Self::Input => "input",
            Self::Checkbox => "checkbox",
        };
        f.write_str(name)
    }
}

/// Fields a caller supplies when placing a component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDraft {
    #[serde(rename = "type")]
    #[validate(required)]
    pub component_type: Option<ComponentType>,
    #[validate(required)]
    pub x: Option<f64>,
    #[validate(required)]
    pub y: Option<f64>,
    pub z: Option<i32>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub sheet_id: Option<SheetId>,
    pub style: Option<Map<String, Value>>,
    pub data: Option<Map<String, Value>>,
}

impl ComponentDraft {
    pub fn new(component_type: ComponentType, x: f64, y: f64) -> Self {
        Self {
            component_type: Some(component_type),
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }
}

/// Values used for anything a draft leaves out.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDefaults {
    pub width: f64,
    pub height: f64,
    pub z: i32,
    pub rotation: f64,
    pub style: Map<String, Value>,
    pub data: Map<String, Value>,
}

pub const DEFAULT_SHAPE_SIZE: f64 = 60.0;

pub fn defaults_for(component_type: ComponentType) -> ComponentDefaults {
    let (width, height, style, data) = match component_type {
        ComponentType::Shape => (
            DEFAULT_SHAPE_SIZE,
            DEFAULT_SHAPE_SIZE,
            json!({
                "backgroundColor": "#42403D",
                "opacity": 1,
                "borderRadius": 0,
                "outlineWidth": 0,
                "outlineColor": "#000000",
            }),
            json!({ "sides": 4 }),
        ),
        ComponentType::Text => (
            120.0,
            30.0,
            json!({
                "color": "#FAFAFA",
                "fontSize": 14,
                "fontFamily": "Roboto Condensed",
                "textAlign": "start",
            }),
            json!({ "value": "Text" }),
        ),
        ComponentType::Image => (100.0, 100.0, json!({ "opacity": 1 }), json!({})),
        ComponentType::Input => (
            120.0,
            30.0,
            json!({ "color": "#FAFAFA", "fontSize": 14, "backgroundColor": "transparent" }),
            json!({ "placeholder": "" }),
        ),
        ComponentType::Checkbox => (
            20.0,
            20.0,
            json!({ "color": "#FAFAFA" }),
            json!({ "checked": false }),
        ),
    };

    ComponentDefaults {
        width,
        height,
        z: 1,
        rotation: 0.0,
        style: into_object(style),
        data: into_object(data),
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// `explicit` keys win; defaults fill the rest.
fn merge_defaults(
    explicit: Option<Map<String, Value>>,
    defaults: Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = defaults;
    if let Some(explicit) = explicit {
        merged.extend(explicit);
    }
    merged
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(flatten)]
    pub details: BaseDetails<ComponentId>,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<SheetId>,
    pub x: f64,
    pub y: f64,
    pub z: i32,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub style: Map<String, Value>,
    pub data: Map<String, Value>,
}

impl Component {
    /// Build a component from a draft.
    ///
    /// Fails with [`DomainError::Validation`] naming the missing fields when
    /// `type`, `x` or `y` is absent.
    pub fn create(draft: ComponentDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if let Err(errors) = draft.validate() {
            let mut missing: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|field| field.to_string())
                .collect();
            missing.sort();
            return Err(DomainError::validation(format!(
                "component is missing required fields: {}",
                missing.join(", ")
            )));
        }

        let (Some(component_type), Some(x), Some(y)) = (draft.component_type, draft.x, draft.y)
        else {
            return Err(DomainError::validation("component is missing required fields"));
        };

        let defaults = defaults_for(component_type);
        Ok(Self {
            details: BaseDetails::new(ComponentId::new(), now),
            component_type,
            sheet_id: draft.sheet_id,
            x,
            y,
            z: draft.z.unwrap_or(defaults.z),
            width: draft.width.unwrap_or(defaults.width),
            height: draft.height.unwrap_or(defaults.height),
            rotation: draft.rotation.unwrap_or(defaults.rotation),
            style: merge_defaults(draft.style, defaults.style),
            data: merge_defaults(draft.data, defaults.data),
        })
    }

    pub fn id(&self) -> ComponentId {
        *self.details.id()
    }

    pub fn move_to(&mut self, x: f64, y: f64, now: DateTime<Utc>) {
        self.x = x;
        self.y = y;
        self.details.touch(now);
    }
}
