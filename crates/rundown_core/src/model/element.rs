//! Element records: the leaves of the hierarchy.
//!
//! # Invariants
//! - `kind` is serialized as `type` to match external schema naming.
//! - `fields` holds variant payload keys verbatim; the core never reads them.

use super::{Sibling, SiblingLevel};
use crate::reorder::Ranked;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Stable element identifier.
pub type ElementId = Uuid;

/// Graphic variant carried by an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Super,
    Stripe,
    Box,
    Counter,
    Finger,
    Live,
    Ticker,
    Roller,
    Promo,
    #[serde(rename = "CG")]
    Cg,
}

impl ElementKind {
    /// External name, as written to the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Super => "Super",
            Self::Stripe => "Stripe",
            Self::Box => "Box",
            Self::Counter => "Counter",
            Self::Finger => "Finger",
            Self::Live => "Live",
            Self::Ticker => "Ticker",
            Self::Roller => "Roller",
            Self::Promo => "Promo",
            Self::Cg => "CG",
        }
    }

    /// Parses an external type name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Super" => Some(Self::Super),
            "Stripe" => Some(Self::Stripe),
            "Box" => Some(Self::Box),
            "Counter" => Some(Self::Counter),
            "Finger" => Some(Self::Finger),
            "Live" => Some(Self::Live),
            "Ticker" => Some(Self::Ticker),
            "Roller" => Some(Self::Roller),
            "Promo" => Some(Self::Promo),
            "CG" => Some(Self::Cg),
            _ => None,
        }
    }

    /// Payload defaults applied before template fields.
    pub fn default_fields(self) -> Map<String, Value> {
        let value = match self {
            Self::Super => json!({
                "position": "",
                "person": "",
                "title": "",
                "onPhone": false,
                "effect": "Cut",
            }),
            Self::Stripe => json!({
                "main": "",
                "sub": "",
                "titleSize": "Medium",
                "effect": "Cut",
            }),
            Self::Box => json!({
                "src": "",
                "assetType": null,
                "effect": "Push",
            }),
            Self::Counter => json!({
                "rtl": false,
                "counterType": "down",
                "amount": 5,
                "text": "",
                "effect": "Wipe",
            }),
            Self::Finger => json!({
                "expanded": false,
                "person": "",
                "position": "bottomLeft",
                "main": "",
                "sub": [],
                "effect": "Cut",
            }),
            Self::Live => json!({
                "main": "LIVE",
                "location": "",
                "color": "#ff0000",
                "effect": "Wipe",
            }),
            Self::Ticker => json!({
                "tick": 3,
                "data": [],
                "effect": "Wipe",
            }),
            Self::Roller => json!({
                "layout": "Lower Third",
                "header": "",
                "headerBold": true,
                "headerSize": "40",
                "effect": "Cut",
            }),
            Self::Promo => json!({
                "rtl": false,
                "src": "",
                "text": "",
                "assetType": null,
                "effect": "Push",
            }),
            Self::Cg => json!({
                "src": "",
                "assetType": null,
                "effect": "Cut",
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// Persisted element record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub name: String,
    /// Rank inside the parent item.
    pub index: usize,
    /// Variant payload, opaque to the core.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Element {
    /// Creates an element with variant defaults and a fresh id.
    pub fn new(kind: ElementKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            index: 0,
            fields: kind.default_fields(),
        }
    }
}

impl Ranked for Element {
    fn rank(&self) -> usize {
        self.index
    }

    fn set_rank(&mut self, rank: usize) {
        self.index = rank;
    }
}

impl Sibling for Element {
    const LEVEL: SiblingLevel = SiblingLevel::Elements;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Creation template for an element.
///
/// `kind` is optional here so a missing type can be reported as a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementDraft {
    #[serde(rename = "type", default)]
    pub kind: Option<ElementKind>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl ElementDraft {
    /// Draft with just a type set.
    pub fn of_kind(kind: ElementKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Builds the element, layering template fields over variant defaults.
    ///
    /// An unnamed draft takes its type label as name. Returns `None` when the
    /// draft has no type.
    pub fn into_element(self) -> Option<Element> {
        let kind = self.kind?;
        let mut element = Element::new(
            kind,
            self.name.unwrap_or_else(|| kind.as_str().to_string()),
        );
        for (key, value) in self.fields {
            element.fields.insert(key, value);
        }
        Some(element)
    }
}
