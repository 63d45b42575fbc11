//! Item records: ordered children of a project, parents of elements.

use super::element::{Element, ElementDraft};
use super::{Sibling, SiblingLevel};
use crate::reorder::Ranked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable item identifier.
pub type ItemId = Uuid;

/// Name given to items created without one.
pub const DEFAULT_ITEM_NAME: &str = "New Example Item";

/// Persisted item record with its elements in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Opaque UI state.
    pub expanded: bool,
    /// Opaque UI state.
    pub options: bool,
    /// Rank inside the parent project.
    pub index: usize,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Item {
    /// Creates an empty, expanded item with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            expanded: true,
            options: false,
            index: 0,
            elements: Vec::new(),
        }
    }
}

impl Ranked for Item {
    fn rank(&self) -> usize {
        self.index
    }

    fn set_rank(&mut self, rank: usize) {
        self.index = rank;
    }
}

impl Sibling for Item {
    const LEVEL: SiblingLevel = SiblingLevel::Items;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Creation template for an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub expanded: Option<bool>,
    #[serde(default)]
    pub options: Option<bool>,
    /// Elements created inside the new item, in order.
    #[serde(default)]
    pub elements: Vec<ElementDraft>,
}

impl ItemDraft {
    /// Draft with just a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}
