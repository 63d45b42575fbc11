//! Domain model for the project → item → element hierarchy.
//!
//! # Responsibility
//! - Define the records persisted by both storage backends.
//! - Describe what a sibling list member looks like to generic code.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - `index` on items and elements equals the member's rank in its parent.
//! - Element payload fields are opaque; only `type` and `name` are read.

pub mod element;
pub mod item;
pub mod project;

use crate::reorder::Ranked;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Which sibling list a member belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiblingLevel {
    /// Items ordered inside a project.
    Items,
    /// Elements ordered inside an item.
    Elements,
}

impl SiblingLevel {
    /// Stable lowercase name used in logs and notifications.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::Elements => "elements",
        }
    }

    /// Name of the parent kind owning this list.
    pub fn parent_kind(self) -> &'static str {
        match self {
            Self::Items => "project",
            Self::Elements => "item",
        }
    }
}

impl Display for SiblingLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member of an ordered sibling list.
pub trait Sibling: Ranked + Clone {
    /// Level this member type lives on.
    const LEVEL: SiblingLevel;

    /// Stable member id.
    fn id(&self) -> Uuid;

    /// User-facing label.
    fn name(&self) -> &str;
}
