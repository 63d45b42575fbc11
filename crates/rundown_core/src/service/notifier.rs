//! Change notification seam.
//!
//! # Invariants
//! - Services call `notify_changed` once per successful mutation and never for
//!   a rejected or partially applied one.

use crate::model::SiblingLevel;
use crate::reorder::ReorderOp;
use log::info;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Project-level mutation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectChange {
    Created,
    Deleted,
    Renamed,
    SettingsUpdated,
}

impl ProjectChange {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::SettingsUpdated => "settings_updated",
        }
    }
}

/// What changed under the notified parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The project document itself changed.
    Project(ProjectChange),
    /// A sibling list was structurally edited.
    Siblings { level: SiblingLevel, op: ReorderOp },
    /// A member of the list was renamed; order untouched.
    Renamed(SiblingLevel),
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project(change) => write!(f, "project.{}", change.as_str()),
            Self::Siblings { level, op } => write!(f, "{level}.{op}"),
            Self::Renamed(level) => write!(f, "{level}.rename"),
        }
    }
}

/// Receives change notifications after successful mutations.
pub trait ChangeNotifier {
    fn notify_changed(&self, parent: Uuid, kind: ChangeKind);
}

impl<N: ChangeNotifier + ?Sized> ChangeNotifier for &N {
    fn notify_changed(&self, parent: Uuid, kind: ChangeKind) {
        (**self).notify_changed(parent, kind);
    }
}

/// Discards notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl ChangeNotifier for NullNotifier {
    fn notify_changed(&self, _parent: Uuid, _kind: ChangeKind) {}
}

/// Emits one `info` event per notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl ChangeNotifier for LogNotifier {
    fn notify_changed(&self, parent: Uuid, kind: ChangeKind) {
        info!("event=change_notified module=service parent={parent} kind={kind}");
    }
}
