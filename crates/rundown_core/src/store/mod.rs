//! Ordered-collection storage contracts and SQLite backends.
//!
//! # Responsibility
//! - Define the persistence seam the services are written against.
//! - Provide two interchangeable layouts over one SQLite database:
//!   an embedded whole-document layout and a referential layout.
//!
//! # Invariants
//! - `save_siblings` either applies the full list or fails; on the
//!   referential layout a failure can leave earlier pull/push steps applied.
//! - `pull_member`/`push_member` report how many parent documents matched and
//!   changed, so callers can detect a write that did not land.
//! - Member order returned by `load_siblings` is the persisted order, with
//!   each member's stored `index` left as found.

pub mod embedded;
pub mod referential;

pub use embedded::EmbeddedStore;
pub use referential::ReferentialStore;

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::element::Element;
use crate::model::item::Item;
use crate::model::project::{Project, ProjectId, ProjectSettings, ProjectSummary};
use crate::model::Sibling;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use uuid::Uuid;

/// Physical layout of sibling lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageLayout {
    /// Parent document physically contains its children array.
    Embedded,
    /// Children are separate rows; order lives in a parent-side reference array.
    Referential,
}

impl StorageLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Referential => "referential",
        }
    }

    /// Parses a layout name (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "embedded" => Some(Self::Embedded),
            "referential" => Some(Self::Referential),
            _ => None,
        }
    }
}

impl Display for StorageLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome counters for a single-document update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteAck {
    /// Parent documents matched by the update filter.
    pub matched: usize,
    /// Parent documents actually changed.
    pub modified: usize,
}

impl WriteAck {
    /// Nothing matched, nothing changed.
    pub const NONE: Self = Self {
        matched: 0,
        modified: 0,
    };

    /// Ack for an update that changed exactly `changed` rows.
    pub fn changed(changed: usize) -> Self {
        Self {
            matched: changed,
            modified: changed,
        }
    }

    /// Returns whether exactly one document matched and changed.
    pub fn is_single(&self) -> bool {
        self.matched == 1 && self.modified == 1
    }
}

impl Display for WriteAck {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "matched={} modified={}", self.matched, self.modified)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    #[error(transparent)]
    Db(#[from] DbError),
    /// Parent document does not exist.
    #[error("parent document not found: {0}")]
    ParentMissing(Uuid),
    /// A pull step inside a multi-step write did not confirm one document.
    #[error("pull of {member} was not confirmed ({ack})")]
    PullUnconfirmed { member: Uuid, ack: WriteAck },
    /// A push step inside a multi-step write did not confirm one document.
    #[error("push of {member} was not confirmed ({ack})")]
    PushUnconfirmed { member: Uuid, ack: WriteAck },
    /// Connection schema is not at the expected migrated version.
    #[error("store requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    #[error("store requires table `{0}`")]
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Project-level persistence.
pub trait ProjectStore {
    /// Lists all projects in creation order.
    fn list_projects(&self) -> StoreResult<Vec<ProjectSummary>>;
    /// Counts all projects.
    fn count_projects(&self) -> StoreResult<usize>;
    /// Finds one project by case-insensitive name.
    fn find_project_by_name(&self, name: &str) -> StoreResult<Option<ProjectSummary>>;
    /// Loads one project with items and elements populated.
    fn load_project(&self, project_id: ProjectId) -> StoreResult<Option<Project>>;
    /// Persists a new project including its initial items.
    fn insert_project(&self, project: &Project) -> StoreResult<()>;
    /// Renames one project. Returns `false` when it does not exist.
    fn rename_project(&self, project_id: ProjectId, name: &str) -> StoreResult<bool>;
    /// Replaces the settings bag. Returns `false` when the project does not exist.
    fn update_settings(&self, project_id: ProjectId, settings: &ProjectSettings)
        -> StoreResult<bool>;
    /// Deletes one project with all items and elements.
    fn delete_project(&self, project_id: ProjectId) -> StoreResult<bool>;
}

/// Sibling-list persistence for one member type.
pub trait OrderedCollectionStore<M: Sibling> {
    /// Layout backing this store.
    fn layout(&self) -> StorageLayout;
    /// Loads the ordered members of `parent`, or `None` when it does not exist.
    fn load_siblings(&self, parent: Uuid) -> StoreResult<Option<Vec<M>>>;
    /// Persists `siblings` as the complete ordered list of `parent`.
    fn save_siblings(&self, parent: Uuid, siblings: &[M]) -> StoreResult<()>;
    /// Resolves the parent currently listing `member`.
    fn locate_parent(&self, member: Uuid) -> StoreResult<Option<Uuid>>;
    /// Loads one member by id.
    fn load_member(&self, member: Uuid) -> StoreResult<Option<M>>;
    /// Name-only update. Returns `false` when the member does not exist.
    fn rename_member(&self, member: Uuid, name: &str) -> StoreResult<bool>;
    /// Removes every reference to `member` from the parent's list.
    fn pull_member(&self, parent: Uuid, member: Uuid) -> StoreResult<WriteAck>;
    /// Inserts `entry` into the parent's list at `position`.
    ///
    /// Positions past the end append.
    fn push_member(&self, parent: Uuid, entry: &M, position: usize) -> StoreResult<WriteAck>;
    /// Drops a detached member's own document and its descendants.
    fn purge_member(&self, member: Uuid) -> StoreResult<()>;
}

/// A store usable for every level of the hierarchy.
pub trait Backend:
    ProjectStore + OrderedCollectionStore<Item> + OrderedCollectionStore<Element>
{
}

impl<T> Backend for T where
    T: ProjectStore + OrderedCollectionStore<Item> + OrderedCollectionStore<Element>
{
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn decode_json<T: DeserializeOwned>(value: &str, column: &'static str) -> StoreResult<T> {
    serde_json::from_str(value)
        .map_err(|err| StoreError::InvalidData(format!("invalid json in {column}: {err}")))
}

pub(crate) fn encode_json<T: Serialize + ?Sized>(value: &T, column: &'static str) -> StoreResult<String> {
    serde_json::to_string(value)
        .map_err(|err| StoreError::InvalidData(format!("cannot encode {column}: {err}")))
}

pub(crate) fn parse_flag(value: i64, column: &'static str) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{StorageLayout, WriteAck};

    #[test]
    fn layout_parse_is_case_insensitive() {
        assert_eq!(StorageLayout::parse(" Embedded "), Some(StorageLayout::Embedded));
        assert_eq!(
            StorageLayout::parse("REFERENTIAL"),
            Some(StorageLayout::Referential)
        );
        assert_eq!(StorageLayout::parse("nested"), None);
    }

    #[test]
    fn only_one_matched_and_modified_counts_as_single() {
        assert!(WriteAck::changed(1).is_single());
        assert!(!WriteAck::NONE.is_single());
        assert!(!WriteAck {
            matched: 1,
            modified: 0
        }
        .is_single());
        assert!(!WriteAck::changed(2).is_single());
    }
}
