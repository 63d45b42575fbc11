//! Embedded-array store: items and their elements nested in one project row.
//!
//! # Responsibility
//! - Persist each project as a single document whose `items_json` column
//!   holds the full item/element tree in order.
//!
//! # Invariants
//! - Every sibling write replaces `items_json` with one UPDATE statement, so
//!   a reader sees either the old or the new list.
//! - Writers do not lock across read-modify-write; the last replace wins.

use super::{
    decode_json, encode_json, ensure_connection_ready, parse_uuid, OrderedCollectionStore,
    ProjectStore, StorageLayout, StoreError, StoreResult, WriteAck,
};
use crate::model::element::Element;
use crate::model::item::Item;
use crate::model::project::{name_key, Project, ProjectId, ProjectSettings, ProjectSummary};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT
    project_uuid,
    name,
    settings_json,
    items_json,
    created_at,
    updated_at
FROM embedded_projects";

/// SQLite-backed whole-document store.
pub struct EmbeddedStore<'conn> {
    conn: &'conn Connection,
}

struct ItemOwner {
    project_id: ProjectId,
    items: Vec<Item>,
    slot: usize,
}

struct ElementOwner {
    project_id: ProjectId,
    items: Vec<Item>,
    item_slot: usize,
    element_slot: usize,
}

impl<'conn> EmbeddedStore<'conn> {
    /// Creates store from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn, &["embedded_projects"])?;
        Ok(Self { conn })
    }

    fn read_items(&self, project_id: ProjectId) -> StoreResult<Option<Vec<Item>>> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT items_json
                 FROM embedded_projects
                 WHERE project_uuid = ?1;",
                [project_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        text.map(|value| decode_json(&value, "embedded_projects.items_json"))
            .transpose()
    }

    fn write_items(&self, project_id: ProjectId, items: &[Item]) -> StoreResult<usize> {
        let encoded = encode_json(items, "embedded_projects.items_json")?;
        let changed = self.conn.execute(
            "UPDATE embedded_projects
             SET items_json = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE project_uuid = ?1;",
            params![project_id.to_string(), encoded],
        )?;
        Ok(changed)
    }

    /// Scans documents mentioning `needle` and returns the first one accepted
    /// by `accept`.
    fn scan_documents<T>(
        &self,
        needle: Uuid,
        mut accept: impl FnMut(ProjectId, Vec<Item>) -> Option<T>,
    ) -> StoreResult<Option<T>> {
        let mut stmt = self.conn.prepare(
            "SELECT project_uuid, items_json
             FROM embedded_projects
             WHERE instr(items_json, ?1) > 0
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([needle.to_string()])?;
        while let Some(row) = rows.next()? {
            let project_text: String = row.get(0)?;
            let items_text: String = row.get(1)?;
            let project_id = parse_uuid(&project_text, "embedded_projects.project_uuid")?;
            let items = decode_json(&items_text, "embedded_projects.items_json")?;
            if let Some(found) = accept(project_id, items) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn find_item_owner(&self, item_id: Uuid) -> StoreResult<Option<ItemOwner>> {
        self.scan_documents(item_id, |project_id, items| {
            let slot = items.iter().position(|item| item.id == item_id)?;
            Some(ItemOwner {
                project_id,
                items,
                slot,
            })
        })
    }

    fn find_element_owner(&self, element_id: Uuid) -> StoreResult<Option<ElementOwner>> {
        self.scan_documents(element_id, |project_id, items| {
            let (item_slot, element_slot) =
                items.iter().enumerate().find_map(|(item_slot, item)| {
                    item.elements
                        .iter()
                        .position(|element| element.id == element_id)
                        .map(|element_slot| (item_slot, element_slot))
                })?;
            Some(ElementOwner {
                project_id,
                items,
                item_slot,
                element_slot,
            })
        })
    }
}

impl OrderedCollectionStore<Item> for EmbeddedStore<'_> {
    fn layout(&self) -> StorageLayout {
        StorageLayout::Embedded
    }

    fn load_siblings(&self, parent: Uuid) -> StoreResult<Option<Vec<Item>>> {
        self.read_items(parent)
    }

    fn save_siblings(&self, parent: Uuid, siblings: &[Item]) -> StoreResult<()> {
        if self.write_items(parent, siblings)? == 0 {
            return Err(StoreError::ParentMissing(parent));
        }
        Ok(())
    }

    fn locate_parent(&self, member: Uuid) -> StoreResult<Option<Uuid>> {
        Ok(self.find_item_owner(member)?.map(|owner| owner.project_id))
    }

    fn load_member(&self, member: Uuid) -> StoreResult<Option<Item>> {
        Ok(self
            .find_item_owner(member)?
            .map(|mut owner| owner.items.swap_remove(owner.slot)))
    }

    fn rename_member(&self, member: Uuid, name: &str) -> StoreResult<bool> {
        let Some(mut owner) = self.find_item_owner(member)? else {
            return Ok(false);
        };
        owner.items[owner.slot].name = name.to_string();
        Ok(self.write_items(owner.project_id, &owner.items)? == 1)
    }

    fn pull_member(&self, parent: Uuid, member: Uuid) -> StoreResult<WriteAck> {
        let Some(mut items) = self.read_items(parent)? else {
            return Ok(WriteAck::NONE);
        };
        let before = items.len();
        items.retain(|item| item.id != member);
        if items.len() == before {
            return Ok(WriteAck::NONE);
        }
        Ok(WriteAck::changed(self.write_items(parent, &items)?))
    }

    fn push_member(&self, parent: Uuid, entry: &Item, position: usize) -> StoreResult<WriteAck> {
        let Some(mut items) = self.read_items(parent)? else {
            return Ok(WriteAck::NONE);
        };
        let at = position.min(items.len());
        items.insert(at, entry.clone());
        Ok(WriteAck::changed(self.write_items(parent, &items)?))
    }

    fn purge_member(&self, _member: Uuid) -> StoreResult<()> {
        // The item lived only inside its parent document.
        Ok(())
    }
}

impl OrderedCollectionStore<Element> for EmbeddedStore<'_> {
    fn layout(&self) -> StorageLayout {
        StorageLayout::Embedded
    }

    fn load_siblings(&self, parent: Uuid) -> StoreResult<Option<Vec<Element>>> {
        Ok(self
            .find_item_owner(parent)?
            .map(|mut owner| owner.items.swap_remove(owner.slot).elements))
    }

    fn save_siblings(&self, parent: Uuid, siblings: &[Element]) -> StoreResult<()> {
        let mut owner = self
            .find_item_owner(parent)?
            .ok_or(StoreError::ParentMissing(parent))?;
        owner.items[owner.slot].elements = siblings.to_vec();
        if self.write_items(owner.project_id, &owner.items)? == 0 {
            return Err(StoreError::ParentMissing(parent));
        }
        Ok(())
    }

    fn locate_parent(&self, member: Uuid) -> StoreResult<Option<Uuid>> {
        Ok(self
            .find_element_owner(member)?
            .map(|owner| owner.items[owner.item_slot].id))
    }

    fn load_member(&self, member: Uuid) -> StoreResult<Option<Element>> {
        Ok(self.find_element_owner(member)?.map(|mut owner| {
            owner
                .items
                .swap_remove(owner.item_slot)
                .elements
                .swap_remove(owner.element_slot)
        }))
    }

    fn rename_member(&self, member: Uuid, name: &str) -> StoreResult<bool> {
        let Some(mut owner) = self.find_element_owner(member)? else {
            return Ok(false);
        };
        owner.items[owner.item_slot].elements[owner.element_slot].name = name.to_string();
        Ok(self.write_items(owner.project_id, &owner.items)? == 1)
    }

    fn pull_member(&self, parent: Uuid, member: Uuid) -> StoreResult<WriteAck> {
        let Some(mut owner) = self.find_item_owner(parent)? else {
            return Ok(WriteAck::NONE);
        };
        let elements = &mut owner.items[owner.slot].elements;
        let before = elements.len();
        elements.retain(|element| element.id != member);
        if elements.len() == before {
            return Ok(WriteAck::NONE);
        }
        Ok(WriteAck::changed(
            self.write_items(owner.project_id, &owner.items)?,
        ))
    }

    fn push_member(
        &self,
        parent: Uuid,
        entry: &Element,
        position: usize,
    ) -> StoreResult<WriteAck> {
        let Some(mut owner) = self.find_item_owner(parent)? else {
            return Ok(WriteAck::NONE);
        };
        let elements = &mut owner.items[owner.slot].elements;
        let at = position.min(elements.len());
        elements.insert(at, entry.clone());
        Ok(WriteAck::changed(
            self.write_items(owner.project_id, &owner.items)?,
        ))
    }

    fn purge_member(&self, _member: Uuid) -> StoreResult<()> {
        Ok(())
    }
}

impl ProjectStore for EmbeddedStore<'_> {
    fn list_projects(&self) -> StoreResult<Vec<ProjectSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT project_uuid, name, json_array_length(items_json)
             FROM embedded_projects
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_summary_row(row)?);
        }
        Ok(projects)
    }

    fn count_projects(&self) -> StoreResult<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM embedded_projects;", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn find_project_by_name(&self, name: &str) -> StoreResult<Option<ProjectSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT project_uuid, name, json_array_length(items_json)
             FROM embedded_projects
             WHERE name_key = ?1
             ORDER BY rowid ASC
             LIMIT 1;",
        )?;
        let mut rows = stmt.query([name_key(name)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_summary_row(row)?));
        }
        Ok(None)
    }

    fn load_project(&self, project_id: ProjectId) -> StoreResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE project_uuid = ?1;"))?;
        let mut rows = stmt.query([project_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn insert_project(&self, project: &Project) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO embedded_projects (
                project_uuid,
                name,
                name_key,
                settings_json,
                items_json
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                project.id.to_string(),
                project.name.as_str(),
                name_key(&project.name),
                encode_json(&project.settings, "embedded_projects.settings_json")?,
                encode_json(&project.items, "embedded_projects.items_json")?,
            ],
        )?;
        Ok(())
    }

    fn rename_project(&self, project_id: ProjectId, name: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE embedded_projects
             SET name = ?2,
                 name_key = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE project_uuid = ?1;",
            params![project_id.to_string(), name, name_key(name)],
        )?;
        Ok(changed > 0)
    }

    fn update_settings(
        &self,
        project_id: ProjectId,
        settings: &ProjectSettings,
    ) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE embedded_projects
             SET settings_json = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE project_uuid = ?1;",
            params![
                project_id.to_string(),
                encode_json(settings, "embedded_projects.settings_json")?,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_project(&self, project_id: ProjectId) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM embedded_projects WHERE project_uuid = ?1;",
            [project_id.to_string()],
        )?;
        Ok(changed > 0)
    }
}

fn parse_summary_row(row: &Row<'_>) -> StoreResult<ProjectSummary> {
    let id_text: String = row.get(0)?;
    let item_count: i64 = row.get(2)?;
    Ok(ProjectSummary {
        id: parse_uuid(&id_text, "embedded_projects.project_uuid")?,
        name: row.get(1)?,
        item_count: item_count.max(0) as usize,
    })
}

fn parse_project_row(row: &Row<'_>) -> StoreResult<Project> {
    let id_text: String = row.get("project_uuid")?;
    let settings_text: String = row.get("settings_json")?;
    let items_text: String = row.get("items_json")?;
    Ok(Project {
        id: parse_uuid(&id_text, "embedded_projects.project_uuid")?,
        name: row.get("name")?,
        settings: decode_json(&settings_text, "embedded_projects.settings_json")?,
        items: decode_json(&items_text, "embedded_projects.items_json")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
