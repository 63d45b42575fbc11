//! Referential store: projects, items and elements as separate rows.
//!
//! # Responsibility
//! - Keep sibling order in the parent's JSON reference array.
//! - Keep each child's `position` column and back-reference in step with it.
//!
//! # Invariants
//! - A single pull or push is atomic; a multi-step rewrite is not.
//! - A pulled member keeps its own row with a NULL back-reference until it is
//!   pushed again or purged.
//! - Reads follow reference order and skip references without a row.

use super::{
    bool_to_int, decode_json, encode_json, ensure_connection_ready, parse_flag, parse_uuid,
    OrderedCollectionStore, ProjectStore, StorageLayout, StoreError, StoreResult, WriteAck,
};
use crate::model::element::{Element, ElementKind};
use crate::model::item::Item;
use crate::model::project::{name_key, Project, ProjectId, ProjectSettings, ProjectSummary};
use crate::model::Sibling;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Column wiring between one parent table and its child table.
struct Links {
    parent_table: &'static str,
    parent_key: &'static str,
    refs_column: &'static str,
    child_table: &'static str,
    child_key: &'static str,
    back_ref: &'static str,
}

const ITEM_LINKS: Links = Links {
    parent_table: "projects",
    parent_key: "project_uuid",
    refs_column: "item_refs",
    child_table: "items",
    child_key: "item_uuid",
    back_ref: "project_uuid",
};

const ELEMENT_LINKS: Links = Links {
    parent_table: "items",
    parent_key: "item_uuid",
    refs_column: "element_refs",
    child_table: "elements",
    child_key: "element_uuid",
    back_ref: "item_uuid",
};

impl Links {
    fn load_refs(&self, conn: &Connection, parent: Uuid) -> StoreResult<Option<Vec<Uuid>>> {
        let sql = format!(
            "SELECT {refs} FROM {table} WHERE {key} = ?1;",
            refs = self.refs_column,
            table = self.parent_table,
            key = self.parent_key,
        );
        let text: Option<String> = conn
            .query_row(&sql, [parent.to_string()], |row| row.get(0))
            .optional()?;
        text.map(|value| decode_refs(&value)).transpose()
    }

    fn store_refs(&self, conn: &Connection, parent: Uuid, refs: &[Uuid]) -> StoreResult<usize> {
        let sql = format!(
            "UPDATE {table}
             SET {refs} = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE {key} = ?1;",
            refs = self.refs_column,
            table = self.parent_table,
            key = self.parent_key,
        );
        let changed = conn.execute(&sql, params![parent.to_string(), encode_refs(refs)?])?;
        Ok(changed)
    }

    fn pull(&self, conn: &Connection, parent: Uuid, member: Uuid) -> StoreResult<WriteAck> {
        let Some(mut refs) = self.load_refs(conn, parent)? else {
            return Ok(WriteAck::NONE);
        };
        let before = refs.len();
        refs.retain(|id| *id != member);
        if refs.len() == before {
            return Ok(WriteAck::NONE);
        }
        let changed = self.store_refs(conn, parent, &refs)?;

        let detach_sql = format!(
            "UPDATE {child}
             SET {back_ref} = NULL,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE {child_key} = ?1 AND {back_ref} = ?2;",
            child = self.child_table,
            back_ref = self.back_ref,
            child_key = self.child_key,
        );
        conn.execute(&detach_sql, params![member.to_string(), parent.to_string()])?;
        Ok(WriteAck::changed(changed))
    }

    fn push_ref(
        &self,
        conn: &Connection,
        parent: Uuid,
        member: Uuid,
        position: usize,
    ) -> StoreResult<WriteAck> {
        let Some(mut refs) = self.load_refs(conn, parent)? else {
            return Ok(WriteAck::NONE);
        };
        let at = position.min(refs.len());
        refs.insert(at, member);
        Ok(WriteAck::changed(self.store_refs(conn, parent, &refs)?))
    }

    fn locate_parent(&self, conn: &Connection, member: Uuid) -> StoreResult<Option<Uuid>> {
        let sql = format!(
            "SELECT {back_ref} FROM {child} WHERE {child_key} = ?1;",
            back_ref = self.back_ref,
            child = self.child_table,
            child_key = self.child_key,
        );
        let parent: Option<Option<String>> = conn
            .query_row(&sql, [member.to_string()], |row| row.get(0))
            .optional()?;
        parent
            .flatten()
            .map(|value| parse_uuid(&value, "back reference"))
            .transpose()
    }

    fn rename(&self, conn: &Connection, member: Uuid, name: &str) -> StoreResult<bool> {
        let sql = format!(
            "UPDATE {child}
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE {child_key} = ?1;",
            child = self.child_table,
            child_key = self.child_key,
        );
        Ok(conn.execute(&sql, params![member.to_string(), name])? > 0)
    }

    fn write_positions<M: Sibling>(&self, conn: &Connection, siblings: &[M]) -> StoreResult<()> {
        let sql = format!(
            "UPDATE {child}
             SET position = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE {child_key} = ?1 AND position <> ?2;",
            child = self.child_table,
            child_key = self.child_key,
        );
        let mut stmt = conn.prepare(&sql)?;
        for member in siblings {
            stmt.execute(params![member.id().to_string(), member.rank() as i64])?;
        }
        Ok(())
    }
}

/// SQLite-backed store with one row per entity.
pub struct ReferentialStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ReferentialStore<'conn> {
    /// Creates store from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn, &["projects", "items", "elements"])?;
        Ok(Self { conn })
    }

    fn begin(&self) -> StoreResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

/// Rewrites the reference array of `parent` to match `siblings`, one pull or
/// push at a time, then refreshes every `position` column.
fn align_siblings<M, S>(
    store: &S,
    links: &Links,
    conn: &Connection,
    parent: Uuid,
    siblings: &[M],
) -> StoreResult<()>
where
    M: Sibling,
    S: OrderedCollectionStore<M>,
{
    let mut refs = links
        .load_refs(conn, parent)?
        .ok_or(StoreError::ParentMissing(parent))?;

    for (slot, member) in siblings.iter().enumerate() {
        let id = member.id();
        if refs.get(slot) == Some(&id) {
            continue;
        }
        if refs.contains(&id) {
            let ack = OrderedCollectionStore::<M>::pull_member(store, parent, id)?;
            if !ack.is_single() {
                return Err(StoreError::PullUnconfirmed { member: id, ack });
            }
            refs.retain(|existing| *existing != id);
        }
        let ack = store.push_member(parent, member, slot)?;
        if !ack.is_single() {
            return Err(StoreError::PushUnconfirmed { member: id, ack });
        }
        let at = slot.min(refs.len());
        refs.insert(at, id);
    }

    for stale in refs.split_off(siblings.len()) {
        if siblings.iter().any(|member| member.id() == stale) {
            continue;
        }
        let ack = OrderedCollectionStore::<M>::pull_member(store, parent, stale)?;
        if !ack.is_single() {
            return Err(StoreError::PullUnconfirmed { member: stale, ack });
        }
    }

    links.write_positions(conn, siblings)
}

impl OrderedCollectionStore<Item> for ReferentialStore<'_> {
    fn layout(&self) -> StorageLayout {
        StorageLayout::Referential
    }

    fn load_siblings(&self, parent: Uuid) -> StoreResult<Option<Vec<Item>>> {
        match ITEM_LINKS.load_refs(self.conn, parent)? {
            Some(refs) => Ok(Some(load_items(self.conn, &refs)?)),
            None => Ok(None),
        }
    }

    fn save_siblings(&self, parent: Uuid, siblings: &[Item]) -> StoreResult<()> {
        align_siblings(self, &ITEM_LINKS, self.conn, parent, siblings)
    }

    fn locate_parent(&self, member: Uuid) -> StoreResult<Option<Uuid>> {
        ITEM_LINKS.locate_parent(self.conn, member)
    }

    fn load_member(&self, member: Uuid) -> StoreResult<Option<Item>> {
        load_item(self.conn, member)
    }

    fn rename_member(&self, member: Uuid, name: &str) -> StoreResult<bool> {
        ITEM_LINKS.rename(self.conn, member, name)
    }

    fn pull_member(&self, parent: Uuid, member: Uuid) -> StoreResult<WriteAck> {
        let tx = self.begin()?;
        let ack = ITEM_LINKS.pull(&tx, parent, member)?;
        tx.commit()?;
        Ok(ack)
    }

    fn push_member(&self, parent: Uuid, entry: &Item, position: usize) -> StoreResult<WriteAck> {
        let tx = self.begin()?;
        if ITEM_LINKS.load_refs(&tx, parent)?.is_none() {
            return Ok(WriteAck::NONE);
        }
        upsert_item(&tx, parent, entry)?;
        let ack = ITEM_LINKS.push_ref(&tx, parent, entry.id, position)?;
        tx.commit()?;
        Ok(ack)
    }

    fn purge_member(&self, member: Uuid) -> StoreResult<()> {
        let tx = self.begin()?;
        tx.execute(
            "DELETE FROM elements WHERE item_uuid = ?1;",
            [member.to_string()],
        )?;
        tx.execute(
            "DELETE FROM items WHERE item_uuid = ?1;",
            [member.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl OrderedCollectionStore<Element> for ReferentialStore<'_> {
    fn layout(&self) -> StorageLayout {
        StorageLayout::Referential
    }

    fn load_siblings(&self, parent: Uuid) -> StoreResult<Option<Vec<Element>>> {
        match ELEMENT_LINKS.load_refs(self.conn, parent)? {
            Some(refs) => Ok(Some(load_elements(self.conn, &refs)?)),
            None => Ok(None),
        }
    }

    fn save_siblings(&self, parent: Uuid, siblings: &[Element]) -> StoreResult<()> {
        align_siblings(self, &ELEMENT_LINKS, self.conn, parent, siblings)
    }

    fn locate_parent(&self, member: Uuid) -> StoreResult<Option<Uuid>> {
        ELEMENT_LINKS.locate_parent(self.conn, member)
    }

    fn load_member(&self, member: Uuid) -> StoreResult<Option<Element>> {
        load_element(self.conn, member)
    }

    fn rename_member(&self, member: Uuid, name: &str) -> StoreResult<bool> {
        ELEMENT_LINKS.rename(self.conn, member, name)
    }

    fn pull_member(&self, parent: Uuid, member: Uuid) -> StoreResult<WriteAck> {
        let tx = self.begin()?;
        let ack = ELEMENT_LINKS.pull(&tx, parent, member)?;
        tx.commit()?;
        Ok(ack)
    }

    fn push_member(
        &self,
        parent: Uuid,
        entry: &Element,
        position: usize,
    ) -> StoreResult<WriteAck> {
        let tx = self.begin()?;
        if ELEMENT_LINKS.load_refs(&tx, parent)?.is_none() {
            return Ok(WriteAck::NONE);
        }
        upsert_element(&tx, parent, entry)?;
        let ack = ELEMENT_LINKS.push_ref(&tx, parent, entry.id, position)?;
        tx.commit()?;
        Ok(ack)
    }

    fn purge_member(&self, member: Uuid) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM elements WHERE element_uuid = ?1;",
            [member.to_string()],
        )?;
        Ok(())
    }
}

impl ProjectStore for ReferentialStore<'_> {
    fn list_projects(&self) -> StoreResult<Vec<ProjectSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT project_uuid, name, json_array_length(item_refs)
             FROM projects
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
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn find_project_by_name(&self, name: &str) -> StoreResult<Option<ProjectSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT project_uuid, name, json_array_length(item_refs)
             FROM projects
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
        let row = self
            .conn
            .query_row(
                "SELECT name, settings_json, item_refs, created_at, updated_at
                 FROM projects
                 WHERE project_uuid = ?1;",
                [project_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((name, settings_text, refs_text, created_at, updated_at)) = row else {
            return Ok(None);
        };

        Ok(Some(Project {
            id: project_id,
            name,
            settings: decode_json(&settings_text, "projects.settings_json")?,
            items: load_items(self.conn, &decode_refs(&refs_text)?)?,
            created_at,
            updated_at,
        }))
    }

    fn insert_project(&self, project: &Project) -> StoreResult<()> {
        let refs: Vec<Uuid> = project.items.iter().map(|item| item.id).collect();
        let tx = self.begin()?;
        tx.execute(
            "INSERT INTO projects (
                project_uuid,
                name,
                name_key,
                settings_json,
                item_refs
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                project.id.to_string(),
                project.name.as_str(),
                name_key(&project.name),
                encode_json(&project.settings, "projects.settings_json")?,
                encode_refs(&refs)?,
            ],
        )?;
        for item in &project.items {
            upsert_item(&tx, project.id, item)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn rename_project(&self, project_id: ProjectId, name: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE projects
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
            "UPDATE projects
             SET settings_json = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE project_uuid = ?1;",
            params![
                project_id.to_string(),
                encode_json(settings, "projects.settings_json")?,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_project(&self, project_id: ProjectId) -> StoreResult<bool> {
        let id = project_id.to_string();
        let tx = self.begin()?;
        tx.execute(
            "DELETE FROM elements
             WHERE item_uuid IN (SELECT item_uuid FROM items WHERE project_uuid = ?1);",
            [&id],
        )?;
        tx.execute("DELETE FROM items WHERE project_uuid = ?1;", [&id])?;
        let changed = tx.execute("DELETE FROM projects WHERE project_uuid = ?1;", [&id])?;
        tx.commit()?;
        Ok(changed > 0)
    }
}

/// Writes an item row attached to `parent` and replaces its element rows.
fn upsert_item(conn: &Connection, parent: Uuid, item: &Item) -> StoreResult<()> {
    let element_refs: Vec<Uuid> = item.elements.iter().map(|element| element.id).collect();
    conn.execute(
        "INSERT INTO items (
            item_uuid,
            project_uuid,
            name,
            expanded,
            options,
            position,
            element_refs
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(item_uuid) DO UPDATE SET
            project_uuid = excluded.project_uuid,
            name = excluded.name,
            expanded = excluded.expanded,
            options = excluded.options,
            position = excluded.position,
            element_refs = excluded.element_refs,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            item.id.to_string(),
            parent.to_string(),
            item.name.as_str(),
            bool_to_int(item.expanded),
            bool_to_int(item.options),
            item.index as i64,
            encode_refs(&element_refs)?,
        ],
    )?;

    conn.execute(
        "DELETE FROM elements WHERE item_uuid = ?1;",
        [item.id.to_string()],
    )?;
    for element in &item.elements {
        upsert_element(conn, item.id, element)?;
    }
    Ok(())
}

fn upsert_element(conn: &Connection, parent: Uuid, element: &Element) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO elements (
            element_uuid,
            item_uuid,
            type,
            name,
            position,
            payload_json
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(element_uuid) DO UPDATE SET
            item_uuid = excluded.item_uuid,
            type = excluded.type,
            name = excluded.name,
            position = excluded.position,
            payload_json = excluded.payload_json,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            element.id.to_string(),
            parent.to_string(),
            element.kind.as_str(),
            element.name.as_str(),
            element.index as i64,
            encode_json(&element.fields, "elements.payload_json")?,
        ],
    )?;
    Ok(())
}

fn load_items(conn: &Connection, refs: &[Uuid]) -> StoreResult<Vec<Item>> {
    let mut items = Vec::with_capacity(refs.len());
    for id in refs {
        match load_item(conn, *id)? {
            Some(item) => items.push(item),
            None => warn!(
                "event=dangling_ref module=store status=skipped level=items member={id}"
            ),
        }
    }
    Ok(items)
}

fn load_item(conn: &Connection, item_id: Uuid) -> StoreResult<Option<Item>> {
    let row = conn
        .query_row(
            "SELECT name, expanded, options, position, element_refs
             FROM items
             WHERE item_uuid = ?1;",
            [item_id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;
    let Some((name, expanded, options, position, refs_text)) = row else {
        return Ok(None);
    };

    Ok(Some(Item {
        id: item_id,
        name,
        expanded: parse_flag(expanded, "items.expanded")?,
        options: parse_flag(options, "items.options")?,
        index: parse_position(position, "items.position")?,
        elements: load_elements(conn, &decode_refs(&refs_text)?)?,
    }))
}

fn load_elements(conn: &Connection, refs: &[Uuid]) -> StoreResult<Vec<Element>> {
    let mut elements = Vec::with_capacity(refs.len());
    for id in refs {
        match load_element(conn, *id)? {
            Some(element) => elements.push(element),
            None => warn!(
                "event=dangling_ref module=store status=skipped level=elements member={id}"
            ),
        }
    }
    Ok(elements)
}

fn load_element(conn: &Connection, element_id: Uuid) -> StoreResult<Option<Element>> {
    let mut stmt = conn.prepare(
        "SELECT element_uuid, type, name, position, payload_json
         FROM elements
         WHERE element_uuid = ?1;",
    )?;
    let mut rows = stmt.query([element_id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_element_row(row)?)),
        None => Ok(None),
    }
}

fn parse_element_row(row: &Row<'_>) -> StoreResult<Element> {
    let id_text: String = row.get(0)?;
    let kind_text: String = row.get(1)?;
    let position: i64 = row.get(3)?;
    let payload_text: String = row.get(4)?;
    let kind = ElementKind::parse(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid element type `{kind_text}` in elements.type"))
    })?;

    Ok(Element {
        id: parse_uuid(&id_text, "elements.element_uuid")?,
        kind,
        name: row.get(2)?,
        index: parse_position(position, "elements.position")?,
        fields: decode_json(&payload_text, "elements.payload_json")?,
    })
}

fn parse_summary_row(row: &Row<'_>) -> StoreResult<ProjectSummary> {
    let id_text: String = row.get(0)?;
    let item_count: i64 = row.get(2)?;
    Ok(ProjectSummary {
        id: parse_uuid(&id_text, "projects.project_uuid")?,
        name: row.get(1)?,
        item_count: item_count.max(0) as usize,
    })
}

fn parse_position(value: i64, column: &'static str) -> StoreResult<usize> {
    usize::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("negative position `{value}` in {column}")))
}

fn decode_refs(value: &str) -> StoreResult<Vec<Uuid>> {
    decode_json(value, "reference array")
}

fn encode_refs(refs: &[Uuid]) -> StoreResult<String> {
    encode_json(refs, "reference array")
}
