#[macro_use]
mod support;

use rundown_core::db::open_db_in_memory;
use rundown_core::{
    ChangeKind, EmbeddedStore, Item, ItemDraft, OrderedCollectionService, OrderedCollectionStore,
    ReferentialStore, RundownService, ServiceError, SiblingLevel, StorageLayout, StoreError,
    StoreResult, WriteAck,
};
use rusqlite::Connection;
use std::cell::Cell;
use support::{names, ranks, RecordingNotifier};
use uuid::Uuid;

/// Referential store whose pull/push acknowledgements can be forced to fail.
struct FaultyStore<'conn> {
    inner: ReferentialStore<'conn>,
    pull_ack: Cell<Option<WriteAck>>,
    push_ack: Cell<Option<WriteAck>>,
    pushes: Cell<usize>,
    broken_lookup: Cell<bool>,
}

impl<'conn> FaultyStore<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            inner: ReferentialStore::try_new(conn).unwrap(),
            pull_ack: Cell::new(None),
            push_ack: Cell::new(None),
            pushes: Cell::new(0),
            broken_lookup: Cell::new(false),
        }
    }
}

impl OrderedCollectionStore<Item> for FaultyStore<'_> {
    fn layout(&self) -> StorageLayout {
        StorageLayout::Referential
    }

    fn load_siblings(&self, parent: Uuid) -> StoreResult<Option<Vec<Item>>> {
        OrderedCollectionStore::<Item>::load_siblings(&self.inner, parent)
    }

    fn save_siblings(&self, parent: Uuid, siblings: &[Item]) -> StoreResult<()> {
        OrderedCollectionStore::<Item>::save_siblings(&self.inner, parent, siblings)
    }

    fn locate_parent(&self, member: Uuid) -> StoreResult<Option<Uuid>> {
        if self.broken_lookup.get() {
            return Err(StoreError::InvalidData("back reference unreadable".to_string()));
        }
        OrderedCollectionStore::<Item>::locate_parent(&self.inner, member)
    }

    fn load_member(&self, member: Uuid) -> StoreResult<Option<Item>> {
        OrderedCollectionStore::<Item>::load_member(&self.inner, member)
    }

    fn rename_member(&self, member: Uuid, name: &str) -> StoreResult<bool> {
        OrderedCollectionStore::<Item>::rename_member(&self.inner, member, name)
    }

    fn pull_member(&self, parent: Uuid, member: Uuid) -> StoreResult<WriteAck> {
        match self.pull_ack.get() {
            Some(ack) => Ok(ack),
            None => OrderedCollectionStore::<Item>::pull_member(&self.inner, parent, member),
        }
    }

    fn push_member(&self, parent: Uuid, entry: &Item, position: usize) -> StoreResult<WriteAck> {
        self.pushes.set(self.pushes.get() + 1);
        match self.push_ack.get() {
            Some(ack) => Ok(ack),
            None => OrderedCollectionStore::<Item>::push_member(&self.inner, parent, entry, position),
        }
    }

    fn purge_member(&self, member: Uuid) -> StoreResult<()> {
        OrderedCollectionStore::<Item>::purge_member(&self.inner, member)
    }
}

fn seeded_project(conn: &Connection, names: &[&str]) -> Uuid {
    let events = RecordingNotifier::default();
    let service = RundownService::new(ReferentialStore::try_new(conn).unwrap(), &events);
    let project = service.create_project("Show", false).unwrap();
    let seed = project.items[0].id;
    for (offset, name) in names.iter().enumerate() {
        service
            .create_item(project.id, Some(offset as i64 + 1), Some(ItemDraft::named(*name)))
            .unwrap();
    }
    service.delete_item(seed).unwrap();
    project.id
}

fn listed(conn: &Connection, project: Uuid) -> Vec<Item> {
    let store = ReferentialStore::try_new(conn).unwrap();
    OrderedCollectionStore::<Item>::load_siblings(&store, project)
        .unwrap()
        .unwrap()
}

fn back_reference(conn: &Connection, item: Uuid) -> Option<String> {
    conn.query_row(
        "SELECT project_uuid FROM items WHERE item_uuid = ?1;",
        [item.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn unconfirmed_push_leaves_member_detached_and_skips_notification() {
    let conn = open_db_in_memory().unwrap();
    let project = seeded_project(&conn, &["A", "B", "C"]);
    let c = listed(&conn, project).remove(2);

    let store = FaultyStore::new(&conn);
    store.push_ack.set(Some(WriteAck::NONE));
    let events = RecordingNotifier::default();
    let items = OrderedCollectionService::<Item, _, _>::new(&store, &events);

    let err = items.move_up(project, 2).unwrap_err();

    assert!(matches!(
        err,
        ServiceError::PushFailed { member, ack } if member == c.id && ack == WriteAck::NONE
    ));
    assert!(err.requires_reread());
    assert_eq!(events.count(), 0);
    assert_eq!(names(&listed(&conn, project)), ["A", "B"]);
    assert_eq!(back_reference(&conn, c.id), None);

    // Re-read and repair: the detached row is still loadable and pastable.
    let detached = items.get(c.id).unwrap();
    store.push_ack.set(None);
    items.paste(project, 2, detached).unwrap();
    let repaired = listed(&conn, project);
    assert_eq!(names(&repaired), ["A", "B", "C"]);
    assert_eq!(ranks(&repaired), [0, 1, 2]);
    assert_eq!(back_reference(&conn, c.id), Some(project.to_string()));
}

#[test]
fn unconfirmed_pull_aborts_before_any_push() {
    let conn = open_db_in_memory().unwrap();
    let project = seeded_project(&conn, &["A", "B", "C"]);

    let store = FaultyStore::new(&conn);
    let stale = WriteAck {
        matched: 1,
        modified: 0,
    };
    store.pull_ack.set(Some(stale));
    let events = RecordingNotifier::default();
    let items = OrderedCollectionService::<Item, _, _>::new(&store, &events);

    let err = items.move_to(project, 0, 2).unwrap_err();

    assert!(matches!(err, ServiceError::PullFailed { ack, .. } if ack == stale));
    assert_eq!(err.code(), "pull_failed");
    assert_eq!(store.pushes.get(), 0);
    assert_eq!(events.count(), 0);
    assert_eq!(names(&listed(&conn, project)), ["A", "B", "C"]);
}

#[test]
fn unconfirmed_pull_on_delete_keeps_the_item_row() {
    let conn = open_db_in_memory().unwrap();
    let project = seeded_project(&conn, &["A", "B"]);
    let b = listed(&conn, project).remove(1);

    let store = FaultyStore::new(&conn);
    store.pull_ack.set(Some(WriteAck::NONE));
    let events = RecordingNotifier::default();
    let items = OrderedCollectionService::<Item, _, _>::new(&store, &events);

    assert!(matches!(
        items.delete(b.id),
        Err(ServiceError::PullFailed { .. })
    ));
    assert_eq!(back_reference(&conn, b.id), Some(project.to_string()));
    assert_eq!(names(&listed(&conn, project)), ["A", "B"]);
}

#[test]
fn unconfirmed_push_on_insert_lists_nothing_new() {
    let conn = open_db_in_memory().unwrap();
    let project = seeded_project(&conn, &["A"]);

    let store = FaultyStore::new(&conn);
    store.push_ack.set(Some(WriteAck::NONE));
    let events = RecordingNotifier::default();
    let items = OrderedCollectionService::<Item, _, _>::new(&store, &events);

    let err = items.insert(project, Some(1), Item::new("B")).unwrap_err();

    assert_eq!(err.code(), "push_failed");
    assert_eq!(names(&listed(&conn, project)), ["A"]);
    assert_eq!(events.count(), 0);
}

#[test]
fn cut_item_stays_detached_until_pasted() {
    let conn = open_db_in_memory().unwrap();
    let project = seeded_project(&conn, &["A", "B"]);
    let events = RecordingNotifier::default();
    let service = RundownService::new(ReferentialStore::try_new(&conn).unwrap(), &events);

    let b = service.cut_item(project, 1).unwrap();

    assert_eq!(back_reference(&conn, b.id), None);
    assert_eq!(service.get_item(b.id).unwrap().name, "B");

    service.paste_item(project, 1, b.clone()).unwrap();
    assert_eq!(back_reference(&conn, b.id), Some(project.to_string()));
}

#[test]
fn dangling_references_are_skipped_on_read() {
    let conn = open_db_in_memory().unwrap();
    let project = seeded_project(&conn, &["A", "B", "C"]);
    let b = listed(&conn, project).remove(1);

    conn.execute(
        "DELETE FROM items WHERE item_uuid = ?1;",
        [b.id.to_string()],
    )
    .unwrap();

    let items = listed(&conn, project);
    assert_eq!(names(&items), ["A", "C"]);
    assert_eq!(ranks(&items), [0, 2]);
}

#[test]
fn saving_siblings_rewrites_reference_order_and_positions() {
    let conn = open_db_in_memory().unwrap();
    let project = seeded_project(&conn, &["A", "B", "C"]);
    let store = ReferentialStore::try_new(&conn).unwrap();
    let mut items = listed(&conn, project);
    items.reverse();
    rundown_core::reorder::renumber(&mut items);

    OrderedCollectionStore::<Item>::save_siblings(&store, project, &items).unwrap();

    let reloaded = listed(&conn, project);
    assert_eq!(names(&reloaded), ["C", "B", "A"]);
    assert_eq!(ranks(&reloaded), [0, 1, 2]);
}

#[test]
fn pull_and_push_acknowledge_single_parent_on_both_layouts() {
    let conn = open_db_in_memory().unwrap();
    let events = RecordingNotifier::default();

    let embedded = RundownService::new(EmbeddedStore::try_new(&conn).unwrap(), &events);
    let embedded_project = embedded.create_project("Embedded", false).unwrap();
    let referential = RundownService::new(ReferentialStore::try_new(&conn).unwrap(), &events);
    let referential_project = referential.create_project("Referential", false).unwrap();

    for (store, project) in [
        (
            embedded.backend() as &dyn OrderedCollectionStore<Item>,
            embedded_project,
        ),
        (
            referential.backend() as &dyn OrderedCollectionStore<Item>,
            referential_project,
        ),
    ] {
        let seed = project.items[0].clone();
        assert!(store.pull_member(project.id, seed.id).unwrap().is_single());
        assert_eq!(
            store.pull_member(project.id, seed.id).unwrap(),
            WriteAck::NONE
        );
        assert!(store.push_member(project.id, &seed, 99).unwrap().is_single());
        assert_eq!(
            store
                .push_member(Uuid::new_v4(), &seed, 0)
                .unwrap(),
            WriteAck::NONE
        );
        assert_eq!(store.load_siblings(project.id).unwrap().unwrap().len(), 1);
    }
}

#[test]
fn rename_survives_failed_parent_lookup_and_notifies_member() {
    let conn = open_db_in_memory().unwrap();
    let project = seeded_project(&conn, &["A", "B"]);
    let b = listed(&conn, project).remove(1);

    let store = FaultyStore::new(&conn);
    store.broken_lookup.set(true);
    let events = RecordingNotifier::default();
    let items = OrderedCollectionService::<Item, _, _>::new(&store, &events);

    items.rename(b.id, "Weather").unwrap();

    assert_eq!(names(&listed(&conn, project)), ["A", "Weather"]);
    assert_eq!(
        events.last(),
        Some((b.id, ChangeKind::Renamed(SiblingLevel::Items)))
    );
}

#[test]
fn paste_fails_when_parent_lookup_fails() {
    let conn = open_db_in_memory().unwrap();
    let project = seeded_project(&conn, &["A", "B"]);
    let events = RecordingNotifier::default();
    let service = RundownService::new(ReferentialStore::try_new(&conn).unwrap(), &events);
    let b = service.cut_item(project, 1).unwrap();

    let store = FaultyStore::new(&conn);
    store.broken_lookup.set(true);
    let items = OrderedCollectionService::<Item, _, _>::new(&store, &events);

    assert!(matches!(
        items.paste(project, 1, b),
        Err(ServiceError::Store(StoreError::InvalidData(_)))
    ));
    assert_eq!(store.pushes.get(), 0);
    assert_eq!(names(&listed(&conn, project)), ["A"]);
}
