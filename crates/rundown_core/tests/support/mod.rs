#![allow(dead_code)]

use rundown_core::{
    ChangeKind, ChangeNotifier, ItemDraft, ProjectId, RundownService, Sibling,
};
use std::cell::RefCell;
use uuid::Uuid;

/// Service under test, notifying into a borrowed recorder.
pub type Service<'n, B> = RundownService<B, &'n RecordingNotifier>;

#[derive(Default)]
pub struct RecordingNotifier {
    events: RefCell<Vec<(Uuid, ChangeKind)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(Uuid, ChangeKind)> {
        self.events.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn last(&self) -> Option<(Uuid, ChangeKind)> {
        self.events.borrow().last().copied()
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn notify_changed(&self, parent: Uuid, kind: ChangeKind) {
        self.events.borrow_mut().push((parent, kind));
    }
}

pub fn names<M: Sibling>(list: &[M]) -> Vec<String> {
    list.iter().map(|member| member.name().to_string()).collect()
}

pub fn ranks<M: Sibling>(list: &[M]) -> Vec<usize> {
    list.iter().map(|member| member.rank()).collect()
}

/// Creates a project whose items are exactly `item_names`, in order.
pub fn project_with_items<B: rundown_core::Backend>(
    service: &Service<'_, B>,
    project_name: &str,
    item_names: &[&str],
) -> ProjectId {
    let project = service.create_project(project_name, false).unwrap();
    let seed = project.items[0].id;
    for (offset, name) in item_names.iter().enumerate() {
        service
            .create_item(
                project.id,
                Some(offset as i64 + 1),
                Some(ItemDraft::named(*name)),
            )
            .unwrap();
    }
    service.delete_item(seed).unwrap();
    project.id
}

/// Runs each named scenario once per storage layout.
#[allow(unused_macros)]
macro_rules! on_both_backends {
    ($($name:ident),+ $(,)?) => {
        mod embedded {
            $(
                #[test]
                fn $name() {
                    let conn = rundown_core::db::open_db_in_memory().unwrap();
                    let store = rundown_core::EmbeddedStore::try_new(&conn).unwrap();
                    let events = $crate::support::RecordingNotifier::default();
                    let service = rundown_core::RundownService::new(store, &events);
                    super::$name(&service, &events);
                }
            )+
        }

        mod referential {
            $(
                #[test]
                fn $name() {
                    let conn = rundown_core::db::open_db_in_memory().unwrap();
                    let store = rundown_core::ReferentialStore::try_new(&conn).unwrap();
                    let events = $crate::support::RecordingNotifier::default();
                    let service = rundown_core::RundownService::new(store, &events);
                    super::$name(&service, &events);
                }
            )+
        }
    };
}
