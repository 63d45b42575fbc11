#[macro_use]
mod support;

use rundown_core::{
    Backend, ChangeKind, ProjectChange, ServiceError, DEFAULT_ITEM_NAME, MAX_PROJECTS,
};
use support::{RecordingNotifier, Service};

on_both_backends!(
    new_project_has_defaults_and_one_seed_item,
    duplicate_names_conflict_case_insensitively,
    overwrite_replaces_matching_project,
    fifty_first_project_is_rejected_without_state_change,
    capacity_is_checked_before_name_conflict,
    invalid_project_names_are_rejected,
    rename_project_updates_lookup_key,
    settings_are_replaced_verbatim,
    delete_project_cascades_to_items_and_elements,
    listing_follows_creation_order_with_item_counts,
);

fn new_project_has_defaults_and_one_seed_item<B: Backend>(
    service: &Service<'_, B>,
    events: &RecordingNotifier,
) {
    let project = service.create_project("  Evening News ", false).unwrap();

    assert_eq!(project.name, "Evening News");
    assert_eq!(project.items.len(), 1);
    assert_eq!(project.items[0].name, DEFAULT_ITEM_NAME);
    assert_eq!(project.items[0].index, 0);
    assert!(project.items[0].expanded);
    assert!(!project.items[0].options);
    assert_eq!(project.settings.language, "EN");
    assert_eq!(project.settings.ui_color, "#1AA7EC");
    assert_eq!(project.settings.general.auto_save_interval, 300);
    assert!(project.created_at > 0);

    assert_eq!(
        events.events(),
        vec![(project.id, ChangeKind::Project(ProjectChange::Created))]
    );
    assert_eq!(service.get_project(project.id).unwrap(), project);
}

fn duplicate_names_conflict_case_insensitively<B: Backend>(
    service: &Service<'_, B>,
    events: &RecordingNotifier,
) {
    service.create_project("Evening News", false).unwrap();

    let err = service.create_project("EVENING news", false).unwrap_err();
    assert!(matches!(err, ServiceError::NameConflict(_)));
    assert_eq!(err.code(), "name_conflict");
    assert_eq!(service.list_projects().unwrap().len(), 1);
    assert_eq!(events.count(), 1);
}

fn overwrite_replaces_matching_project<B: Backend>(
    service: &Service<'_, B>,
    _events: &RecordingNotifier,
) {
    let original = service.create_project("Evening News", false).unwrap();
    service
        .create_item(original.id, None, Some(rundown_core::ItemDraft::named("Weather")))
        .unwrap();

    let replacement = service.create_project("evening news", true).unwrap();

    assert_ne!(replacement.id, original.id);
    assert_eq!(replacement.items.len(), 1);
    assert!(matches!(
        service.get_project(original.id),
        Err(ServiceError::ParentNotFound(id)) if id == original.id
    ));
    let listed = service.list_projects().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, replacement.id);
}

fn fifty_first_project_is_rejected_without_state_change<B: Backend>(
    service: &Service<'_, B>,
    events: &RecordingNotifier,
) {
    for number in 0..MAX_PROJECTS {
        service
            .create_project(&format!("Show {number}"), false)
            .unwrap();
    }
    let before = service.list_projects().unwrap();
    let notified = events.count();

    let err = service.create_project("One Too Many", false).unwrap_err();

    assert!(matches!(err, ServiceError::CapacityExceeded { limit: 50 }));
    assert_eq!(service.list_projects().unwrap(), before);
    assert!(service.find_project_by_name("One Too Many").unwrap().is_none());
    assert_eq!(events.count(), notified);
}

fn capacity_is_checked_before_name_conflict<B: Backend>(
    service: &Service<'_, B>,
    _events: &RecordingNotifier,
) {
    for number in 0..MAX_PROJECTS {
        service
            .create_project(&format!("Show {number}"), false)
            .unwrap();
    }
    let existing = service.find_project_by_name("show 7").unwrap().unwrap();

    let plain = service.create_project("Show 7", false).unwrap_err();
    let overwrite = service.create_project("Show 7", true).unwrap_err();

    assert_eq!(plain.code(), "capacity_exceeded");
    assert_eq!(overwrite.code(), "capacity_exceeded");
    assert!(service.get_project(existing.id).is_ok());
}

fn invalid_project_names_are_rejected<B: Backend>(
    service: &Service<'_, B>,
    events: &RecordingNotifier,
) {
    for name in ["", "   ", "undefined", "null", "2024", "3.14"] {
        let err = service.create_project(name, false).unwrap_err();
        assert_eq!(err.code(), "validation_error", "name {name:?}");
    }
    assert!(service.list_projects().unwrap().is_empty());
    assert_eq!(events.count(), 0);

    let project = service.create_project("Valid", false).unwrap();
    let err = service.rename_project(project.id, "42").unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(service.get_project(project.id).unwrap().name, "Valid");
}

fn rename_project_updates_lookup_key<B: Backend>(
    service: &Service<'_, B>,
    events: &RecordingNotifier,
) {
    let project = service.create_project("Morning", false).unwrap();

    service.rename_project(project.id, "Late Show").unwrap();

    assert!(service.find_project_by_name("morning").unwrap().is_none());
    let found = service.find_project_by_name("LATE SHOW").unwrap().unwrap();
    assert_eq!(found.id, project.id);
    assert_eq!(found.name, "Late Show");
    assert_eq!(
        events.last(),
        Some((project.id, ChangeKind::Project(ProjectChange::Renamed)))
    );

    let missing = uuid::Uuid::new_v4();
    assert!(matches!(
        service.rename_project(missing, "Other"),
        Err(ServiceError::ParentNotFound(id)) if id == missing
    ));
}

fn settings_are_replaced_verbatim<B: Backend>(
    service: &Service<'_, B>,
    _events: &RecordingNotifier,
) {
    let project = service.create_project("Settings", false).unwrap();
    let mut settings = project.settings.clone();
    settings.language = "HE".to_string();
    settings.rtl = true;
    settings.general.auto_save = true;
    settings.hotkeys = serde_json::json!({ "basic": { "cut": "F1" } });

    service
        .update_project_settings(project.id, &settings)
        .unwrap();

    assert_eq!(service.get_project(project.id).unwrap().settings, settings);
}

fn delete_project_cascades_to_items_and_elements<B: Backend>(
    service: &Service<'_, B>,
    events: &RecordingNotifier,
) {
    let project = service.create_project("Doomed", false).unwrap();
    let item = project.items[0].id;
    let element = service
        .create_element(
            item,
            None,
            rundown_core::ElementDraft::of_kind(rundown_core::ElementKind::Live),
        )
        .unwrap();

    service.delete_project(project.id).unwrap();

    assert_eq!(
        events.last(),
        Some((project.id, ChangeKind::Project(ProjectChange::Deleted)))
    );
    assert!(matches!(
        service.get_item(item),
        Err(ServiceError::ParentNotFound(_))
    ));
    assert!(matches!(
        service.get_element(element.id),
        Err(ServiceError::ParentNotFound(_))
    ));
    assert!(matches!(
        service.delete_project(project.id),
        Err(ServiceError::ParentNotFound(_))
    ));
}

fn listing_follows_creation_order_with_item_counts<B: Backend>(
    service: &Service<'_, B>,
    _events: &RecordingNotifier,
) {
    let first = service.create_project("Alpha", false).unwrap();
    let second = service.create_project("Bravo", false).unwrap();
    service.create_item(second.id, None, None).unwrap();

    let listed = service.list_projects().unwrap();
    let ids: Vec<_> = listed.iter().map(|summary| summary.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_eq!(listed[0].item_count, 1);
    assert_eq!(listed[1].item_count, 2);
}
