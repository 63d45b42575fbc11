#[macro_use]
mod support;

use rundown_core::{
    Backend, ChangeKind, ElementDraft, ElementKind, ItemId, ReorderOp, ServiceError,
    SiblingLevel,
};
use support::{names, project_with_items, ranks, RecordingNotifier, Service};

on_both_backends!(
    create_element_fills_variant_defaults,
    create_element_requires_a_type,
    element_moves_renumber_the_item,
    delete_element_finds_its_item,
    rename_element_keeps_fields_and_order,
    cut_element_pastes_into_another_item,
);

fn item_with_elements<B: Backend>(service: &Service<'_, B>, labels: &[&str]) -> ItemId {
    let project = project_with_items(service, "Show", &["Host"]);
    let item = service.list_items(project).unwrap().remove(0).id;
    for (offset, label) in labels.iter().enumerate() {
        let mut draft = ElementDraft::of_kind(ElementKind::Stripe);
        draft.name = Some(label.to_string());
        service
            .create_element(item, Some(offset as i64), draft)
            .unwrap();
    }
    item
}

fn create_element_fills_variant_defaults<B: Backend>(
    service: &Service<'_, B>,
    events: &RecordingNotifier,
) {
    let item = item_with_elements(service, &[]);

    let mut draft = ElementDraft::of_kind(ElementKind::Super);
    draft.name = Some("Guest".to_string());
    draft
        .fields
        .insert("person".to_string(), serde_json::json!("Dana"));
    let created = service.create_element(item, None, draft).unwrap();

    assert_eq!(created.index, 0);
    assert_eq!(
        events.last(),
        Some((
            item,
            ChangeKind::Siblings {
                level: SiblingLevel::Elements,
                op: ReorderOp::Insert
            }
        ))
    );

    let stored = service.get_element(created.id).unwrap();
    assert_eq!(stored, created);
    assert_eq!(stored.kind, ElementKind::Super);
    assert_eq!(stored.fields["person"], "Dana");
    assert_eq!(stored.fields["effect"], "Cut");
    assert_eq!(stored.fields["onPhone"], false);
}

fn create_element_requires_a_type<B: Backend>(
    service: &Service<'_, B>,
    events: &RecordingNotifier,
) {
    let item = item_with_elements(service, &["A"]);
    let notified = events.count();

    let untyped = ElementDraft {
        name: Some("Mystery".to_string()),
        ..ElementDraft::default()
    };
    let err = service.create_element(item, None, untyped).unwrap_err();
    assert_eq!(err.code(), "validation_error");

    let err = service
        .create_element(item, Some(2), ElementDraft::of_kind(ElementKind::Cg))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::IndexOutOfRange {
            operation: ReorderOp::Insert,
            position: 2,
            len: 1
        }
    ));

    assert_eq!(names(&service.list_elements(item).unwrap()), ["A"]);
    assert_eq!(events.count(), notified);
}

fn element_moves_renumber_the_item<B: Backend>(
    service: &Service<'_, B>,
    _events: &RecordingNotifier,
) {
    let item = item_with_elements(service, &["A", "B", "C"]);

    service.move_element_down(item, 0).unwrap();
    assert_eq!(names(&service.list_elements(item).unwrap()), ["B", "A", "C"]);

    service.move_element(item, 2, 0).unwrap();
    assert_eq!(names(&service.list_elements(item).unwrap()), ["C", "B", "A"]);

    service.move_element_up(item, 2).unwrap();
    let elements = service.list_elements(item).unwrap();
    assert_eq!(names(&elements), ["C", "A", "B"]);
    assert_eq!(ranks(&elements), [0, 1, 2]);

    assert!(service.move_element_up(item, 0).is_err());
    assert!(service.move_element_down(item, 2).is_err());

    let via_item = service.get_item(item).unwrap();
    assert_eq!(names(&via_item.elements), ["C", "A", "B"]);
}

fn delete_element_finds_its_item<B: Backend>(
    service: &Service<'_, B>,
    events: &RecordingNotifier,
) {
    let item = item_with_elements(service, &["A", "B", "C"]);
    let b = service.list_elements(item).unwrap().remove(1);

    service.delete_element(b.id).unwrap();

    let elements = service.list_elements(item).unwrap();
    assert_eq!(names(&elements), ["A", "C"]);
    assert_eq!(ranks(&elements), [0, 1]);
    assert_eq!(
        events.last(),
        Some((
            item,
            ChangeKind::Siblings {
                level: SiblingLevel::Elements,
                op: ReorderOp::Remove
            }
        ))
    );
    assert!(matches!(
        service.delete_element(b.id),
        Err(ServiceError::ParentNotFound(id)) if id == b.id
    ));
}

fn rename_element_keeps_fields_and_order<B: Backend>(
    service: &Service<'_, B>,
    _events: &RecordingNotifier,
) {
    let item = item_with_elements(service, &["A", "B"]);
    let before = service.list_elements(item).unwrap();

    for bad in ["42", "-1.5e3", "Infinity", "0b11", "undefined"] {
        assert!(
            matches!(
                service.rename_element(before[1].id, bad),
                Err(ServiceError::Validation(_))
            ),
            "name {bad:?}"
        );
    }
    service.rename_element(before[1].id, " Lower third ").unwrap();

    let after = service.list_elements(item).unwrap();
    assert_eq!(names(&after), ["A", "Lower third"]);
    assert_eq!(ranks(&after), [0, 1]);
    assert_eq!(after[1].fields, before[1].fields);
    assert!(matches!(
        service.rename_element(uuid::Uuid::new_v4(), "Ghost"),
        Err(ServiceError::ParentNotFound(_))
    ));
}

fn cut_element_pastes_into_another_item<B: Backend>(
    service: &Service<'_, B>,
    _events: &RecordingNotifier,
) {
    let source = item_with_elements(service, &["A", "B", "C"]);
    let project = service.create_project("Other", false).unwrap();
    let target = project.items[0].id;
    service
        .create_element(target, None, ElementDraft::of_kind(ElementKind::Promo))
        .unwrap();

    let cut = service.cut_element(source, 1).unwrap();
    assert_eq!(cut.name, "B");
    assert_eq!(names(&service.list_elements(source).unwrap()), ["A", "C"]);

    service.paste_element(target, 1, cut.clone()).unwrap();

    let elements = service.list_elements(target).unwrap();
    assert_eq!(names(&elements), ["Promo", "B"]);
    assert_eq!(ranks(&elements), [0, 1]);
    assert_eq!(elements[1].fields, cut.fields);
    assert_eq!(ranks(&service.list_elements(source).unwrap()), [0, 1]);
}
