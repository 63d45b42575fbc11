//! Rundown use-case facade over one backend.
//!
//! # Responsibility
//! - Validate project, item and element input above the store layer.
//! - Enforce the project ceiling and case-insensitive name uniqueness.
//! - Route item/element edits through `OrderedCollectionService`.
//!
//! # Invariants
//! - The ceiling is checked before name conflicts, overwrite included.
//! - A new project always starts with one seed item.
//! - A pasted member keeps the id it had when cut.

use super::collection::OrderedCollectionService;
use super::error::{ServiceError, ServiceResult};
use super::notifier::{ChangeKind, ChangeNotifier, ProjectChange};
use crate::model::element::{Element, ElementDraft, ElementId};
use crate::model::item::{Item, ItemDraft, ItemId, DEFAULT_ITEM_NAME};
use crate::model::project::{Project, ProjectId, ProjectSettings, ProjectSummary, MAX_PROJECTS};
use crate::reorder;
use crate::store::{Backend, StoreError};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use uuid::Uuid;

/// Strings a browser would coerce to a number: decimal, exponent, infinity
/// and prefixed integer literals.
static NUMERIC_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?|[+-]?Infinity|0[xX][0-9a-fA-F]+|0[bB][01]+|0[oO][0-7]+)$",
    )
    .expect("numeric name regex")
});

/// Project, item and element operations over backend `B`.
pub struct RundownService<B, N> {
    backend: B,
    notifier: N,
    max_projects: usize,
}

impl<B: Backend, N: ChangeNotifier> RundownService<B, N> {
    /// Creates service with the default project ceiling.
    pub fn new(backend: B, notifier: N) -> Self {
        Self {
            backend,
            notifier,
            max_projects: MAX_PROJECTS,
        }
    }

    /// Overrides the project ceiling.
    pub fn with_max_projects(mut self, max_projects: usize) -> Self {
        self.max_projects = max_projects;
        self
    }

    pub fn max_projects(&self) -> usize {
        self.max_projects
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Item-level collection service.
    pub fn items(&self) -> OrderedCollectionService<'_, Item, B, N> {
        OrderedCollectionService::new(&self.backend, &self.notifier)
    }

    /// Element-level collection service.
    pub fn elements(&self) -> OrderedCollectionService<'_, Element, B, N> {
        OrderedCollectionService::new(&self.backend, &self.notifier)
    }

    /// Creates one project seeded with a default item.
    ///
    /// With `overwrite`, a project matching `name` case-insensitively is
    /// deleted first.
    ///
    /// # Errors
    /// - `Validation` for blank, `undefined`/`null` or numeric names.
    /// - `CapacityExceeded` when the ceiling is reached.
    /// - `NameConflict` when the name is taken and `overwrite` is false.
    pub fn create_project(&self, name: &str, overwrite: bool) -> ServiceResult<Project> {
        self.project_mutation(ProjectChange::Created, |service| {
            let name = validate_name(name)?;
            let count = service.backend.count_projects()?;
            if count >= service.max_projects {
                return Err(ServiceError::CapacityExceeded {
                    limit: service.max_projects,
                });
            }

            if let Some(existing) = service.backend.find_project_by_name(&name)? {
                if !overwrite {
                    return Err(ServiceError::NameConflict(name));
                }
                service.backend.delete_project(existing.id)?;
                info!(
                    "event=project_overwrite module=service status=ok replaced={}",
                    existing.id
                );
            }

            let project = Project::new(name);
            service.backend.insert_project(&project)?;
            let stored = service.backend.load_project(project.id)?.ok_or_else(|| {
                StoreError::InvalidData(format!("project {} missing after insert", project.id))
            })?;
            Ok((stored.id, stored))
        })
    }

    /// Deletes one project with all items and elements.
    pub fn delete_project(&self, project_id: ProjectId) -> ServiceResult<()> {
        self.project_mutation(ProjectChange::Deleted, |service| {
            if !service.backend.delete_project(project_id)? {
                return Err(ServiceError::ParentNotFound(project_id));
            }
            Ok((project_id, ()))
        })
    }

    /// Renames one project.
    pub fn rename_project(&self, project_id: ProjectId, name: &str) -> ServiceResult<()> {
        self.project_mutation(ProjectChange::Renamed, |service| {
            let name = validate_name(name)?;
            if !service.backend.rename_project(project_id, &name)? {
                return Err(ServiceError::ParentNotFound(project_id));
            }
            Ok((project_id, ()))
        })
    }

    /// Replaces the project settings bag.
    pub fn update_project_settings(
        &self,
        project_id: ProjectId,
        settings: &ProjectSettings,
    ) -> ServiceResult<()> {
        self.project_mutation(ProjectChange::SettingsUpdated, |service| {
            if !service.backend.update_settings(project_id, settings)? {
                return Err(ServiceError::ParentNotFound(project_id));
            }
            Ok((project_id, ()))
        })
    }

    /// Lists projects in creation order.
    pub fn list_projects(&self) -> ServiceResult<Vec<ProjectSummary>> {
        Ok(self.backend.list_projects()?)
    }

    /// Loads one fully populated project.
    pub fn get_project(&self, project_id: ProjectId) -> ServiceResult<Project> {
        self.backend
            .load_project(project_id)?
            .ok_or(ServiceError::ParentNotFound(project_id))
    }

    /// Finds a project by case-insensitive name.
    pub fn find_project_by_name(&self, name: &str) -> ServiceResult<Option<ProjectSummary>> {
        Ok(self.backend.find_project_by_name(name)?)
    }

    /// Creates one item at `position` (default 0) from an optional template.
    pub fn create_item(
        &self,
        project_id: ProjectId,
        position: Option<i64>,
        draft: Option<ItemDraft>,
    ) -> ServiceResult<Item> {
        let item = build_item(draft.unwrap_or_default())?;
        self.items().insert(project_id, position, item)
    }

    /// Deletes one item with its elements.
    pub fn delete_item(&self, item_id: ItemId) -> ServiceResult<()> {
        self.items().delete(item_id)
    }

    pub fn rename_item(&self, item_id: ItemId, name: &str) -> ServiceResult<()> {
        let name = validate_name(name)?;
        self.items().rename(item_id, &name)
    }

    pub fn move_item_up(&self, project_id: ProjectId, position: i64) -> ServiceResult<()> {
        self.items().move_up(project_id, position)
    }

    pub fn move_item_down(&self, project_id: ProjectId, position: i64) -> ServiceResult<()> {
        self.items().move_down(project_id, position)
    }

    pub fn move_item(&self, project_id: ProjectId, from: i64, to: i64) -> ServiceResult<()> {
        self.items().move_to(project_id, from, to)
    }

    /// Cuts the item at `position`; the caller holds it until pasted.
    pub fn cut_item(&self, project_id: ProjectId, position: i64) -> ServiceResult<Item> {
        self.items().cut(project_id, position)
    }

    /// Pastes a cut item into any project.
    pub fn paste_item(
        &self,
        project_id: ProjectId,
        position: i64,
        item: Item,
    ) -> ServiceResult<Item> {
        self.items().paste(project_id, position, item)
    }

    pub fn get_item(&self, item_id: ItemId) -> ServiceResult<Item> {
        self.items().get(item_id)
    }

    pub fn list_items(&self, project_id: ProjectId) -> ServiceResult<Vec<Item>> {
        self.items().list(project_id)
    }

    /// Creates one element at `position` (default 0).
    ///
    /// # Errors
    /// - `Validation` when the draft has no type.
    pub fn create_element(
        &self,
        item_id: ItemId,
        position: Option<i64>,
        draft: ElementDraft,
    ) -> ServiceResult<Element> {
        let element = build_element(draft)?;
        self.elements().insert(item_id, position, element)
    }

    /// Deletes one element from whichever item lists it.
    pub fn delete_element(&self, element_id: ElementId) -> ServiceResult<()> {
        self.elements().delete(element_id)
    }

    pub fn rename_element(&self, element_id: ElementId, name: &str) -> ServiceResult<()> {
        let name = validate_name(name)?;
        self.elements().rename(element_id, &name)
    }

    pub fn move_element_up(&self, item_id: ItemId, position: i64) -> ServiceResult<()> {
        self.elements().move_up(item_id, position)
    }

    pub fn move_element_down(&self, item_id: ItemId, position: i64) -> ServiceResult<()> {
        self.elements().move_down(item_id, position)
    }

    pub fn move_element(&self, item_id: ItemId, from: i64, to: i64) -> ServiceResult<()> {
        self.elements().move_to(item_id, from, to)
    }

    pub fn cut_element(&self, item_id: ItemId, position: i64) -> ServiceResult<Element> {
        self.elements().cut(item_id, position)
    }

    pub fn paste_element(
        &self,
        item_id: ItemId,
        position: i64,
        element: Element,
    ) -> ServiceResult<Element> {
        self.elements().paste(item_id, position, element)
    }

    pub fn get_element(&self, element_id: ElementId) -> ServiceResult<Element> {
        self.elements().get(element_id)
    }

    pub fn list_elements(&self, item_id: ItemId) -> ServiceResult<Vec<Element>> {
        self.elements().list(item_id)
    }

    fn project_mutation<T>(
        &self,
        change: ProjectChange,
        run: impl FnOnce(&Self) -> ServiceResult<(Uuid, T)>,
    ) -> ServiceResult<T> {
        let started_at = Instant::now();
        match run(self) {
            Ok((project_id, output)) => {
                info!(
                    "event=project_mutation module=service op={} status=ok project={project_id} duration_ms={}",
                    change.as_str(),
                    started_at.elapsed().as_millis()
                );
                self.notifier
                    .notify_changed(project_id, ChangeKind::Project(change));
                Ok(output)
            }
            Err(err) => {
                warn!(
                    "event=project_mutation module=service op={} status=error duration_ms={} error_code={}",
                    change.as_str(),
                    started_at.elapsed().as_millis(),
                    err.code()
                );
                Err(err)
            }
        }
    }
}

/// Trims and checks a user-chosen project, item or element name.
fn validate_name(name: &str) -> ServiceResult<String> {
    let name = validate_label(name)?;
    if NUMERIC_NAME.is_match(&name) {
        return Err(ServiceError::Validation(format!(
            "name `{name}` cannot be a number"
        )));
    }
    Ok(name)
}

/// Trims and rejects blank or placeholder labels; numbers pass.
fn validate_label(name: &str) -> ServiceResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation("name must not be blank".to_string()));
    }
    if trimmed == "undefined" || trimmed == "null" {
        return Err(ServiceError::Validation(format!(
            "`{trimmed}` is not a valid name"
        )));
    }
    Ok(trimmed.to_string())
}

fn build_item(draft: ItemDraft) -> ServiceResult<Item> {
    // Unusable template names fall back to the default rather than failing.
    let name = draft
        .name
        .and_then(|name| validate_name(&name).ok())
        .unwrap_or_else(|| DEFAULT_ITEM_NAME.to_string());
    let mut item = Item::new(name);
    if let Some(expanded) = draft.expanded {
        item.expanded = expanded;
    }
    if let Some(options) = draft.options {
        item.options = options;
    }
    item.elements = draft
        .elements
        .into_iter()
        .map(build_element)
        .collect::<ServiceResult<Vec<_>>>()?;
    reorder::renumber(&mut item.elements);
    Ok(item)
}

fn build_element(draft: ElementDraft) -> ServiceResult<Element> {
    if let Some(name) = &draft.name {
        validate_label(name)?;
    }
    let element = draft
        .into_element()
        .ok_or_else(|| ServiceError::Validation("element type is required".to_string()))?;
    Ok(Element {
        name: element.name.trim().to_string(),
        ..element
    })
}
