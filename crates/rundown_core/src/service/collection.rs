//! Generic ordered-collection use cases.
//!
//! # Responsibility
//! - Run one reorder edit against a freshly loaded sibling list and persist
//!   it through `ConsistencyCoordinator`.
//! - Serve the same operations for items and elements.
//!
//! # Invariants
//! - Nothing is written when validation or the reorder engine rejects a call.
//! - Exactly one notification follows each successful mutation.
//! - Rename never touches indices.

use super::coordinator::{ConsistencyCoordinator, SiblingChange};
use super::error::{ServiceError, ServiceResult};
use super::notifier::{ChangeKind, ChangeNotifier};
use crate::model::Sibling;
use crate::reorder::{self, ReorderOp};
use crate::store::OrderedCollectionStore;
use log::{info, warn};
use std::marker::PhantomData;
use std::time::Instant;
use uuid::Uuid;

/// Sibling-list service for members of type `M`.
pub struct OrderedCollectionService<'s, M, S, N> {
    store: &'s S,
    notifier: &'s N,
    _member: PhantomData<M>,
}

impl<'s, M, S, N> OrderedCollectionService<'s, M, S, N>
where
    M: Sibling,
    S: OrderedCollectionStore<M>,
    N: ChangeNotifier,
{
    pub fn new(store: &'s S, notifier: &'s N) -> Self {
        Self {
            store,
            notifier,
            _member: PhantomData,
        }
    }

    /// Lists members of `parent` in order.
    pub fn list(&self, parent: Uuid) -> ServiceResult<Vec<M>> {
        self.load(parent)
    }

    /// Loads one member.
    pub fn get(&self, member: Uuid) -> ServiceResult<M> {
        self.store
            .load_member(member)?
            .ok_or(ServiceError::ParentNotFound(member))
    }

    /// Inserts a new member at `position` (default 0).
    pub fn insert(&self, parent: Uuid, position: Option<i64>, entry: M) -> ServiceResult<M> {
        self.mutate(parent, ReorderOp::Insert, |list| {
            let at = reorder::insert(list, position.unwrap_or(0), entry)?;
            Ok((SiblingChange::Insert { at }, list[at].clone()))
        })
    }

    /// Deletes one member and its descendants, renumbering the rest.
    pub fn delete(&self, member: Uuid) -> ServiceResult<()> {
        let parent = self
            .store
            .locate_parent(member)?
            .ok_or(ServiceError::ParentNotFound(member))?;
        self.mutate(parent, ReorderOp::Remove, |list| {
            let position = list
                .iter()
                .position(|entry| entry.id() == member)
                .ok_or(ServiceError::ParentNotFound(member))?;
            reorder::remove(list, position as i64)?;
            Ok((
                SiblingChange::Remove {
                    member,
                    purge: true,
                },
                (),
            ))
        })
    }

    pub fn move_up(&self, parent: Uuid, position: i64) -> ServiceResult<()> {
        self.mutate(parent, ReorderOp::MoveUp, |list| {
            let relocation = reorder::move_up(list, position)?;
            Ok((SiblingChange::Relocate(relocation), ()))
        })
    }

    pub fn move_down(&self, parent: Uuid, position: i64) -> ServiceResult<()> {
        self.mutate(parent, ReorderOp::MoveDown, |list| {
            let relocation = reorder::move_down(list, position)?;
            Ok((SiblingChange::Relocate(relocation), ()))
        })
    }

    /// Moves the member at `from` to rank `to` of the post-removal list.
    pub fn move_to(&self, parent: Uuid, from: i64, to: i64) -> ServiceResult<()> {
        self.mutate(parent, ReorderOp::MoveTo, |list| {
            let relocation = reorder::move_to(list, from, to)?;
            Ok((SiblingChange::Relocate(relocation), ()))
        })
    }

    /// Removes the member at `position` without deleting it and returns it.
    ///
    /// On the referential layout its documents stay detached until pasted.
    pub fn cut(&self, parent: Uuid, position: i64) -> ServiceResult<M> {
        self.mutate(parent, ReorderOp::Cut, |list| {
            let removed = reorder::cut(list, position)?;
            Ok((
                SiblingChange::Remove {
                    member: removed.id(),
                    purge: false,
                },
                removed,
            ))
        })
    }

    /// Inserts a previously cut member at `position`, under any parent.
    ///
    /// # Errors
    /// - `Validation` while the member is still listed under any parent.
    pub fn paste(&self, parent: Uuid, position: i64, entry: M) -> ServiceResult<M> {
        let member = entry.id();
        self.mutate(parent, ReorderOp::Paste, |list| {
            if let Some(owner) = self.store.locate_parent(member)? {
                return Err(ServiceError::Validation(format!(
                    "{member} is still listed under {} {owner}; cut it first",
                    M::LEVEL.parent_kind()
                )));
            }
            let at = reorder::paste(list, position, entry)?;
            Ok((SiblingChange::Insert { at }, list[at].clone()))
        })
    }

    /// Renames one member; order and indices are untouched.
    pub fn rename(&self, member: Uuid, name: &str) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self
            .store
            .rename_member(member, name)
            .map_err(ServiceError::from)
            .and_then(|renamed| {
                if renamed {
                    Ok(())
                } else {
                    Err(ServiceError::ParentNotFound(member))
                }
            });

        match &result {
            Ok(()) => {
                info!(
                    "event=sibling_rename module=service level={} status=ok member={member} duration_ms={}",
                    M::LEVEL,
                    started_at.elapsed().as_millis()
                );
                let parent = match self.store.locate_parent(member) {
                    Ok(parent) => parent,
                    Err(err) => {
                        warn!(
                            "event=sibling_rename module=service level={} status=degraded member={member} parent_kind={} error_code=parent_lookup_failed error={err}",
                            M::LEVEL,
                            M::LEVEL.parent_kind()
                        );
                        None
                    }
                };
                self.notifier
                    .notify_changed(parent.unwrap_or(member), ChangeKind::Renamed(M::LEVEL));
            }
            Err(err) => warn!(
                "event=sibling_rename module=service level={} status=error member={member} duration_ms={} error_code={}",
                M::LEVEL,
                started_at.elapsed().as_millis(),
                err.code()
            ),
        }
        result
    }

    fn load(&self, parent: Uuid) -> ServiceResult<Vec<M>> {
        self.store
            .load_siblings(parent)?
            .ok_or(ServiceError::ParentNotFound(parent))
    }

    fn mutate<T>(
        &self,
        parent: Uuid,
        op: ReorderOp,
        edit: impl FnOnce(&mut Vec<M>) -> ServiceResult<(SiblingChange, T)>,
    ) -> ServiceResult<T> {
        let started_at = Instant::now();
        let result = self.apply(parent, edit);

        match &result {
            Ok(_) => {
                info!(
                    "event=sibling_mutation module=service level={} op={op} status=ok parent={parent} duration_ms={}",
                    M::LEVEL,
                    started_at.elapsed().as_millis()
                );
                self.notifier.notify_changed(
                    parent,
                    ChangeKind::Siblings {
                        level: M::LEVEL,
                        op,
                    },
                );
            }
            Err(err) => warn!(
                "event=sibling_mutation module=service level={} op={op} status=error parent={parent} duration_ms={} error_code={} requires_reread={}",
                M::LEVEL,
                started_at.elapsed().as_millis(),
                err.code(),
                err.requires_reread()
            ),
        }
        result
    }

    fn apply<T>(
        &self,
        parent: Uuid,
        edit: impl FnOnce(&mut Vec<M>) -> ServiceResult<(SiblingChange, T)>,
    ) -> ServiceResult<T> {
        let current = self.load(parent)?;
        let mut next = current.clone();
        let (change, output) = edit(&mut next)?;
        ConsistencyCoordinator::new(self.store).commit(
            parent,
            current.as_slice(),
            next.as_slice(),
            change,
        )?;
        Ok(output)
    }
}
