//! Persists one reordered sibling list through the active layout.
//!
//! # Responsibility
//! - Embedded layout: one whole-list replace.
//! - Referential layout: pull/push the affected member with acknowledgement
//!   checks, then refresh stored positions.
//!
//! # Invariants
//! - A failed pull aborts before any push; the member stays detached.
//! - A pull or push counts only when exactly one parent matched and changed.
//! - Purging a removed member happens only after its reference is gone.

use super::error::{ServiceError, ServiceResult};
use crate::model::Sibling;
use crate::reorder::Relocation;
use crate::store::{OrderedCollectionStore, StorageLayout, WriteAck};
use log::warn;
use uuid::Uuid;

/// Structural edit applied to a sibling list, described for persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingChange {
    /// A member now sits at `at` that was not in the list before.
    Insert { at: usize },
    /// `member` left the list. `purge` drops its own document as well.
    Remove { member: Uuid, purge: bool },
    /// A member moved inside the list.
    Relocate(Relocation),
}

/// Writes reorder results to a store.
pub struct ConsistencyCoordinator<'s, S> {
    store: &'s S,
}

impl<'s, S> ConsistencyCoordinator<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Persists `next` as the new order of `parent`.
    ///
    /// `current` is the list as loaded before the edit.
    ///
    /// # Errors
    /// - `PullFailed`/`PushFailed` when a referential step is not confirmed;
    ///   the store may already hold part of the change.
    pub fn commit<M>(
        &self,
        parent: Uuid,
        current: &[M],
        next: &[M],
        change: SiblingChange,
    ) -> ServiceResult<()>
    where
        M: Sibling,
        S: OrderedCollectionStore<M>,
    {
        match self.store.layout() {
            StorageLayout::Embedded => {
                self.store.save_siblings(parent, next)?;
                if let SiblingChange::Remove {
                    member,
                    purge: true,
                } = change
                {
                    self.store.purge_member(member)?;
                }
                Ok(())
            }
            StorageLayout::Referential => self.commit_referential(parent, current, next, change),
        }
    }

    fn commit_referential<M>(
        &self,
        parent: Uuid,
        current: &[M],
        next: &[M],
        change: SiblingChange,
    ) -> ServiceResult<()>
    where
        M: Sibling,
        S: OrderedCollectionStore<M>,
    {
        match change {
            SiblingChange::Insert { at } => {
                let entry = member_at(next, at, parent)?;
                self.push(parent, entry, at)?;
            }
            SiblingChange::Remove { member, purge } => {
                self.pull(parent, current, member)?;
                self.store.save_siblings(parent, next)?;
                if purge {
                    self.store.purge_member(member)?;
                }
                return Ok(());
            }
            SiblingChange::Relocate(relocation) => {
                if relocation.is_noop() {
                    return Ok(());
                }
                let entry = member_at(next, relocation.to, parent)?;
                self.pull(parent, current, entry.id())?;
                self.push(parent, entry, relocation.to)?;
            }
        }
        self.store.save_siblings(parent, next)?;
        Ok(())
    }

    fn pull<M>(&self, parent: Uuid, current: &[M], member: Uuid) -> ServiceResult<()>
    where
        M: Sibling,
        S: OrderedCollectionStore<M>,
    {
        let occurrences = current.iter().filter(|entry| entry.id() == member).count();
        if occurrences != 1 {
            warn!(
                "event=sibling_pull module=coordinator status=error level={} parent={parent} member={member} occurrences={occurrences} error_code=pull_failed",
                M::LEVEL
            );
            return Err(ServiceError::PullFailed {
                member,
                ack: WriteAck::NONE,
            });
        }

        let ack = self.store.pull_member(parent, member)?;
        if !ack.is_single() {
            warn!(
                "event=sibling_pull module=coordinator status=error level={} parent={parent} member={member} {ack} error_code=pull_failed",
                M::LEVEL
            );
            return Err(ServiceError::PullFailed { member, ack });
        }
        Ok(())
    }

    fn push<M>(&self, parent: Uuid, entry: &M, position: usize) -> ServiceResult<()>
    where
        M: Sibling,
        S: OrderedCollectionStore<M>,
    {
        let member = entry.id();
        let ack = self.store.push_member(parent, entry, position)?;
        if !ack.is_single() {
            warn!(
                "event=sibling_push module=coordinator status=error level={} parent={parent} member={member} position={position} {ack} error_code=push_failed",
                M::LEVEL
            );
            return Err(ServiceError::PushFailed { member, ack });
        }
        Ok(())
    }
}

fn member_at<M>(list: &[M], at: usize, parent: Uuid) -> ServiceResult<&M> {
    list.get(at).ok_or_else(|| {
        ServiceError::Validation(format!(
            "no sibling at position {at} under parent {parent}"
        ))
    })
}
