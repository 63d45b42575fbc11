//! Storage-agnostic reordering of sibling lists.
//!
//! # Responsibility
//! - Compute the new order of one sibling list for insert, remove, move, cut
//!   and paste requests.
//! - Renumber every member after each structural edit.
//!
//! # Invariants
//! - After any successful call, `list[i].rank() == i` for every `i`.
//! - A rejected call leaves the list untouched.
//! - Positions are validated, never clamped.

use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A list member that carries its own zero-based rank.
pub trait Ranked {
    /// Rank currently stored on the member.
    fn rank(&self) -> usize;
    /// Overwrites the stored rank.
    fn set_rank(&mut self, rank: usize);
}

/// Structural operation names, used for error reporting and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReorderOp {
    Insert,
    Remove,
    MoveUp,
    MoveDown,
    MoveTo,
    Cut,
    Paste,
}

impl ReorderOp {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Remove => "remove",
            Self::MoveUp => "move_up",
            Self::MoveDown => "move_down",
            Self::MoveTo => "move_to",
            Self::Cut => "cut",
            Self::Paste => "paste",
        }
    }
}

impl Display for ReorderOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from reorder operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    /// Position argument falls outside the range accepted by `operation`.
    #[error("{operation} position {position} is out of range for {len} siblings")]
    IndexOutOfRange {
        operation: ReorderOp,
        position: i64,
        len: usize,
    },
}

pub type ReorderResult<T> = Result<T, ReorderError>;

/// Source and destination rank of a relocated member.
///
/// `to` is a rank in the list after `from` was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub from: usize,
    pub to: usize,
}

impl Relocation {
    /// Returns whether the relocation leaves the order unchanged.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Inserts `entry` at `position` (`0..=len`).
pub fn insert<T: Ranked>(list: &mut Vec<T>, position: i64, entry: T) -> ReorderResult<usize> {
    let at = checked_position(ReorderOp::Insert, position, list.len(), 0, list.len() as i64)?;
    list.insert(at, entry);
    renumber(list);
    Ok(at)
}

/// Removes and returns the member at `position` (`0..len`).
pub fn remove<T: Ranked>(list: &mut Vec<T>, position: i64) -> ReorderResult<T> {
    let at = checked_position(ReorderOp::Remove, position, list.len(), 0, last_index(list))?;
    let removed = list.remove(at);
    renumber(list);
    Ok(removed)
}

/// Swaps the member at `position` with the one above it.
///
/// Rejected at `position == 0`, since nothing sits above the first member.
pub fn move_up<T: Ranked>(list: &mut [T], position: i64) -> ReorderResult<Relocation> {
    let from = checked_position(ReorderOp::MoveUp, position, list.len(), 1, last_index(list))?;
    Ok(relocate(list, from, from - 1))
}

/// Swaps the member at `position` with the one below it.
///
/// Rejected at the last position.
pub fn move_down<T: Ranked>(list: &mut [T], position: i64) -> ReorderResult<Relocation> {
    let from = checked_position(
        ReorderOp::MoveDown,
        position,
        list.len(),
        0,
        last_index(list) - 1,
    )?;
    Ok(relocate(list, from, from + 1))
}

/// Moves the member at `from` so it ends up at rank `to`.
///
/// `to` is resolved against the list with the member already removed, so
/// `[A, B, C]` with `from = 0, to = 2` yields `[B, C, A]`.
pub fn move_to<T: Ranked>(list: &mut [T], from: i64, to: i64) -> ReorderResult<Relocation> {
    let len = list.len();
    let from = checked_position(ReorderOp::MoveTo, from, len, 0, last_index(list))?;
    let to = checked_position(ReorderOp::MoveTo, to, len, 0, last_index(list))?;
    Ok(relocate(list, from, to))
}

/// Removes and returns the member at `position` for a later `paste`.
///
/// The first member can never be cut (`position` must be `1..len`).
pub fn cut<T: Ranked>(list: &mut Vec<T>, position: i64) -> ReorderResult<T> {
    let at = checked_position(ReorderOp::Cut, position, list.len(), 1, last_index(list))?;
    let removed = list.remove(at);
    renumber(list);
    Ok(removed)
}

/// Inserts a previously cut member at `position` (`1..=len`).
pub fn paste<T: Ranked>(list: &mut Vec<T>, position: i64, entry: T) -> ReorderResult<usize> {
    let at = checked_position(ReorderOp::Paste, position, list.len(), 1, list.len() as i64)?;
    list.insert(at, entry);
    renumber(list);
    Ok(at)
}

/// Rewrites every member's rank to its index in `list`.
pub fn renumber<T: Ranked>(list: &mut [T]) {
    for (rank, member) in list.iter_mut().enumerate() {
        member.set_rank(rank);
    }
}

/// Returns whether the stored ranks read `0..len` in list order.
pub fn is_contiguous<T: Ranked>(list: &[T]) -> bool {
    list.iter()
        .enumerate()
        .all(|(rank, member)| member.rank() == rank)
}

fn relocate<T: Ranked>(list: &mut [T], from: usize, to: usize) -> Relocation {
    if from < to {
        list[from..=to].rotate_left(1);
    } else if to < from {
        list[to..=from].rotate_right(1);
    }
    renumber(list);
    Relocation { from, to }
}

fn last_index<T>(list: &[T]) -> i64 {
    list.len() as i64 - 1
}

fn checked_position(
    operation: ReorderOp,
    position: i64,
    len: usize,
    lowest: i64,
    highest: i64,
) -> ReorderResult<usize> {
    if position < lowest || position > highest {
        return Err(ReorderError::IndexOutOfRange {
            operation,
            position,
            len,
        });
    }
    Ok(position as usize)
}
