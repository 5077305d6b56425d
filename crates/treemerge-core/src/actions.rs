//! Edit actions and their ordered replay onto the base tree.
//!
//! The replay contract: all structural actions (deletes and inserts,
//! including the two halves of every move) complete before any content
//! update runs, so updates always observe final placement. Deletes run
//! before inserts, and inserts run in ascending (destination parent, index)
//! order so sibling inserts land at their recorded positions. Actions on
//! disjoint identities commute; nothing else is promised.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use thiserror::Error;

use crate::matcher::Side;
use crate::tree::{NodeId, Tree};

/// Fatal merge failures. Content conflicts are never errors; these are
/// structural invariant violations that abort the whole run.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("node {identity} moved under a parent with no base-tree counterpart")]
    MoveDestination { identity: usize },
    #[error("sibling index of node {identity} could not be derived")]
    UndefinedIndex { identity: usize },
    #[error("insert at index {position} exceeds the {len} children of the destination parent")]
    InsertOutOfBounds { position: usize, len: usize },
}

/// Where an inserted subtree comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertSource {
    /// A node already in the base tree, being relocated by a move.
    Base(NodeId),
    /// A subtree introduced by one side, copied into the base arena at
    /// apply time.
    Edit(Side, NodeId),
}

/// Insert a child subtree under a base-tree parent at a fixed index.
#[derive(Debug, Clone)]
pub struct Insert {
    identity: usize,
    parent: NodeId,
    child: InsertSource,
    position: usize,
}

impl Insert {
    fn apply(&self, base: &mut Tree, local: &Tree, remote: &Tree) -> Result<(), MergeError> {
        let child = match self.child {
            InsertSource::Base(node) => node,
            InsertSource::Edit(Side::Local, node) => base.adopt_subtree(local, node),
            InsertSource::Edit(Side::Remote, node) => base.adopt_subtree(remote, node),
        };
        let len = base.children(self.parent).len();
        if self.position > len {
            return Err(MergeError::InsertOutOfBounds {
                position: self.position,
                len,
            });
        }
        base.attach(self.parent, self.position, child);
        Ok(())
    }
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "insert {} -> {}[{}]",
            self.identity, self.parent, self.position
        )
    }
}

/// Remove a base-tree node from wherever it currently sits. Parent and
/// index are read live at apply time, never cached.
#[derive(Debug, Clone)]
pub struct Delete {
    identity: usize,
    child: NodeId,
}

impl Delete {
    fn apply(&self, base: &mut Tree) {
        if base.parent(self.child).is_some() {
            base.detach(self.child);
        }
    }
}

impl fmt::Display for Delete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delete {}", self.identity)
    }
}

/// A relocation, held as its two halves so the replay can schedule them
/// independently of each other and of unrelated structural edits.
#[derive(Debug, Clone)]
pub struct Move {
    delete: Delete,
    insert: Insert,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "move ({}, {})", self.delete, self.insert)
    }
}

/// Content adoption or three-way resolution for one identity. Both slots
/// may be filled by independent detection passes against the same base node.
#[derive(Debug, Clone)]
pub struct Update {
    identity: usize,
    base: NodeId,
    local: Option<NodeId>,
    remote: Option<NodeId>,
}

impl Update {
    fn set_edit(&mut self, side: Side, node: NodeId) {
        match side {
            Side::Local => self.local = Some(node),
            Side::Remote => self.remote = Some(node),
        }
    }

    fn apply(&self, base: &mut Tree, local: &Tree, remote: &Tree, report: &mut MergeReport) {
        match (self.local, self.remote) {
            (Some(l), Some(r)) => {
                report.total_conflicts += 1;
                if base.merge(self.base, local, l, remote, r) {
                    report.solved_conflicts += 1;
                }
            }
            (Some(l), None) => base.update(self.base, local, l),
            (None, Some(r)) => base.update(self.base, remote, r),
            (None, None) => {}
        }
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "update {}", self.identity)
    }
}

/// One atomic edit, as recorded by the differ.
#[derive(Debug, Clone)]
pub enum Action {
    Insert(Insert),
    Delete(Delete),
    Move(Move),
    Update(Update),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Insert(a) => fmt::Display::fmt(a, f),
            Action::Delete(a) => fmt::Display::fmt(a, f),
            Action::Move(a) => fmt::Display::fmt(a, f),
            Action::Update(a) => fmt::Display::fmt(a, f),
        }
    }
}

/// Conflict counters for one merge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub total_conflicts: usize,
    pub solved_conflicts: usize,
}

/// The edit script for one merge run. Each identity contributes at most one
/// delete, one insert, and one update; a second recording for the same
/// identity is dropped (both sides deleting the same node, for instance).
#[derive(Debug, Default)]
pub struct ActionSet {
    deletes: Vec<Delete>,
    inserts: Vec<Insert>,
    moves: Vec<Move>,
    updates: BTreeMap<usize, Update>,
    deleted: HashSet<usize>,
    inserted: HashSet<usize>,
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_insert(&mut self, identity: usize, parent: NodeId, child: InsertSource, position: usize) {
        if self.inserted.insert(identity) {
            self.inserts.push(Insert {
                identity,
                parent,
                child,
                position,
            });
        }
    }

    pub fn add_delete(&mut self, identity: usize, child: NodeId) {
        if self.deleted.insert(identity) {
            self.deletes.push(Delete { identity, child });
        }
    }

    pub fn add_move(&mut self, identity: usize, dest_parent: NodeId, child: NodeId, position: usize) {
        if self.deleted.contains(&identity) || self.inserted.contains(&identity) {
            return;
        }
        self.deleted.insert(identity);
        self.inserted.insert(identity);
        self.moves.push(Move {
            delete: Delete { identity, child },
            insert: Insert {
                identity,
                parent: dest_parent,
                child: InsertSource::Base(child),
                position,
            },
        });
    }

    pub fn add_update(&mut self, identity: usize, base: NodeId, side: Side, edit: NodeId) {
        self.updates
            .entry(identity)
            .or_insert(Update {
                identity,
                base,
                local: None,
                remote: None,
            })
            .set_edit(side, edit);
    }

    pub fn len(&self) -> usize {
        self.deletes.len() + self.inserts.len() + self.moves.len() + self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The recorded actions in replay order, for logging and inspection.
    pub fn actions(&self) -> Vec<Action> {
        let mut out: Vec<Action> = Vec::with_capacity(self.len());
        out.extend(self.deletes.iter().cloned().map(Action::Delete));
        out.extend(self.moves.iter().cloned().map(Action::Move));
        out.extend(self.inserts.iter().cloned().map(Action::Insert));
        out.extend(self.updates.values().cloned().map(Action::Update));
        out
    }

    /// Replay the edit script onto the base tree and return the conflict
    /// counters.
    pub fn apply(&self, base: &mut Tree, local: &Tree, remote: &Tree) -> Result<MergeReport, MergeError> {
        for delete in &self.deletes {
            delete.apply(base);
        }
        for mv in &self.moves {
            mv.delete.apply(base);
        }

        let mut inserts: Vec<&Insert> = self
            .inserts
            .iter()
            .chain(self.moves.iter().map(|mv| &mv.insert))
            .collect();
        inserts.sort_by_key(|ins| (ins.parent, ins.position));
        for insert in inserts {
            insert.apply(base, local, remote)?;
        }

        let mut report = MergeReport::default();
        for update in self.updates.values() {
            update.apply(base, local, remote, &mut report);
        }
        Ok(report)
    }
}
