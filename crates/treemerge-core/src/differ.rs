//! Change classification over the match table.
//!
//! Every (match, side) pair is inspected exactly once. A missing base slot
//! means the side inserted the node, a missing edit slot means the side
//! deleted it, and when both slots are present the node's placement and
//! content are compared separately: a placement change becomes a move (plus
//! an update, since relocation usually drags indentation along) and a
//! content change becomes an update attributed to that side. Identity 0 is
//! the root and never produces actions.

use crate::actions::{ActionSet, InsertSource, MergeError};
use crate::matcher::{Match, MatchSet, Side};
use crate::tree::Tree;

/// Classify every identity against both edited sides and collect the edit
/// script to replay.
pub fn diff_trees(
    base: &Tree,
    local: &Tree,
    remote: &Tree,
    matches: &MatchSet,
) -> Result<ActionSet, MergeError> {
    let mut actions = ActionSet::new();
    for m in matches.iter() {
        detect(&mut actions, matches, base, local, m, Side::Local)?;
        detect(&mut actions, matches, base, remote, m, Side::Remote)?;
    }
    Ok(actions)
}

fn detect(
    actions: &mut ActionSet,
    matches: &MatchSet,
    base: &Tree,
    edit_tree: &Tree,
    m: &Match,
    side: Side,
) -> Result<(), MergeError> {
    if m.id == 0 {
        return Ok(());
    }

    match (m.base, m.edit(side)) {
        (None, Some(edit)) => {
            let Some(edit_parent) = edit_tree.parent(edit) else {
                return Ok(());
            };
            let parent_id = matches.identity_of(side, edit_parent);
            if let Some(dest) = matches.get(parent_id).base {
                let position = edit_tree
                    .child_index(edit)
                    .ok_or(MergeError::UndefinedIndex { identity: m.id })?;
                actions.add_insert(m.id, dest, InsertSource::Edit(side, edit), position);
            }
            // otherwise the parent was itself inserted and this node arrives
            // inside that subtree
        }
        (Some(node), None) => actions.add_delete(m.id, node),
        (Some(node), Some(edit)) => {
            if let (Some(base_parent), Some(edit_parent)) =
                (base.parent(node), edit_tree.parent(edit))
            {
                let base_parent_id = matches.identity_in_base(base_parent);
                let edit_parent_id = matches.identity_of(side, edit_parent);
                let base_index = base
                    .child_index(node)
                    .ok_or(MergeError::UndefinedIndex { identity: m.id })?;
                let edit_index = edit_tree
                    .child_index(edit)
                    .ok_or(MergeError::UndefinedIndex { identity: m.id })?;

                if base_parent_id != edit_parent_id || base_index != edit_index {
                    let dest = matches
                        .get(edit_parent_id)
                        .base
                        .ok_or(MergeError::MoveDestination { identity: m.id })?;
                    actions.add_move(m.id, dest, node, edit_index);
                    // relocation also drags indentation along
                    actions.add_update(m.id, node, side, edit);
                }
            }
            if base.node(node).content != edit_tree.node(edit).content {
                actions.add_update(m.id, node, side, edit);
            }
        }
        (None, None) => {}
    }
    Ok(())
}
