//! # treemerge-core
//!
//! Structural three-way merge of source files. Instead of diffing raw text
//! lines, the two edited variants of a file are diffed against their common
//! ancestor as parsed trees, so renames, moves, and edits to disjoint tree
//! regions merge cleanly and only concurrent edits to the same syntactic
//! unit surface as conflicts.
//!
//! ## Pipeline
//!
//! 1. **Parse** — each file becomes a tree of line-level nodes with a
//!    category tag, content, and indentation (`parser`).
//! 2. **Align** — base nodes are labeled with identities 0..N-1 in
//!    depth-first order and each edited tree is greedily matched against
//!    them; edited nodes with no base counterpart get fresh identities
//!    (`matcher`).
//! 3. **Diff** — every (match, side) pair is classified once into insert,
//!    delete, move, or update actions (`differ`).
//! 4. **Replay** — the action set mutates the base tree in place: structure
//!    first, content last, with concurrent edits to one node resolved per
//!    node kind and counted in the merge report (`actions`).
//!
//! Content conflicts are never fatal: the resolution capability always
//! leaves some merged content behind and the report says how many conflicts
//! were reconciled automatically. Structural invariant violations (a move
//! into a parent that does not exist in the base tree, an insert index out
//! of bounds) abort the run instead.
//!
//! ## Example
//!
//! ```rust
//! use treemerge_core::{merge_trees, parse_source};
//!
//! let mut base = parse_source("import x\n").unwrap();
//! let local = parse_source("import x\nimport y\n").unwrap();
//! let remote = parse_source("import x\n").unwrap();
//!
//! let report = merge_trees(&mut base, &local, &remote).unwrap();
//! assert_eq!(report.total_conflicts, 0);
//! assert_eq!(base.unparse(), "import x\nimport y\n");
//! ```

pub mod actions;
pub mod differ;
pub mod matcher;
pub mod parser;
pub mod tree;

pub use actions::{Action, ActionSet, InsertSource, MergeError, MergeReport};
pub use differ::diff_trees;
pub use matcher::{align_trees, normalized_distance, Match, MatchSet, Side};
pub use parser::{parse_file, parse_source, ParseError};
pub use tree::{Node, NodeId, NodeKind, Tree};

/// Align, diff, and replay in one call, mutating `base` into the merged
/// tree. Local and remote are only read.
pub fn merge_trees(base: &mut Tree, local: &Tree, remote: &Tree) -> Result<MergeReport, MergeError> {
    let matches = align_trees(base, local, remote);
    let actions = diff_trees(base, local, remote, &matches)?;
    tracing::debug!(
        identities = matches.len(),
        actions = actions.len(),
        "replaying edit script"
    );
    actions.apply(base, local, remote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_merge_is_a_no_op() {
        let src = "import os\n\ndef f():\n    return 1\n";
        let mut base = parse_source(src).unwrap();
        let local = parse_source(src).unwrap();
        let remote = parse_source(src).unwrap();

        let report = merge_trees(&mut base, &local, &remote).unwrap();
        assert_eq!(report, MergeReport::default());
        assert_eq!(base.unparse(), src);
    }

    #[test]
    fn test_disjoint_edits_merge_cleanly() {
        let mut base = parse_source("import x\ndef f(): pass\n").unwrap();
        let local = parse_source("import x\ndef f(): pass\ndef g(): pass\n").unwrap();
        let remote = parse_source("import x\ndef f(): return 1\n").unwrap();

        let report = merge_trees(&mut base, &local, &remote).unwrap();
        assert_eq!(report.total_conflicts, 0);
        assert_eq!(
            base.unparse(),
            "import x\ndef f(): return 1\ndef g(): pass\n"
        );
    }

    #[test]
    fn test_convergent_edit_counts_as_solved() {
        let mut base = parse_source("x = 1\n").unwrap();
        let local = parse_source("x = 2\n").unwrap();
        let remote = parse_source("x = 2\n").unwrap();

        let report = merge_trees(&mut base, &local, &remote).unwrap();
        assert_eq!(report.total_conflicts, 1);
        assert_eq!(report.solved_conflicts, 1);
        assert_eq!(base.unparse(), "x = 2\n");
    }

    #[test]
    fn test_divergent_edit_is_reported_not_fatal() {
        let mut base = parse_source("x = 1\n").unwrap();
        let local = parse_source("x = 2\n").unwrap();
        let remote = parse_source("x = 3\n").unwrap();

        let report = merge_trees(&mut base, &local, &remote).unwrap();
        assert_eq!(report.total_conflicts, 1);
        assert_eq!(report.solved_conflicts, 0);
        let merged = base.unparse();
        assert!(merged.contains("<<<<<<< LOCAL"));
        assert!(merged.contains(">>>>>>> REMOTE"));
    }

    #[test]
    fn test_pure_deletion_end_to_end() {
        let mut base = parse_source("import os\nx = 1\n").unwrap();
        let local = parse_source("import os\nx = 1\n").unwrap();
        let remote = parse_source("import os\n").unwrap();

        let report = merge_trees(&mut base, &local, &remote).unwrap();
        assert_eq!(report.total_conflicts, 0);
        assert_eq!(base.unparse(), "import os\n");
    }

    #[test]
    fn test_reindent_and_rewrite_do_not_conflict() {
        // local only re-indents the body line in place; remote rewrites it.
        // Indentation is not content, so this is a clean one-sided update.
        let mut base = parse_source("def f():\n    return 1\n").unwrap();
        let local = parse_source("def f():\n        return 1\n").unwrap();
        let remote = parse_source("def f():\n    return 2\n").unwrap();

        let report = merge_trees(&mut base, &local, &remote).unwrap();
        assert_eq!(report.total_conflicts, 0);
        assert_eq!(base.unparse(), "def f():\n    return 2\n");
    }
}
