//! Cross-tree node alignment.
//!
//! Labels the base tree with identities 0..N-1 in depth-first order, then
//! greedily aligns each edited tree against those identities: first
//! candidate in the edited tree's traversal order wins, no backtracking.
//! Leaves match on normalized case-insensitive Levenshtein distance, inner
//! nodes on exact label equality. Edited nodes with no base counterpart get
//! fresh identities so that insertions become comparable too.
//!
//! Greedy first-fit is a deliberate tradeoff: cost is pairwise over the
//! unconsumed nodes of both sides, which is fine for single files and would
//! not be for large corpora.

use std::collections::HashSet;

use crate::tree::{NodeId, Tree};

/// Two leaves match when their normalized edit distance is at or below this.
const SIM_THRESHOLD: f64 = 0.3;

/// Which edited variant a node or action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Local,
    Remote,
}

/// One identity's slots across the three trees.
#[derive(Debug, Clone)]
pub struct Match {
    pub id: usize,
    pub base: Option<NodeId>,
    pub local: Option<NodeId>,
    pub remote: Option<NodeId>,
}

impl Match {
    fn new(id: usize) -> Self {
        Match {
            id,
            base: None,
            local: None,
            remote: None,
        }
    }

    pub fn edit(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Local => self.local,
            Side::Remote => self.remote,
        }
    }

    fn set_edit(&mut self, side: Side, node: NodeId) {
        match side {
            Side::Local => self.local = Some(node),
            Side::Remote => self.remote = Some(node),
        }
    }
}

/// The identity space produced by alignment: one `Match` per identity plus
/// per-tree lookup tables from node to identity.
#[derive(Debug)]
pub struct MatchSet {
    matches: Vec<Match>,
    base_ids: Vec<usize>,
    local_ids: Vec<usize>,
    remote_ids: Vec<usize>,
}

impl MatchSet {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn get(&self, id: usize) -> &Match {
        &self.matches[id]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    pub fn identity_in_base(&self, node: NodeId) -> usize {
        self.base_ids[node]
    }

    pub fn identity_of(&self, side: Side, node: NodeId) -> usize {
        match side {
            Side::Local => self.local_ids[node],
            Side::Remote => self.remote_ids[node],
        }
    }
}

/// Build the shared identity space for one merge scenario.
pub fn align_trees(base: &Tree, local: &Tree, remote: &Tree) -> MatchSet {
    let mut matches = Vec::with_capacity(base.len());
    let mut base_ids = vec![0usize; base.len()];
    for (id, node) in base.preorder().enumerate() {
        let mut m = Match::new(id);
        m.base = Some(node);
        matches.push(m);
        base_ids[node] = id;
    }

    let local_ids = align_side(&mut matches, &base_ids, base, local, Side::Local);
    let remote_ids = align_side(&mut matches, &base_ids, base, remote, Side::Remote);

    MatchSet {
        matches,
        base_ids,
        local_ids,
        remote_ids,
    }
}

/// Greedily match one edited tree against the labeled base, then hand fresh
/// identities to whatever the edited side introduced. Returns the node→id
/// table for the edited tree.
fn align_side(
    matches: &mut Vec<Match>,
    base_ids: &[usize],
    base: &Tree,
    edit: &Tree,
    side: Side,
) -> Vec<usize> {
    let mut edit_ids = vec![usize::MAX; edit.len()];
    let mut matched: HashSet<usize> = HashSet::new();
    let mut consumed: HashSet<NodeId> = HashSet::new();

    // the roots always correspond
    matches[0].set_edit(side, edit.root());
    edit_ids[edit.root()] = 0;
    matched.insert(0);
    consumed.insert(edit.root());

    let edit_order: Vec<NodeId> = edit.preorder().collect();
    for b in base.preorder() {
        let id = base_ids[b];
        if matched.contains(&id) {
            continue;
        }
        for &e in &edit_order {
            if consumed.contains(&e) {
                continue;
            }
            if nodes_match(base, b, edit, e) {
                matches[id].set_edit(side, e);
                edit_ids[e] = id;
                matched.insert(id);
                consumed.insert(e);
                break;
            }
        }
    }

    for &e in &edit_order {
        if consumed.contains(&e) {
            continue;
        }
        let id = matches.len();
        let mut m = Match::new(id);
        m.set_edit(side, e);
        matches.push(m);
        edit_ids[e] = id;
    }

    edit_ids
}

fn nodes_match(base: &Tree, b: NodeId, edit: &Tree, e: NodeId) -> bool {
    if base.node(b).kind != edit.node(e).kind {
        return false;
    }
    if base.is_leaf(b) {
        normalized_distance(&base.node(b).content, &edit.node(e).content) <= SIM_THRESHOLD
    } else {
        base.label(b) == edit.label(e)
    }
}

/// Case-insensitive Levenshtein distance divided by the longer string's
/// length. 0.0 means identical (two empty strings included).
pub fn normalized_distance(a: &str, b: &str) -> f64 {
    let longer = a.chars().count().max(b.chars().count());
    if longer == 0 {
        return 0.0;
    }
    levenshtein(a, b) as f64 / longer as f64
}

/// Single-row DP over lowercased characters.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let mut costs: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        costs[0] = i;
        let mut nw = i - 1;
        for j in 1..=b.len() {
            let substitute = if a[i - 1] == b[j - 1] { nw } else { nw + 1 };
            let cj = substitute.min(1 + costs[j].min(costs[j - 1]));
            nw = costs[j];
            costs[j] = cj;
        }
    }
    costs[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    #[test]
    fn test_levenshtein_classic() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("cat", "car"), 1);
        assert_eq!(levenshtein("cat", "cats"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_levenshtein_ignores_case() {
        assert_eq!(levenshtein("FOO", "foo"), 0);
    }

    #[test]
    fn test_normalized_distance_boundaries() {
        // 3/7 and 1/3 exceed the 0.3 threshold, 1/4 does not
        assert!((normalized_distance("kitten", "sitting") - 3.0 / 7.0).abs() < 1e-9);
        assert!(normalized_distance("kitten", "sitting") > SIM_THRESHOLD);
        assert!(normalized_distance("cat", "car") > SIM_THRESHOLD);
        assert!(normalized_distance("cat", "cats") <= SIM_THRESHOLD);
        assert_eq!(normalized_distance("", ""), 0.0);
    }

    #[test]
    fn test_identical_trees_fully_match() {
        let src = "import os\ndef f():\n    return 1\n";
        let base = parse_source(src).unwrap();
        let local = parse_source(src).unwrap();
        let remote = parse_source(src).unwrap();

        let matches = align_trees(&base, &local, &remote);
        assert_eq!(matches.len(), base.len());
        for m in matches.iter() {
            assert!(m.base.is_some());
            assert!(m.local.is_some());
            assert!(m.remote.is_some());
        }
    }

    #[test]
    fn test_root_is_identity_zero() {
        let base = parse_source("x = 1\n").unwrap();
        let local = parse_source("x = 1\n").unwrap();
        let remote = parse_source("x = 1\n").unwrap();

        let matches = align_trees(&base, &local, &remote);
        let root = matches.get(0);
        assert_eq!(root.base, Some(base.root()));
        assert_eq!(root.local, Some(local.root()));
        assert_eq!(root.remote, Some(remote.root()));
    }

    #[test]
    fn test_inserted_node_gets_fresh_identity() {
        let base = parse_source("import os\n").unwrap();
        let local = parse_source("import os\ndef added():\n    return 1\n").unwrap();
        let remote = parse_source("import os\n").unwrap();

        let matches = align_trees(&base, &local, &remote);
        // root + import from base, plus the new def header and its body line
        assert_eq!(matches.len(), base.len() + 2);
        let fresh = matches.get(base.len());
        assert!(fresh.base.is_none());
        assert!(fresh.local.is_some());
        assert!(fresh.remote.is_none());
    }

    #[test]
    fn test_near_identical_leaf_matches() {
        let base = parse_source("x = 1000\n").unwrap();
        let local = parse_source("x = 1001\n").unwrap();
        let remote = parse_source("x = 1000\n").unwrap();

        let matches = align_trees(&base, &local, &remote);
        assert_eq!(matches.len(), 2);
        assert!(matches.get(1).local.is_some());
    }

    #[test]
    fn test_rewritten_leaf_does_not_match() {
        let base = parse_source("x = compute(1, 2)\n").unwrap();
        let local = parse_source("total_result = accumulate_everything()\n").unwrap();
        let remote = parse_source("x = compute(1, 2)\n").unwrap();

        let matches = align_trees(&base, &local, &remote);
        assert_eq!(matches.len(), 3);
        assert!(matches.get(1).local.is_none());
        assert!(matches.get(2).base.is_none());
    }

    #[test]
    fn test_inner_nodes_match_on_label() {
        // same declaration header, different parameter list formatting
        let base = parse_source("def f(a):\n    return a\n").unwrap();
        let local = parse_source("def f(a, b):\n    return a\n").unwrap();
        let remote = parse_source("def f(a):\n    return a\n").unwrap();

        let matches = align_trees(&base, &local, &remote);
        let f = matches.get(1);
        assert!(f.base.is_some());
        assert!(f.local.is_some());
    }

    #[test]
    fn test_kinds_never_cross_match() {
        let base = parse_source("return x\n").unwrap();
        let local = parse_source("returns = x\n").unwrap();
        let remote = parse_source("return x\n").unwrap();

        let matches = align_trees(&base, &local, &remote);
        // Return and Assignment stay separate identities despite similar text
        assert!(matches.get(1).local.is_none());
        assert_eq!(matches.len(), 3);
    }
}
