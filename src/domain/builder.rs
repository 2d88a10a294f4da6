//! Tree builder: turns adjacency records into a `TreeArena`.

use std::io::BufRead;

use generational_arena::Index;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use crate::domain::arena::TreeArena;
use crate::domain::error::{TreeError, TreeResult};
use crate::domain::record::{ParentRef, Record, DEFAULT_SENTINEL};

/// What happens when a node that already has a parent is attached elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReparentPolicy {
    /// Reject the second parent with `ReparentConflict`
    #[default]
    FailFast,
    /// Move the node under the most recent parent
    LastWriterWins,
}

/// Constructs a tree from `parent,child_1,...,child_N` records.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    sentinel: String,
    policy: ReparentPolicy,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            policy: ReparentPolicy::default(),
        }
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn with_policy(mut self, policy: ReparentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn policy(&self) -> ReparentPolicy {
        self.policy
    }

    /// Build a tree from line-oriented input.
    #[instrument(level = "debug", skip(self, reader))]
    pub fn build_from_reader<V, R: BufRead>(&self, reader: R) -> TreeResult<TreeArena<V>> {
        let mut records = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if let Some(record) = Record::parse(&line, i + 1, &self.sentinel)? {
                records.push(record);
            }
        }
        self.build_from_records(records)
    }

    /// Build a tree from in-memory text.
    pub fn build_from_str<V>(&self, input: &str) -> TreeResult<TreeArena<V>> {
        self.build_from_reader(input.as_bytes())
    }

    /// Build a tree from already parsed records.
    #[instrument(level = "debug", skip(self, records))]
    pub fn build_from_records<V, I>(&self, records: I) -> TreeResult<TreeArena<V>>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut tree = TreeArena::new();
        for record in records {
            self.apply(&mut tree, &record)?;
        }
        if tree.root().is_none() {
            return Err(TreeError::MissingRoot);
        }
        debug!(
            "built tree: nodes={}, leaves={}, depth={}, root={}",
            tree.len(),
            tree.leaves().len(),
            tree.depth(),
            tree.root().map(|r| tree.name(r)).unwrap_or_default()
        );
        Ok(tree)
    }

    fn apply<V>(&self, tree: &mut TreeArena<V>, record: &Record) -> TreeResult<()> {
        if record.children.is_empty() {
            return Err(TreeError::MalformedRecord {
                line: record.line,
                reason: "record has no children".to_string(),
            });
        }
        match &record.parent {
            ParentRef::Root => self.designate_root(tree, &record.children[0], record.line),
            ParentRef::Named(name) => {
                let (parent, _) = tree.resolve_or_create(name);
                if tree.revoke_leaf(parent) {
                    trace!("{} is no longer a leaf", name);
                }
                for child in &record.children {
                    self.attach(tree, parent, child, record.line)?;
                }
                // every claimed child may have been dropped in favour of the root
                if tree.get_node(parent).is_some_and(|n| n.is_leaf()) {
                    tree.mark_leaf(parent);
                }
                Ok(())
            }
        }
    }

    fn attach<V>(
        &self,
        tree: &mut TreeArena<V>,
        parent: Index,
        child_name: &str,
        line: usize,
    ) -> TreeResult<()> {
        if tree.name(parent) == child_name {
            return Err(TreeError::MalformedRecord {
                line,
                reason: format!("node '{}' cannot be its own child", child_name),
            });
        }

        let (child, created) = tree.resolve_or_create(child_name);
        if created {
            tree.mark_leaf(child);
        }

        if tree.root() == Some(child) {
            return self.resolve_conflict(tree, child, None, parent, line);
        }

        match tree.get_node(child).and_then(|n| n.parent) {
            None => {
                tree.link(parent, child);
                Ok(())
            }
            Some(existing) if existing == parent => {
                trace!("{} already attached to {}", child_name, tree.name(parent));
                Ok(())
            }
            Some(existing) => self.resolve_conflict(tree, child, Some(existing), parent, line),
        }
    }

    /// Handles a second parent claim on `child`.
    ///
    /// `existing = None` means the child is the root, owned by the sentinel.
    fn resolve_conflict<V>(
        &self,
        tree: &mut TreeArena<V>,
        child: Index,
        existing: Option<Index>,
        requested: Index,
        line: usize,
    ) -> TreeResult<()> {
        let existing_name = existing
            .map(|e| tree.name(e).to_string())
            .unwrap_or_else(|| self.sentinel.clone());

        match (self.policy, existing) {
            (ReparentPolicy::FailFast, _) => Err(TreeError::ReparentConflict {
                child: tree.name(child).to_string(),
                existing: existing_name,
                requested: tree.name(requested).to_string(),
            }),
            (ReparentPolicy::LastWriterWins, None) => {
                warn!(
                    "line {}: ignoring '{}' as parent of root '{}'",
                    line,
                    tree.name(requested),
                    tree.name(child)
                );
                Ok(())
            }
            (ReparentPolicy::LastWriterWins, Some(old)) => {
                debug!(
                    "line {}: moving '{}' from '{}' to '{}'",
                    line,
                    tree.name(child),
                    existing_name,
                    tree.name(requested)
                );
                self.detach(tree, old, child);
                tree.link(requested, child);
                Ok(())
            }
        }
    }

    fn designate_root<V>(&self, tree: &mut TreeArena<V>, name: &str, line: usize) -> TreeResult<()> {
        if let Some(first) = tree.root() {
            return Err(TreeError::AmbiguousRoot {
                first: tree.name(first).to_string(),
                second: name.to_string(),
            });
        }

        let (root, created) = tree.resolve_or_create(name);
        if created {
            tree.mark_leaf(root);
        }

        if let Some(old) = tree.get_node(root).and_then(|n| n.parent) {
            match self.policy {
                ReparentPolicy::FailFast => {
                    return Err(TreeError::ReparentConflict {
                        child: name.to_string(),
                        existing: tree.name(old).to_string(),
                        requested: self.sentinel.clone(),
                    });
                }
                ReparentPolicy::LastWriterWins => {
                    warn!(
                        "line {}: root '{}' detached from parent '{}'",
                        line,
                        name,
                        tree.name(old)
                    );
                    self.detach(tree, old, root);
                }
            }
        }

        debug!("line {}: root is '{}'", line, name);
        tree.set_root(root);
        Ok(())
    }

    /// Unlinks `child` from `parent`; a parent left without children is a leaf again.
    fn detach<V>(&self, tree: &mut TreeArena<V>, parent: Index, child: Index) {
        tree.unlink(parent, child);
        if tree.get_node(parent).is_some_and(|n| n.is_leaf()) {
            tree.mark_leaf(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &TreeArena<f64>) -> Vec<&str> {
        tree.leaf_nodes()
    }

    #[test]
    fn given_parent_mentioned_after_as_child_when_building_then_leaf_status_revoked() {
        let tree: TreeArena<f64> = TreeBuilder::new()
            .build_from_str("None,Root\nRoot,A,B\nA,L1\n")
            .unwrap();
        assert_eq!(names(&tree), vec!["B", "L1"]);
        assert!(!tree.is_leaf(tree.lookup("A").unwrap()));
    }

    #[test]
    fn given_duplicate_edge_when_building_then_child_listed_once() {
        let tree: TreeArena<f64> = TreeBuilder::new()
            .build_from_str("None,R\nR,A,A\nR,A\n")
            .unwrap();
        let root = tree.get_node(tree.root().unwrap()).unwrap();
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn given_self_edge_when_building_then_malformed() {
        let result: TreeResult<TreeArena<f64>> = TreeBuilder::new().build_from_str("None,R\nR,R\n");
        assert!(matches!(
            result,
            Err(TreeError::MalformedRecord { line: 2, .. })
        ));
    }

    #[test]
    fn given_last_writer_wins_when_reparenting_then_child_moves() {
        let tree: TreeArena<f64> = TreeBuilder::new()
            .with_policy(ReparentPolicy::LastWriterWins)
            .build_from_str("None,R\nR,A,B\nA,X\nB,X\n")
            .unwrap();
        let x = tree.lookup("X").unwrap();
        let a = tree.lookup("A").unwrap();
        let b = tree.lookup("B").unwrap();
        assert_eq!(tree.get_node(x).unwrap().parent, Some(b));
        assert!(tree.get_node(a).unwrap().children.is_empty());
        assert!(tree.is_leaf(a));
        assert!(!tree.is_leaf(b));
    }

    #[test]
    fn given_root_claimed_by_node_when_fail_fast_then_conflict() {
        let result: TreeResult<TreeArena<f64>> =
            TreeBuilder::new().build_from_str("None,R\nR,A\nA,R\n");
        match result {
            Err(TreeError::ReparentConflict { child, existing, requested }) => {
                assert_eq!(child, "R");
                assert_eq!(existing, "None");
                assert_eq!(requested, "A");
            }
            other => panic!("expected ReparentConflict, got {:?}", other),
        }
    }

    #[test]
    fn given_root_claimed_earlier_when_last_writer_wins_then_sentinel_wins() {
        let tree: TreeArena<f64> = TreeBuilder::new()
            .with_policy(ReparentPolicy::LastWriterWins)
            .build_from_str("P,R\nNone,R\nR,A\n")
            .unwrap();
        let r = tree.lookup("R").unwrap();
        let p = tree.lookup("P").unwrap();
        assert_eq!(tree.root(), Some(r));
        assert!(tree.get_node(r).unwrap().parent.is_none());
        assert!(tree.is_leaf(p));
    }

    #[test]
    fn given_root_claimed_later_when_last_writer_wins_then_claim_dropped() {
        let tree: TreeArena<f64> = TreeBuilder::new()
            .with_policy(ReparentPolicy::LastWriterWins)
            .build_from_str("None,R\nR,A\nA,R\n")
            .unwrap();
        let r = tree.lookup("R").unwrap();
        let a = tree.lookup("A").unwrap();
        assert!(tree.get_node(r).unwrap().parent.is_none());
        assert!(tree.get_node(a).unwrap().children.is_empty());
        assert!(tree.is_leaf(a));
    }
}
