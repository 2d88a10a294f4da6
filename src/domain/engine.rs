//! Aggregation engine: values the leaves, then rolls values up to the root.
//!
//! The engine is generic over a [`RollUp`] specialization that supplies the
//! two domain operations:
//! - `compute_leaf_values`: assign a value to every leaf
//! - `combine_children`: derive a parent's value from its resolved children
//!
//! Everything else (frontier bookkeeping, ordering, structural checks) lives
//! in [`Aggregator`].

use std::collections::BTreeSet;
use std::marker::PhantomData;

use generational_arena::Index;
use tracing::{debug, instrument, trace};

use crate::domain::arena::TreeArena;
use crate::domain::error::{EngineError, TreeError};

/// Capability pair a concrete aggregation supplies.
pub trait RollUp {
    /// Payload stored on every node.
    type Value;
    /// Failure type of the two operations, propagated unchanged.
    type Error: std::error::Error + 'static;

    /// Assign a value to every leaf in `leaves`.
    fn compute_leaf_values(&self, leaves: &mut LeafValues<'_, Self::Value>)
        -> Result<(), Self::Error>;

    /// Value of `parent`, computed from its already resolved children.
    fn combine_children(&self, parent: &NodeView<'_, Self::Value>)
        -> Result<Self::Value, Self::Error>;
}

/// Write access to the leaf values of a tree during the leaf step.
pub struct LeafValues<'a, V> {
    tree: &'a mut TreeArena<V>,
}

impl<'a, V> LeafValues<'a, V> {
    /// Leaf names in creation order.
    pub fn names(&self) -> Vec<String> {
        self.tree
            .leaf_nodes()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.leaves().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.leaves().is_empty()
    }

    /// Read-only view of the whole tree, e.g. to inspect registry or ancestry.
    pub fn tree(&self) -> &TreeArena<V> {
        self.tree
    }

    /// Sets the value of leaf `name`.
    pub fn set(&mut self, name: &str, value: V) -> Result<(), TreeError> {
        match self.tree.lookup(name) {
            Some(idx) if self.tree.is_leaf(idx) => {
                self.tree.set_value(idx, value);
                Ok(())
            }
            _ => Err(TreeError::UnknownNode(name.to_string())),
        }
    }

    /// Computes every leaf value with `f`, stopping at the first failure.
    pub fn try_fill<E, F>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<V, E>,
    {
        let leaves: Vec<Index> = self.tree.leaves().iter().copied().collect();
        for idx in leaves {
            let value = f(self.tree.name(idx))?;
            self.tree.set_value(idx, value);
        }
        Ok(())
    }
}

/// Read-only view of one node and its children during a combine step.
pub struct NodeView<'a, V> {
    tree: &'a TreeArena<V>,
    index: Index,
}

impl<'a, V> NodeView<'a, V> {
    pub fn index(&self) -> Index {
        self.index
    }

    pub fn name(&self) -> &'a str {
        self.tree.name(self.index)
    }

    pub fn tree(&self) -> &'a TreeArena<V> {
        self.tree
    }

    /// Children as `(name, value)` pairs in input order.
    pub fn children(&self) -> impl Iterator<Item = (&'a str, Option<&'a V>)> + 'a {
        let tree = self.tree;
        self.child_indices()
            .iter()
            .filter_map(move |&c| tree.get_node(c))
            .map(|node| (node.name.as_str(), node.value.as_ref()))
    }

    /// Resolved child values in input order.
    pub fn child_values(&self) -> impl Iterator<Item = &'a V> + 'a {
        self.children().filter_map(|(_, value)| value)
    }

    pub fn child_count(&self) -> usize {
        self.child_indices().len()
    }

    fn child_indices(&self) -> &'a [Index] {
        self.tree
            .get_node(self.index)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }
}

/// `RollUp` built from two closures.
pub struct FnRollUp<V, E, L, C> {
    leaf: L,
    combine: C,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E, L, C> FnRollUp<V, E, L, C>
where
    E: std::error::Error + 'static,
    L: Fn(&mut LeafValues<'_, V>) -> Result<(), E>,
    C: Fn(&NodeView<'_, V>) -> Result<V, E>,
{
    pub fn new(leaf: L, combine: C) -> Self {
        Self {
            leaf,
            combine,
            _marker: PhantomData,
        }
    }
}

impl<V, E, L, C> RollUp for FnRollUp<V, E, L, C>
where
    E: std::error::Error + 'static,
    L: Fn(&mut LeafValues<'_, V>) -> Result<(), E>,
    C: Fn(&NodeView<'_, V>) -> Result<V, E>,
{
    type Value = V;
    type Error = E;

    fn compute_leaf_values(&self, leaves: &mut LeafValues<'_, V>) -> Result<(), E> {
        (self.leaf)(leaves)
    }

    fn combine_children(&self, parent: &NodeView<'_, V>) -> Result<V, E> {
        (self.combine)(parent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Built,
    LeavesComputed,
    Resolved,
}

/// Drives one aggregation run over a tree it owns.
pub struct Aggregator<R: RollUp> {
    tree: TreeArena<R::Value>,
    rollup: R,
    stage: Stage,
}

impl<R: RollUp> Aggregator<R> {
    pub fn new(tree: TreeArena<R::Value>, rollup: R) -> Self {
        Self {
            tree,
            rollup,
            stage: Stage::Built,
        }
    }

    pub fn tree(&self) -> &TreeArena<R::Value> {
        &self.tree
    }

    pub fn into_tree(self) -> TreeArena<R::Value> {
        self.tree
    }

    pub fn is_resolved(&self) -> bool {
        self.stage == Stage::Resolved
    }

    /// Leaf step then roll-up; returns the fully valued tree.
    pub fn run(mut self) -> Result<TreeArena<R::Value>, EngineError<R::Error>> {
        self.roll_up()?;
        Ok(self.tree)
    }

    /// Runs the specialization's leaf step once.
    #[instrument(level = "debug", skip(self))]
    pub fn compute_leaf_values(&mut self) -> Result<(), EngineError<R::Error>> {
        if self.stage != Stage::Built {
            trace!("leaf values already computed");
            return Ok(());
        }
        let mut leaves = LeafValues {
            tree: &mut self.tree,
        };
        self.rollup
            .compute_leaf_values(&mut leaves)
            .map_err(EngineError::LeafComputation)?;

        if let Some(&idx) = self
            .tree
            .leaves()
            .iter()
            .find(|&&idx| self.tree.get_node(idx).is_some_and(|n| n.value.is_none()))
        {
            return Err(TreeError::UnresolvedLeaf(self.tree.name(idx).to_string()).into());
        }
        debug!("computed {} leaf values", self.tree.leaves().len());
        self.stage = Stage::LeavesComputed;
        Ok(())
    }

    /// Propagates values from the leaves to the root.
    ///
    /// A second call on a resolved tree does nothing.
    #[instrument(level = "debug", skip(self))]
    pub fn roll_up(&mut self) -> Result<(), EngineError<R::Error>> {
        match self.stage {
            Stage::Resolved => {
                trace!("tree already resolved");
                return Ok(());
            }
            Stage::Built => self.compute_leaf_values()?,
            Stage::LeavesComputed => {}
        }

        let root = self.tree.root().ok_or(TreeError::MissingRoot)?;
        let mut frontier: BTreeSet<Index> = self.tree.leaves().clone();
        let mut combined = 0usize;

        while !(frontier.len() == 1 && frontier.contains(&root)) {
            let Some(parent) = self.next_ready_parent(&frontier) else {
                let mut unresolved = self.tree.unresolved();
                if unresolved.is_empty() {
                    // resolved but parentless: detached subtrees
                    unresolved = frontier
                        .iter()
                        .filter(|&&idx| idx != root)
                        .map(|&idx| self.tree.name(idx).to_string())
                        .collect();
                }
                return Err(TreeError::IncompleteAggregation { unresolved }.into());
            };

            let value = {
                let view = NodeView {
                    tree: &self.tree,
                    index: parent,
                };
                self.rollup
                    .combine_children(&view)
                    .map_err(|source| EngineError::Combine {
                        node: view.name().to_string(),
                        source,
                    })?
            };
            trace!("combined '{}'", self.tree.name(parent));
            self.tree.set_value(parent, value);

            if let Some(node) = self.tree.get_node(parent) {
                for child in &node.children {
                    frontier.remove(child);
                }
            }
            frontier.insert(parent);
            combined += 1;
        }

        // nodes on a cycle never enter the frontier
        let unresolved = self.tree.unresolved();
        if !unresolved.is_empty() {
            return Err(TreeError::IncompleteAggregation { unresolved }.into());
        }

        debug!("rolled up {} internal nodes", combined);
        self.stage = Stage::Resolved;
        Ok(())
    }

    /// First parent, in frontier order, whose children are all in the frontier.
    fn next_ready_parent(&self, frontier: &BTreeSet<Index>) -> Option<Index> {
        frontier
            .iter()
            .filter_map(|&idx| self.tree.get_node(idx).and_then(|n| n.parent))
            .find(|&parent| {
                self.tree
                    .get_node(parent)
                    .is_some_and(|p| p.children.iter().all(|c| frontier.contains(c)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::builder::TreeBuilder;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::fmt;

    #[derive(Debug)]
    struct Missing(String);

    impl fmt::Display for Missing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "missing {}", self.0)
        }
    }

    impl std::error::Error for Missing {}

    struct Sum {
        values: HashMap<&'static str, i64>,
        combines: Cell<usize>,
    }

    impl RollUp for Sum {
        type Value = i64;
        type Error = Missing;

        fn compute_leaf_values(&self, leaves: &mut LeafValues<'_, i64>) -> Result<(), Missing> {
            leaves.try_fill(|name| {
                self.values
                    .get(name)
                    .copied()
                    .ok_or_else(|| Missing(name.to_string()))
            })
        }

        fn combine_children(&self, parent: &NodeView<'_, i64>) -> Result<i64, Missing> {
            self.combines.set(self.combines.get() + 1);
            Ok(parent.child_values().sum())
        }
    }

    fn sum(values: &[(&'static str, i64)]) -> Sum {
        Sum {
            values: values.iter().copied().collect(),
            combines: Cell::new(0),
        }
    }

    fn tree(input: &str) -> TreeArena<i64> {
        TreeBuilder::new().build_from_str(input).unwrap()
    }

    #[test]
    fn given_resolved_tree_when_rolling_up_again_then_no_recompute() {
        let mut agg = Aggregator::new(
            tree("None,R\nR,A,B\n"),
            sum(&[("A", 1), ("B", 2)]),
        );
        agg.roll_up().unwrap();
        agg.roll_up().unwrap();
        assert!(agg.is_resolved());
        assert_eq!(agg.rollup.combines.get(), 1);
        assert_eq!(agg.tree().value("R"), Some(&3));
    }

    #[test]
    fn given_missing_leaf_value_when_computing_then_specialization_error_propagates() {
        let agg = Aggregator::new(tree("None,R\nR,A,B\n"), sum(&[("A", 1)]));
        match agg.run() {
            Err(EngineError::LeafComputation(Missing(name))) => assert_eq!(name, "B"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn given_leaf_step_skipping_a_leaf_when_computing_then_unresolved_leaf() {
        let rollup = FnRollUp::new(
            |leaves: &mut LeafValues<'_, i64>| {
                leaves.set("A", 1).map_err(|e| Missing(e.to_string()))
            },
            |parent: &NodeView<'_, i64>| Ok::<_, Missing>(parent.child_values().sum()),
        );
        let result = Aggregator::new(tree("None,R\nR,A,B\n"), rollup).run();
        assert!(matches!(
            result,
            Err(EngineError::Tree(TreeError::UnresolvedLeaf(ref name))) if name == "B"
        ));
    }

    #[test]
    fn given_detached_cycle_when_rolling_up_then_incomplete() {
        let agg = Aggregator::new(
            tree("None,R\nR,L\nA,B\nB,A\n"),
            sum(&[("L", 1)]),
        );
        match agg.run() {
            Err(EngineError::Tree(TreeError::IncompleteAggregation { unresolved })) => {
                assert_eq!(unresolved, vec!["A", "B"]);
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn given_disconnected_component_when_rolling_up_then_incomplete() {
        let agg = Aggregator::new(
            tree("None,R\nR,L\nX,Y\n"),
            sum(&[("L", 1), ("Y", 2)]),
        );
        match agg.run() {
            Err(EngineError::Tree(TreeError::IncompleteAggregation { unresolved })) => {
                assert_eq!(unresolved, vec!["X"]);
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn given_setting_internal_node_when_leaf_step_then_unknown_node() {
        let mut t = tree("None,R\nR,A\n");
        let mut leaves = LeafValues { tree: &mut t };
        assert!(matches!(leaves.set("R", 5), Err(TreeError::UnknownNode(_))));
        assert!(leaves.set("A", 5).is_ok());
    }
}
