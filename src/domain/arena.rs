use std::collections::{BTreeSet, HashMap};

use generational_arena::{Arena, Index};
use tracing::instrument;

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct TreeNode<V> {
    /// Unique node name, the registry key
    pub name: String,
    /// Computed payload, None until aggregation assigns it
    pub value: Option<V>,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in input order
    pub children: Vec<Index>,
}

impl<V> TreeNode<V> {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-based tree with a name registry and a leaf set.
///
/// Nodes are never removed, so arena order equals creation order and
/// iterating `leaves()` is stable across runs over the same input.
#[derive(Debug, Clone)]
pub struct TreeArena<V> {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode<V>>,
    /// Name to arena index lookup
    registry: HashMap<String, Index>,
    /// Nodes currently without children
    leaves: BTreeSet<Index>,
    /// Index of the root node, None until designated
    root: Option<Index>,
}

impl<V> Default for TreeArena<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TreeArena<V> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            registry: HashMap::new(),
            leaves: BTreeSet::new(),
            root: None,
        }
    }

    /// Returns the index for `name`, creating the node on first mention.
    ///
    /// The flag is true when the node was created by this call.
    #[instrument(level = "trace", skip(self))]
    pub fn resolve_or_create(&mut self, name: &str) -> (Index, bool) {
        if let Some(&idx) = self.registry.get(name) {
            return (idx, false);
        }
        let idx = self.arena.insert(TreeNode::new(name));
        self.registry.insert(name.to_string(), idx);
        (idx, true)
    }

    pub fn lookup(&self, name: &str) -> Option<Index> {
        self.registry.get(name).copied()
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode<V>> {
        self.arena.get(idx)
    }

    /// Name of the node at `idx`, empty for stale indices.
    pub fn name(&self, idx: Index) -> &str {
        self.arena.get(idx).map(|n| n.name.as_str()).unwrap_or("")
    }

    /// Value of the named node, if the node exists and is resolved.
    pub fn value(&self, name: &str) -> Option<&V> {
        self.lookup(name)
            .and_then(|idx| self.arena.get(idx))
            .and_then(|node| node.value.as_ref())
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub(crate) fn set_root(&mut self, idx: Index) {
        if let Some(node) = self.arena.get_mut(idx) {
            node.parent = None;
        }
        self.root = Some(idx);
    }

    pub fn registry(&self) -> &HashMap<String, Index> {
        &self.registry
    }

    pub fn leaves(&self) -> &BTreeSet<Index> {
        &self.leaves
    }

    pub fn is_leaf(&self, idx: Index) -> bool {
        self.leaves.contains(&idx)
    }

    pub(crate) fn mark_leaf(&mut self, idx: Index) {
        self.leaves.insert(idx);
    }

    pub(crate) fn revoke_leaf(&mut self, idx: Index) -> bool {
        self.leaves.remove(&idx)
    }

    /// Links `child` under `parent`, appending to the parent's child list.
    pub(crate) fn link(&mut self, parent: Index, child: Index) {
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.arena.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Removes `child` from the child list of `parent` and clears its parent link.
    pub(crate) fn unlink(&mut self, parent: Index, child: Index) {
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.arena.get_mut(child) {
            node.parent = None;
        }
    }

    pub(crate) fn set_value(&mut self, idx: Index, value: V) {
        if let Some(node) = self.arena.get_mut(idx) {
            node.value = Some(value);
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// All nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (Index, &TreeNode<V>)> {
        self.arena.iter()
    }

    /// Number of levels below and including the root.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        if let Some(root) = self.root {
            self.calculate_depth(root)
        } else {
            0
        }
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(node_idx, 1)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(node) = self.get_node(idx) {
                stack.extend(node.children.iter().map(|&c| (c, depth + 1)));
            }
        }
        max_depth
    }

    /// Names of all leaf nodes in creation order.
    pub fn leaf_nodes(&self) -> Vec<&str> {
        self.leaves.iter().map(|&idx| self.name(idx)).collect()
    }

    /// Names of nodes that carry no value yet, in creation order.
    pub fn unresolved(&self) -> Vec<String> {
        self.arena
            .iter()
            .filter(|(_, node)| node.value.is_none())
            .map(|(_, node)| node.name.clone())
            .collect()
    }
}
