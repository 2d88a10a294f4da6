//! Depth-first pre-order walk over a tree, yielding depth and value per node.

use generational_arena::Index;

use crate::domain::arena::TreeArena;
use crate::domain::error::{TreeError, TreeResult};

/// One node reached by a [`Walk`].
#[derive(Debug)]
pub struct Visit<'a, V> {
    pub index: Index,
    pub name: &'a str,
    /// Distance from the walk's starting node
    pub depth: usize,
    pub value: Option<&'a V>,
}

impl<V> Visit<'_, V> {
    /// Node name prefixed with `prefix` once per level of depth.
    pub fn label(&self, prefix: &str) -> String {
        format!("{}{}", prefix.repeat(self.depth), self.name)
    }
}

/// Lazy pre-order iterator; build a new one to restart.
pub struct Walk<'a, V> {
    tree: &'a TreeArena<V>,
    stack: Vec<(Index, usize)>,
    max_depth: Option<usize>,
}

impl<'a, V> Iterator for Walk<'a, V> {
    type Item = Visit<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((idx, depth)) = self.stack.pop() {
            let Some(node) = self.tree.get_node(idx) else {
                continue;
            };
            if self.max_depth.map_or(true, |max| depth < max) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push((child, depth + 1));
                }
            }
            return Some(Visit {
                index: idx,
                name: node.name.as_str(),
                depth,
                value: node.value.as_ref(),
            });
        }
        None
    }
}

impl<V> TreeArena<V> {
    /// Walk from `focus` (the root when None), descending at most `max_depth` levels.
    pub fn walk(&self, focus: Option<Index>, max_depth: Option<usize>) -> Walk<'_, V> {
        let stack = focus.or(self.root()).map(|start| vec![(start, 0)]).unwrap_or_default();
        Walk {
            tree: self,
            stack,
            max_depth,
        }
    }

    /// Like [`TreeArena::walk`] with the focus given by name.
    pub fn walk_named(&self, focus: Option<&str>, max_depth: Option<usize>) -> TreeResult<Walk<'_, V>> {
        let focus = match focus {
            Some(name) => Some(
                self.lookup(name)
                    .ok_or_else(|| TreeError::UnknownNode(name.to_string()))?,
            ),
            None => None,
        };
        Ok(self.walk(focus, max_depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::builder::TreeBuilder;
    use rstest::rstest;

    fn sample() -> TreeArena<f64> {
        TreeBuilder::new()
            .build_from_str("None,Root\nRoot,A,B\nA,L1,L2\nB,L3\n")
            .unwrap()
    }

    #[test]
    fn given_tree_when_walking_then_pre_order_left_to_right() {
        let tree = sample();
        let order: Vec<(&str, usize)> = tree.walk(None, None).map(|v| (v.name, v.depth)).collect();
        assert_eq!(
            order,
            vec![("Root", 0), ("A", 1), ("L1", 2), ("L2", 2), ("B", 1), ("L3", 2)]
        );
    }

    #[rstest]
    #[case(None, 0, vec!["Root"])]
    #[case(None, 1, vec!["Root", "A", "B"])]
    #[case(Some("A"), 0, vec!["A"])]
    #[case(Some("B"), 1, vec!["B", "L3"])]
    fn given_max_depth_when_walking_then_cut_off(
        #[case] focus: Option<&str>,
        #[case] max_depth: usize,
        #[case] expected: Vec<&str>,
    ) {
        let tree = sample();
        let names: Vec<&str> = tree
            .walk_named(focus, Some(max_depth))
            .unwrap()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn given_walk_when_iterated_twice_then_restarts() {
        let tree = sample();
        assert_eq!(tree.walk(None, None).count(), tree.walk(None, None).count());
    }

    #[test]
    fn given_depth_when_labelling_then_prefix_repeats() {
        let tree = sample();
        let labels: Vec<String> = tree.walk(None, Some(2)).map(|v| v.label("--")).collect();
        assert_eq!(labels[0], "Root");
        assert_eq!(labels[2], "----L1");
    }

    #[test]
    fn given_unknown_focus_when_walking_then_errors() {
        let tree = sample();
        assert!(matches!(
            tree.walk_named(Some("nope"), None),
            Err(TreeError::UnknownNode(_))
        ));
    }
}
