//! Presentation of a valued tree: human-readable report, CSV and tree diagram.
//!
//! Rendering only consumes [`TreeArena::walk`]; it never touches the engine.

use generational_arena::Index;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use termtree::Tree;

use crate::domain::{TreeArena, TreeError, TreeNode, TreeResult, Visit};

/// Output layout.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RenderStyle {
    /// Padded, dot-filled report with grouped thousands
    #[default]
    Human,
    /// `label,value` rows for spreadsheets
    #[value(alias = "tabular")]
    #[serde(alias = "tabular")]
    Csv,
    /// Box-drawing tree diagram
    Tree,
}

impl RenderStyle {
    /// Depth marker used when no indent is configured.
    pub fn default_indent(self) -> &'static str {
        match self {
            RenderStyle::Human | RenderStyle::Tree => "---",
            RenderStyle::Csv => "___",
        }
    }
}

/// Most decimals an `f64` can meaningfully show.
pub const MAX_PRECISION: usize = 17;

/// Values the renderer knows how to print.
pub trait RenderValue {
    fn is_zero(&self) -> bool;

    /// Rounded to `precision` decimals, no grouping, shortest form.
    fn to_plain(&self, precision: usize) -> String;

    /// Exactly `precision` decimals with grouped thousands.
    fn to_grouped(&self, precision: usize) -> String;
}

impl RenderValue for f64 {
    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn to_plain(&self, precision: usize) -> String {
        let fixed = fixed_point(*self, precision);
        if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            fixed
        }
    }

    fn to_grouped(&self, precision: usize) -> String {
        group_thousands(&fixed_point(*self, precision))
    }
}

/// `value` with `precision` decimals (capped at [`MAX_PRECISION`]); no `-0`.
fn fixed_point(value: f64, precision: usize) -> String {
    let formatted = format!("{:.*}", precision.min(MAX_PRECISION), value);
    match formatted.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => formatted,
    }
}

impl RenderValue for i64 {
    fn is_zero(&self) -> bool {
        *self == 0
    }

    fn to_plain(&self, _precision: usize) -> String {
        self.to_string()
    }

    fn to_grouped(&self, _precision: usize) -> String {
        group_thousands(&self.to_string())
    }
}

/// Insert `,` between groups of three integer digits: `-1234.5` → `-1,234.5`.
pub fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    if !int.bytes().all(|b| b.is_ascii_digit()) {
        return formatted.to_string();
    }
    let grouped = int
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .join(",");
    match frac {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Knobs for one rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub style: RenderStyle,
    /// Title of the value column
    pub value_column: String,
    /// Depth marker; the style's default when None
    pub indent: Option<String>,
    /// Render only this subtree
    pub focus: Option<String>,
    pub max_depth: Option<usize>,
    /// Drop rows whose value is exactly zero
    pub hide_zero: bool,
    pub precision: usize,
    /// Width of the right-aligned value column in the human layout
    pub value_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            style: RenderStyle::default(),
            value_column: "Value".to_string(),
            indent: None,
            focus: None,
            max_depth: None,
            hide_zero: true,
            precision: 2,
            value_width: 20,
        }
    }
}

impl RenderOptions {
    fn indent(&self) -> &str {
        self.indent
            .as_deref()
            .unwrap_or_else(|| self.style.default_indent())
    }
}

/// Render a valued tree. No trailing newline.
pub fn render<V: RenderValue>(tree: &TreeArena<V>, opts: &RenderOptions) -> TreeResult<String> {
    if opts.style == RenderStyle::Tree {
        let start = focus_index(tree, opts.focus.as_deref())?;
        return Ok(diagram(tree, start, opts.max_depth, &|node: &TreeNode<V>| {
            match &node.value {
                Some(v) => format!("{} ({})", node.name, v.to_grouped(opts.precision)),
                None => node.name.clone(),
            }
        }));
    }

    let indent = opts.indent();
    let rows: Vec<(String, Option<&V>)> = tree
        .walk_named(opts.focus.as_deref(), opts.max_depth)?
        .filter(|visit| !(opts.hide_zero && visit.value.is_some_and(|v| v.is_zero())))
        .map(|visit: Visit<'_, V>| (visit.label(indent), visit.value))
        .collect();

    Ok(match opts.style {
        RenderStyle::Csv => render_csv(&rows, opts),
        _ => render_human(&rows, opts),
    })
}

/// Render structure only, one node name per diagram entry.
pub fn render_structure<V>(
    tree: &TreeArena<V>,
    focus: Option<&str>,
    max_depth: Option<usize>,
) -> TreeResult<String> {
    let start = focus_index(tree, focus)?;
    Ok(diagram(tree, start, max_depth, &|node: &TreeNode<V>| {
        node.name.clone()
    }))
}

fn render_human<V: RenderValue>(rows: &[(String, Option<&V>)], opts: &RenderOptions) -> String {
    let width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0)
        + 1;
    let value_width = opts.value_width;

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format!("{:width$}{:>value_width$}", "", opts.value_column));
    for (label, value) in rows {
        let text = value
            .map(|v| v.to_grouped(opts.precision))
            .unwrap_or_default();
        lines.push(format!("{:<width$}{:.>value_width$}", label, text));
    }
    lines.join("\n")
}

fn render_csv<V: RenderValue>(rows: &[(String, Option<&V>)], opts: &RenderOptions) -> String {
    let header = format!(",{}", opts.value_column);
    std::iter::once(header)
        .chain(rows.iter().map(|(label, value)| {
            let text = value
                .map(|v| v.to_plain(opts.precision))
                .unwrap_or_default();
            format!("{},{}", label, text)
        }))
        .join("\n")
}

fn focus_index<V>(tree: &TreeArena<V>, focus: Option<&str>) -> TreeResult<Option<Index>> {
    match focus {
        Some(name) => tree
            .lookup(name)
            .map(Some)
            .ok_or_else(|| TreeError::UnknownNode(name.to_string())),
        None => Ok(tree.root()),
    }
}

fn diagram<V>(
    tree: &TreeArena<V>,
    start: Option<Index>,
    max_depth: Option<usize>,
    label: &dyn Fn(&TreeNode<V>) -> String,
) -> String {
    fn build_tree<V>(
        tree: &TreeArena<V>,
        node_idx: Index,
        depth: usize,
        max_depth: Option<usize>,
        label: &dyn Fn(&TreeNode<V>) -> String,
        parent_tree: &mut Tree<String>,
    ) {
        if max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        if let Some(node) = tree.get_node(node_idx) {
            for &child_idx in &node.children {
                if let Some(child) = tree.get_node(child_idx) {
                    let mut child_tree = Tree::new(label(child));
                    build_tree(tree, child_idx, depth + 1, max_depth, label, &mut child_tree);
                    parent_tree.push(child_tree);
                }
            }
        }
    }

    match start.and_then(|idx| tree.get_node(idx).map(|node| (idx, node))) {
        Some((idx, node)) => {
            let mut root = Tree::new(label(node));
            build_tree(tree, idx, 0, max_depth, label, &mut root);
            root.to_string().trim_end().to_string()
        }
        None => "Empty tree".to_string(),
    }
}
