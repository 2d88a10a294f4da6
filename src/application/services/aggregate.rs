//! Aggregation service
//!
//! Reads a tree file and a leaf values file, rolls the values up and renders the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::error_ext::IoResultExt;
use crate::application::numeric::{LeafTable, NumericRollUp, Reducer};
use crate::application::render::{render, render_structure, RenderOptions, RenderStyle};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::{Aggregator, TreeArena};
use crate::infrastructure::traits::FileSystem;

/// Inputs of one aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRequest {
    /// Adjacency file, one `parent,child...` record per line
    pub tree: PathBuf,
    /// Leaf values file, one `name,value` per line
    pub values: PathBuf,
    /// Overrides the configured reducer
    pub reducer: Option<Reducer>,
    /// Overrides the configured default leaf value
    pub default_leaf_value: Option<f64>,
}

impl AggregateRequest {
    pub fn new(tree: impl Into<PathBuf>, values: impl Into<PathBuf>) -> Self {
        Self {
            tree: tree.into(),
            values: values.into(),
            reducer: None,
            default_leaf_value: None,
        }
    }
}

/// Service for building and aggregating trees.
pub struct AggregationService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl AggregationService {
    /// Create a new aggregation service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Parse the adjacency file at `path` into a tree.
    #[instrument(level = "debug", skip(self))]
    pub fn load_tree<V>(&self, path: &Path) -> ApplicationResult<TreeArena<V>> {
        let content = self.fs.read_to_string(path).with_path_context("read tree", path)?;
        let tree = self.settings.tree_builder().build_from_str(&content)?;
        debug!("loaded tree from {}: {} nodes", path.display(), tree.len());
        Ok(tree)
    }

    /// Parse the leaf values file at `path`.
    #[instrument(level = "debug", skip(self))]
    pub fn load_leaf_table(&self, path: &Path) -> ApplicationResult<LeafTable> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read leaf values", path)?;
        Ok(LeafTable::parse(&content)?)
    }

    /// Build the tree, value its leaves and roll up to the root.
    #[instrument(level = "debug", skip(self))]
    pub fn aggregate(&self, request: &AggregateRequest) -> ApplicationResult<TreeArena<f64>> {
        let tree = self.load_tree(&request.tree)?;
        let table = self.load_leaf_table(&request.values)?;
        let reducer = request.reducer.unwrap_or(self.settings.reducer);
        let default = request.default_leaf_value.or(self.settings.default_leaf_value);

        let rollup = NumericRollUp::new(table, reducer).with_default(default);
        let tree = Aggregator::new(tree, rollup).run()?;
        info!(
            "aggregated {} nodes with {} from {}",
            tree.len(),
            reducer,
            request.tree.display()
        );
        Ok(tree)
    }

    /// Render options from settings for `style` (configured style when None).
    pub fn render_options(&self, style: Option<RenderStyle>) -> RenderOptions {
        let style = style.unwrap_or(self.settings.render.style);
        self.settings.render.options_for(style)
    }

    /// Render an aggregated tree.
    pub fn report(&self, tree: &TreeArena<f64>, options: &RenderOptions) -> ApplicationResult<String> {
        Ok(render(tree, options)?)
    }

    /// Leaf names of the tree file, in order of first mention.
    pub fn leaves(&self, tree_path: &Path) -> ApplicationResult<Vec<String>> {
        let tree: TreeArena<()> = self.load_tree(tree_path)?;
        Ok(tree.leaf_nodes().into_iter().map(str::to_string).collect())
    }

    /// Tree diagram of the tree file without values.
    pub fn structure(
        &self,
        tree_path: &Path,
        focus: Option<&str>,
        max_depth: Option<usize>,
    ) -> ApplicationResult<String> {
        let tree: TreeArena<()> = self.load_tree(tree_path)?;
        Ok(render_structure(&tree, focus, max_depth)?)
    }
}
