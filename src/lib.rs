//! Generic tree roll-up: build a tree from `parent,child...` records, value its
//! leaves and aggregate each parent from its children up to the root.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use domain::{
    Aggregator, EngineError, FnRollUp, LeafValues, NodeView, ReparentPolicy, RollUp, TreeArena,
    TreeBuilder, TreeError, TreeResult,
};
