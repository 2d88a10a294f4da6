//! Domain layer: tree construction and the roll-up engine
//!
//! This layer is independent of external concerns (no file access, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod engine;
pub mod error;
pub mod record;
pub mod traversal;

pub use arena::{TreeArena, TreeNode};
pub use builder::{ReparentPolicy, TreeBuilder};
pub use engine::{Aggregator, FnRollUp, LeafValues, NodeView, RollUp};
pub use error::{EngineError, TreeError, TreeResult};
pub use record::{ParentRef, Record, DEFAULT_SENTINEL};
pub use traversal::{Visit, Walk};
