//! Application layer: the numeric specialization, rendering and services
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod numeric;
pub mod render;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use numeric::{LeafTable, NumericError, NumericRollUp, Reducer};
pub use render::{render, render_structure, RenderOptions, RenderStyle, RenderValue};
