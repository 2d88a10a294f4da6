//! Application services
//!
//! Services contain business logic and depend on infrastructure traits.

pub mod aggregate;

pub use aggregate::{AggregateRequest, AggregationService};
