//! Common utility functions
//!
//! - **[`batch`]**: fixed-size grouping for bounding request fan-out

pub mod batch;

pub use batch::{batched, BatchError, Batched};
