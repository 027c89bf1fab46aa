//! Matching module: scoring, candidate generation, allocation, lifecycle,
//! and the tenant-scoped reconciliation engine

pub mod allocator;
pub mod candidates;
pub mod engine;
pub mod lifecycle;
pub mod scoring;

pub use allocator::*;
pub use candidates::*;
pub use engine::*;
pub use lifecycle::*;
pub use scoring::*;
