//! Idempotent bulk import of bank transactions

pub mod guard;
pub mod hash;

pub use guard::*;
pub use hash::*;
