//! Typed records shared across layers.

pub mod audit;
pub mod sync;
