//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod ids;
pub mod nodes;
pub mod types;
pub mod validation;
