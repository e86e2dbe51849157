//! Stateless helpers: vector geometry and static identifier tables.

pub mod geometry;
pub mod identifiers;
