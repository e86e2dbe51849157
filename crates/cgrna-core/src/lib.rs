//! # cgrna Core Library
//!
//! Coarse-grained three-dimensional models of RNA: each secondary-structure
//! element of a molecule is reduced to a line segment, and stems additionally
//! carry twist vectors that fix the orientation of their base pairs.
//!
//! ## Architectural Philosophy
//!
//! The library keeps three layers with a strict dependency direction.
//!
//! - **[`core`]: The Foundation.** Stateless data: atomic structures read from
//!   PDB and mmCIF files, the secondary-structure graph (`BulgeGraph`) and its
//!   pair tables, and pure geometry helpers.
//!
//! - **[`engine`]: The Model.** The stateful `CoarseGrainRna`, which attaches
//!   element geometry to a graph, derives virtual residues and atoms from it,
//!   computes angle, stem, and loop statistics, and reads and writes the
//!   line-oriented `.cg` text format.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures that combine the
//!   two, such as building models from an all-atom structure file.

pub mod core;
pub mod engine;
pub mod workflows;
