//! # Core Module
//!
//! The stateless foundation of the library: everything needed to describe an
//! RNA molecule before any coarse-grained geometry is attached to it.
//!
//! ## Overview
//!
//! The core module holds the two substrates the coarse-grained model is built
//! on, the atomic structure read from a coordinate file and the
//! secondary-structure graph derived from its base pairs, plus the file
//! readers and geometric utilities shared by the higher layers.
//!
//! ## Architecture
//!
//! - **Atomic Representation** ([`models`]) - Atoms, nucleotides, and chains with author numbering
//! - **Secondary Structure** ([`graph`]) - Pair tables, element typing, and graph queries
//! - **File I/O** ([`io`]) - PDB and mmCIF readers and writers
//! - **Utilities** ([`utils`]) - Superposition, spherical coordinates, segment distances, and residue tables
//!
//! ## Key Capabilities
//!
//! - **Multi-strand graphs** with backbone breaks as hard element boundaries
//! - **Pseudoknot removal** and length-one stem dissolution on pair tables
//! - **Verbatim author identifiers** including insertion codes and numeric chain names

pub mod graph;
pub mod io;
pub mod models;
pub mod utils;
