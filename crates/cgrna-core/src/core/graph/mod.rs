//! Secondary-structure graph of an RNA molecule.
//!
//! A [`bulge_graph::BulgeGraph`] partitions the residues of a folded molecule
//! into typed elements (stems, hairpins, interior loops, multiloop segments,
//! and 5'/3' tails) derived from a [`pairs::PairTable`] and the backbone
//! breaks of a multi-stranded assembly. Geometry is never stored here; the
//! coarse-grained model in [`crate::engine`] attaches it by element id.

pub mod bulge_graph;
pub mod element;
pub mod error;
pub mod pairs;
pub mod sequence;
