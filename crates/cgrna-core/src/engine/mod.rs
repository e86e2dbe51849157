//! # Engine Module
//!
//! The coarse-grained model and everything computed from it.
//!
//! ## Overview
//!
//! A [`model::CoarseGrainRna`] pairs a secondary-structure graph with
//! per-element geometry: a segment for every element and twist vectors for
//! every stem. Geometry lives in generation-stamped stores so that derived
//! data, the virtual atoms in particular, is recomputed only after the
//! geometry it was derived from has changed.
//!
//! ## Architecture
//!
//! - **Model** ([`model`], [`store`], [`cache`]) - Element geometry, long-range contacts, and the virtual-atom cache
//! - **Virtual Residues** ([`virtual_atoms`]) - Ideal-helix positions of residues and backbone atoms
//! - **Rigid Motions** ([`transform`]) - Rotation, translation, flat arrays, and the direction representation
//! - **Statistics** ([`stats`], [`similarity`]) - Inter-stem angles, stem and loop statistics, radius of gyration, RMSD
//! - **Persistence** ([`serialize`]) - The `.cg` text format
//! - **Annotation** ([`annotation`]) - Base-pair detection with MC-Annotate or from geometry
//! - **Configuration** ([`config`]) - Build options, TOML loading, and the builder
//! - **Progress Monitoring** ([`progress`]) - Event callbacks for long-running builds
//! - **Error Handling** ([`error`]) - Model-level errors
//!
//! ## Key Capabilities
//!
//! - **Lazy virtual atoms** invalidated by generation stamps rather than by hand
//! - **Build-order traversal** of the stem graph and its inverse direction encoding
//! - **Lossless `.cg` round trips** including multi-chain sequence identifiers

pub mod annotation;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod progress;
pub mod serialize;
pub mod similarity;
pub mod stats;
pub mod store;
pub mod transform;
pub mod virtual_atoms;
