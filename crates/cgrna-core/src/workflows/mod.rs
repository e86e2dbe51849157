//! # Workflows Module
//!
//! High-level entry points that run a complete procedure on behalf of the
//! caller.
//!
//! ## Architecture
//!
//! - **Build Workflow** ([`build`]) - All-atom structure file to coarse-grained
//!   models: chain selection, backbone break detection, base-pair annotation,
//!   pseudoknot removal, molecule splitting, and geometry fitting.
//!
//! ## Key Capabilities
//!
//! - **One model per molecule** when a file holds several independent assemblies
//! - **Pluggable annotation** through the configured tool or caller-supplied pairs
//! - **Progress reporting** through [`crate::engine::progress::ProgressReporter`]

pub mod build;
