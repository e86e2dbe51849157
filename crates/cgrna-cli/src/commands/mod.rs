pub mod build;
pub mod stats;
