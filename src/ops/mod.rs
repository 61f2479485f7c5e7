//! High-level operations.

pub mod omake_build;

pub use omake_build::{build, build_with_config, BuildOptions, BuildResult};
