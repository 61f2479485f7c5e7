//! Core data structures for omake.
//!
//! - The build configuration produced by reading a description
//! - The description parser
//! - Error types

pub mod build_config;
pub mod errors;
pub mod parser;

pub use build_config::{BuildConfig, FileRule, Overrides};
pub use errors::OmakeError;
pub use parser::{parse, parse_file, Directive};
