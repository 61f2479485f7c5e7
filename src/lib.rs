//! omake - a Makefile generator and build driver for small C++ projects
//!
//! This crate reads a line-oriented build description, renders a Makefile
//! for GNU make or NMAKE and runs the build tool while tracking its
//! progress markers.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

pub use core::{BuildConfig, FileRule, OmakeError, Overrides};
pub use util::shell::Shell;
