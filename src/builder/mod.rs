//! Makefile generation and build execution.
//!
//! This module renders Makefiles for the supported toolchains and drives
//! the external build tool.

pub mod events;
pub mod executor;
pub mod makefile;
pub mod progress;
pub mod toolchain;

pub use events::BuildEvent;
pub use executor::{BuildExecutor, BuildOutcome, BuildState};
pub use makefile::{GeneratedMakefile, MakefileGenerator};
pub use progress::{extract, BuildStats, ProgressCount};
pub use toolchain::{BackendKind, GccBackend, MakefileBackend, MsvcBackend};
