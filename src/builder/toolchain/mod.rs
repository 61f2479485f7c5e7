//! Makefile dialects.
//!
//! A `BuildConfig` is dialect agnostic. Everything that differs between the
//! GNU make + gcc output and the nmake + cl.exe output lives in one of the
//! two backends, picked by `BackendKind::select`.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::build_config::BuildConfig;

mod gcc;
mod msvc;

pub use gcc::{host_default_flags, GccBackend};
pub use msvc::{translate, translate_options, MsvcBackend, BASE_LIBRARIES};

/// Header written at the top of every generated Makefile.
pub(crate) const GENERATED_HEADER: &str = "# Generated by omake. Do not edit.\n\n";

/// The Makefile dialect to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// POSIX compiler driven by GNU make
    Posix,
    /// cl.exe driven by nmake-compatible make
    Msvc,
}

impl BackendKind {
    /// Pick the backend for a configuration.
    ///
    /// CL mode, or a compiler that looks like cl, selects MSVC.
    pub fn select(config: &BuildConfig) -> Self {
        if config.use_cl_build || is_cl_compiler(&config.compiler) {
            BackendKind::Msvc
        } else {
            BackendKind::Posix
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Posix => "posix",
            BackendKind::Msvc => "msvc",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a compiler identifier names cl.exe.
pub fn is_cl_compiler(compiler: &str) -> bool {
    compiler == "cl" || compiler.contains("cl.exe")
}

/// A Makefile dialect.
pub trait MakefileBackend {
    /// Which dialect this is.
    fn kind(&self) -> BackendKind;

    /// Object file extension, without the dot.
    fn object_extension(&self) -> &str;

    /// Render the complete Makefile for `config`.
    fn render(&self, config: &BuildConfig) -> String;
}

/// Path of a description-relative file as seen from the output directory.
///
/// Absolute paths are kept as they are.
pub(crate) fn source_path(root: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// `NAME = \` followed by one indented entry per line.
pub(crate) fn continued_list(name: &str, items: &[String]) -> String {
    let mut out = format!("{} =", name);
    for (i, item) in items.iter().enumerate() {
        out.push_str(" \\\n    ");
        out.push_str(item);
        if i + 1 == items.len() {
            out.push('\n');
        }
    }
    if items.is_empty() {
        out.push('\n');
    }
    out
}
