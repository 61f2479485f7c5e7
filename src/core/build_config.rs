//! The normalized build configuration.
//!
//! A `BuildConfig` is created with defaults, filled in by one pass of the
//! description parser, patched with command-line overrides and then handed
//! read-only to the Makefile generator.

use std::path::Path;

/// Default logical output name (no extension).
pub const DEFAULT_OUTPUT_NAME: &str = "a.out";

/// Default compiler.
pub const DEFAULT_COMPILER: &str = "g++";

/// Default build orchestrator.
pub const DEFAULT_MAKE_TOOL: &str = "make";

/// Compiler used in CL mode when no explicit path is given.
pub const DEFAULT_CL_COMPILER: &str = "cl.exe";

/// One compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRule {
    /// Source file, relative to the source directory
    pub source: String,
    /// Optional header the object also depends on
    pub header: Option<String>,
}

impl FileRule {
    /// Create a rule without a header dependency.
    pub fn new(source: impl Into<String>) -> Self {
        FileRule {
            source: source.into(),
            header: None,
        }
    }

    /// Add a header dependency.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Object file stem: file name of the source without directory or extension.
    pub fn object_stem(&self) -> String {
        let path = Path::new(&self.source);
        match path.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => self.source.clone(),
        }
    }

    /// Object file name with the given extension (e.g. `main.o`, `main.obj`).
    pub fn object_name(&self, extension: &str) -> String {
        format!("{}.{}", self.object_stem(), extension)
    }
}

/// Build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Logical binary name; backends add the extension
    pub output_name: String,
    /// Compiler identifier or path
    pub compiler: String,
    /// Build orchestrator to invoke
    pub make_tool: String,
    /// Raw compiler flags, in description order
    pub build_options: Vec<String>,
    /// Compilation units, in description order
    pub file_rules: Vec<FileRule>,
    /// Enable progress reporting
    pub show_stats: bool,
    /// Force the MSVC backend
    pub use_cl_build: bool,
    /// Explicit cl.exe path
    pub cl_path: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            compiler: DEFAULT_COMPILER.to_string(),
            make_tool: DEFAULT_MAKE_TOOL.to_string(),
            build_options: Vec::new(),
            file_rules: Vec::new(),
            show_stats: false,
            use_cl_build: false,
            cl_path: None,
        }
    }
}

impl BuildConfig {
    /// Number of compilation units.
    pub fn file_count(&self) -> usize {
        self.file_rules.len()
    }

    /// Apply command-line overrides.
    ///
    /// CL mode replaces the compiler with the explicit CL path, or `cl.exe`.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        self.show_stats = overrides.show_stats;
        self.use_cl_build = overrides.use_cl_build;
        self.cl_path = overrides.cl_path.clone();

        if self.use_cl_build {
            self.compiler = self
                .cl_path
                .clone()
                .unwrap_or_else(|| DEFAULT_CL_COMPILER.to_string());
        }
    }
}

/// Settings supplied by the command line, applied after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub show_stats: bool,
    pub use_cl_build: bool,
    pub cl_path: Option<String>,
}
