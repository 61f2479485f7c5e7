//! nmake + cl.exe Makefile backend, and gcc-to-cl flag translation.

use std::path::PathBuf;

use crate::core::build_config::{BuildConfig, DEFAULT_CL_COMPILER};

use super::{
    continued_list, is_cl_compiler, source_path, BackendKind, MakefileBackend, GENERATED_HEADER,
};

/// Libraries every translated flag list links against.
pub const BASE_LIBRARIES: [&str; 3] = ["kernel32.lib", "user32.lib", "gdi32.lib"];

/// Exact gcc flag -> cl flag. An empty value drops the flag.
const FLAG_TABLE: &[(&str, &str)] = &[
    ("-Wall", "/W3"),
    ("-Wextra", "/W4"),
    ("-Werror", "/WX"),
    ("-O0", "/Od"),
    ("-O1", "/O1"),
    ("-O2", "/O2"),
    ("-O3", "/Ox"),
    ("-g", "/Zi"),
    ("-std=c++11", "/std:c++11"),
    ("-std=c++14", "/std:c++14"),
    ("-std=c++17", "/std:c++17"),
    ("-std=c++20", "/std:c++20"),
    ("-std=c++23", "/std:c++latest"),
    ("-fPIC", ""),
    ("-shared", "/LD"),
    ("-I", "/I"),
    ("-D", "/D"),
    ("-l", ""),
];

/// Translate one gcc-style flag to its cl equivalent.
///
/// An empty result means the flag has no cl counterpart and is dropped.
/// Unknown flags are returned unchanged.
pub fn translate(flag: &str) -> String {
    if let Some((_, to)) = FLAG_TABLE.iter().find(|(from, _)| *from == flag) {
        return to.to_string();
    }

    if let Some(path) = flag.strip_prefix("-I") {
        return format!("/I{}", path);
    }
    if let Some(name) = flag.strip_prefix("-D") {
        return format!("/D{}", name);
    }
    if let Some(lib) = flag.strip_prefix("-l") {
        return format!("{}.lib", lib);
    }

    flag.to_string()
}

/// Translate a flag list, drop removed flags and append [`BASE_LIBRARIES`].
pub fn translate_options(options: &[String]) -> Vec<String> {
    options
        .iter()
        .map(|opt| translate(opt))
        .filter(|opt| !opt.is_empty())
        .chain(BASE_LIBRARIES.iter().map(|lib| lib.to_string()))
        .collect()
}

/// MSVC Makefile backend.
#[derive(Debug, Clone)]
pub struct MsvcBackend {
    /// Absolute source directory
    pub source_root: PathBuf,
}

impl MsvcBackend {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        MsvcBackend {
            source_root: source_root.into(),
        }
    }

    /// The compiler invocation: explicit CL path, then a cl-like compiler, then `cl.exe`.
    fn compiler(config: &BuildConfig) -> String {
        match &config.cl_path {
            Some(path) => path.clone(),
            None if is_cl_compiler(&config.compiler) => config.compiler.clone(),
            None => DEFAULT_CL_COMPILER.to_string(),
        }
    }

    /// Flags are translated only when CL mode was requested.
    fn flags(config: &BuildConfig) -> Vec<String> {
        if config.use_cl_build {
            translate_options(&config.build_options)
        } else {
            config.build_options.clone()
        }
    }

    /// Output name, with `.exe` unless it already ends in `.exe`, `.dll` or `.lib`.
    fn target(config: &BuildConfig) -> String {
        let name = &config.output_name;
        let has_ext = [".exe", ".dll", ".lib"]
            .iter()
            .any(|ext| name.to_ascii_lowercase().ends_with(ext));
        if has_ext {
            name.clone()
        } else {
            format!("{}.exe", name)
        }
    }

    fn source_ref(&self, file: &str) -> String {
        source_path(&self.source_root, file).display().to_string()
    }
}

impl MakefileBackend for MsvcBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Msvc
    }

    fn object_extension(&self) -> &str {
        "obj"
    }

    fn render(&self, config: &BuildConfig) -> String {
        let ext = self.object_extension();
        let mut out = String::from(GENERATED_HEADER);

        out.push_str(&format!("CC = {}\n\n", Self::compiler(config)));
        out.push_str(&format!("CFLAGS = {}\n\n", Self::flags(config).join(" ")));

        let sources: Vec<String> = config.file_rules.iter().map(|r| r.source.clone()).collect();
        out.push_str("# Source files\n");
        out.push_str(&continued_list("SRCS", &sources));
        out.push('\n');

        let objects: Vec<String> = config.file_rules.iter().map(|r| r.object_name(ext)).collect();
        out.push_str("# Object files\n");
        out.push_str(&format!("OBJS = {}\n\n", objects.join(" ")));

        out.push_str(&format!("TARGET = {}\n\n", Self::target(config)));

        out.push_str("all: $(TARGET)\n\n");
        out.push_str("$(TARGET): $(OBJS)\n");
        out.push_str("\t$(CC) $(CFLAGS) /Fe:$@ $(OBJS)\n\n");

        for (rule, object) in config.file_rules.iter().zip(&objects) {
            let source = self.source_ref(&rule.source);
            out.push_str(&format!("{}: {}", object, source));
            if let Some(header) = &rule.header {
                out.push_str(&format!(" {}", self.source_ref(header)));
            }
            out.push('\n');
            out.push_str(&format!("\t$(CC) $(CFLAGS) /c /Fo$@ {}\n\n", source));
        }

        out.push_str("clean:\n");
        out.push_str("\t-del /Q $(TARGET) $(OBJS) *.ilk *.pdb *.exp 2>nul\n\n");
        out.push_str(".PHONY: all clean\n");

        out
    }
}
