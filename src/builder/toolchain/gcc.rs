//! GNU make + gcc/clang Makefile backend.

use std::path::{Path, PathBuf};

use crate::core::build_config::BuildConfig;

use super::{continued_list, BackendKind, MakefileBackend, GENERATED_HEADER};

/// POSIX Makefile backend.
#[derive(Debug, Clone)]
pub struct GccBackend {
    /// Absolute source directory; sources are referenced relative to it
    pub source_root: PathBuf,
    /// Flags placed before the configured options
    pub default_flags: Vec<String>,
}

impl GccBackend {
    /// Create a backend for sources under `source_root`.
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        GccBackend {
            source_root: source_root.into(),
            default_flags: Vec::new(),
        }
    }

    /// Prepend host default flags (see [`host_default_flags`]).
    pub fn with_default_flags(mut self, flags: Vec<String>) -> Self {
        self.default_flags = flags;
        self
    }

    /// Reference to a source-relative file inside the Makefile.
    fn source_ref(&self, file: &str) -> String {
        if Path::new(file).is_absolute() {
            file.to_string()
        } else {
            format!("$(SOURCE_DIR){}", file)
        }
    }

    fn root_display(&self) -> String {
        let root = self.source_root.display().to_string();
        root.trim_end_matches(['/', '\\']).to_string()
    }
}

/// Flags a host OS wants in front of user options.
///
/// Static runtime on Linux, an explicit target on macOS, no console window on
/// Windows.
pub fn host_default_flags() -> Vec<String> {
    if cfg!(target_os = "linux") {
        vec!["-static-libgcc".to_string(), "-static-libstdc++".to_string()]
    } else if cfg!(target_os = "macos") {
        let arch = match std::env::consts::ARCH {
            "aarch64" => "arm64",
            other => other,
        };
        vec![format!("--target={}-apple-macos", arch)]
    } else if cfg!(windows) {
        vec!["-mwindows".to_string()]
    } else {
        Vec::new()
    }
}

impl MakefileBackend for GccBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Posix
    }

    fn object_extension(&self) -> &str {
        "o"
    }

    fn render(&self, config: &BuildConfig) -> String {
        let ext = self.object_extension();
        let mut out = String::from(GENERATED_HEADER);

        if config.show_stats {
            out.push_str("# Progress reporting\n");
            out.push_str("PROGRESS := 0\n");
            out.push_str(&format!("TOTAL := {}\n\n", config.file_count()));
        }

        out.push_str(&format!("CC = {}\n\n", config.compiler));

        let flags: Vec<&str> = self
            .default_flags
            .iter()
            .chain(config.build_options.iter())
            .map(String::as_str)
            .collect();
        out.push_str(&format!("CFLAGS = {}\n\n", flags.join(" ")));

        let sources: Vec<String> = config.file_rules.iter().map(|r| r.source.clone()).collect();
        out.push_str("# Source files\n");
        out.push_str(&continued_list("SRCS", &sources));
        out.push('\n');

        let objects: Vec<String> = config.file_rules.iter().map(|r| r.object_name(ext)).collect();
        out.push_str("# Object files\n");
        out.push_str(&format!("OBJS = {}\n\n", objects.join(" ")));

        let root = self.root_display();
        out.push_str("# Platform configuration\n");
        out.push_str("ifeq ($(OS),Windows_NT)\n");
        out.push_str(&format!("    TARGET := {}.exe\n", config.output_name));
        out.push_str("    RM := del /Q\n");
        out.push_str(&format!("    SOURCE_DIR := {}\\\\\n", root));
        out.push_str("else\n");
        out.push_str(&format!("    TARGET := {}\n", config.output_name));
        out.push_str("    RM := rm -f\n");
        out.push_str(&format!("    SOURCE_DIR := {}/\n", root));
        out.push_str("endif\n\n");

        out.push_str("all: $(TARGET)\n\n");
        out.push_str("$(TARGET): $(OBJS)\n");
        if config.show_stats {
            // Linking repeats the last count; incrementing here would read [N+1/N].
            out.push_str("\t@echo '[$(PROGRESS)/$(TOTAL)] Linking $@'\n");
        }
        out.push_str("\t$(CC) $(CFLAGS) -o $@ $^\n\n");

        for (rule, object) in config.file_rules.iter().zip(&objects) {
            let source = self.source_ref(&rule.source);
            out.push_str(&format!("{}: {}", object, source));
            if let Some(header) = &rule.header {
                out.push_str(&format!(" {}", self.source_ref(header)));
            }
            out.push('\n');
            if config.show_stats {
                out.push_str("\t@$(eval PROGRESS := $(shell echo $$(($(PROGRESS)+1))))\n");
                out.push_str("\t@echo '[$(PROGRESS)/$(TOTAL)] Building $@'\n");
            }
            out.push_str(&format!("\t$(CC) $(CFLAGS) -c -o $@ {}\n\n", source));
        }

        out.push_str("clean:\n");
        out.push_str("\t$(RM) $(TARGET) $(OBJS)\n\n");
        out.push_str(".PHONY: all clean\n");

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::build_config::FileRule;

    fn sample_config() -> BuildConfig {
        BuildConfig {
            output_name: "prog".to_string(),
            build_options: vec!["-O2".to_string(), "-Wall".to_string()],
            file_rules: vec![
                FileRule::new("a.cpp"),
                FileRule::new("src/b.cpp").with_header("include/b.h"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_structure() {
        let backend = GccBackend::new("/work/proj");
        let makefile = backend.render(&sample_config());

        assert!(makefile.contains("CC = g++\n"));
        assert!(makefile.contains("CFLAGS = -O2 -Wall\n"));
        assert!(makefile.contains("SRCS = \\\n    a.cpp \\\n    src/b.cpp\n"));
        assert!(makefile.contains("OBJS = a.o b.o\n"));
        assert!(makefile.contains("    TARGET := prog.exe\n"));
        assert!(makefile.contains("    TARGET := prog\n"));
        assert!(makefile.contains("    SOURCE_DIR := /work/proj/\n"));
        assert!(makefile.contains("all: $(TARGET)"));
        assert!(makefile.contains("$(TARGET): $(OBJS)\n\t$(CC) $(CFLAGS) -o $@ $^\n"));
        assert!(makefile.contains("a.o: $(SOURCE_DIR)a.cpp\n"));
        assert!(makefile.contains("b.o: $(SOURCE_DIR)src/b.cpp $(SOURCE_DIR)include/b.h\n"));
        assert!(makefile.contains("\t$(CC) $(CFLAGS) -c -o $@ $(SOURCE_DIR)src/b.cpp\n"));
        assert!(makefile.contains("clean:\n\t$(RM) $(TARGET) $(OBJS)\n"));
        assert!(makefile.ends_with(".PHONY: all clean\n"));
    }

    #[test]
    fn test_no_progress_without_stats() {
        let makefile = GccBackend::new("/work/proj").render(&sample_config());
        assert!(!makefile.contains("PROGRESS"));
        assert!(!makefile.contains("TOTAL"));
        assert!(!makefile.contains('['));
        assert!(!makefile.contains("echo"));
    }

    #[test]
    fn test_progress_with_stats() {
        let mut config = sample_config();
        config.show_stats = true;
        let makefile = GccBackend::new("/work/proj").render(&config);

        assert!(makefile.contains("PROGRESS := 0\n"));
        assert!(makefile.contains("TOTAL := 2\n"));
        assert_eq!(makefile.matches("Building $@").count(), 2);
        assert_eq!(makefile.matches("$(shell echo $$(($(PROGRESS)+1)))").count(), 2);
        assert!(makefile.contains("\t@echo '[$(PROGRESS)/$(TOTAL)] Linking $@'\n"));

        // Marker precedes the link command.
        let marker = makefile.find("Linking $@").unwrap();
        let link = makefile.find("-o $@ $^").unwrap();
        assert!(marker < link);
    }

    #[test]
    fn test_default_flags_prepended() {
        let backend = GccBackend::new("/work/proj").with_default_flags(vec!["-static".to_string()]);
        let makefile = backend.render(&sample_config());
        assert!(makefile.contains("CFLAGS = -static -O2 -Wall\n"));
    }

    #[test]
    fn test_trailing_separator_not_doubled() {
        let makefile = GccBackend::new("/work/proj/").render(&sample_config());
        assert!(makefile.contains("    SOURCE_DIR := /work/proj/\n"));
    }

    #[test]
    fn test_host_default_flags_is_stable() {
        assert_eq!(host_default_flags(), host_default_flags());
    }
}
