//! Makefile generation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::builder::toolchain::{
    host_default_flags, BackendKind, GccBackend, MakefileBackend, MsvcBackend,
};
use crate::core::build_config::BuildConfig;
use crate::core::errors::OmakeError;

/// File name of the generated build script.
pub const MAKEFILE_NAME: &str = "Makefile";

/// Writes a Makefile for a `BuildConfig`.
#[derive(Debug, Clone)]
pub struct MakefileGenerator {
    source_root: PathBuf,
    platform_flags: bool,
}

/// A generated Makefile on disk.
#[derive(Debug, Clone)]
pub struct GeneratedMakefile {
    pub path: PathBuf,
    pub backend: BackendKind,
    /// Problems worth showing the user; the file was still written
    pub warnings: Vec<String>,
}

impl MakefileGenerator {
    /// Create a generator for sources under `source_root`.
    ///
    /// The root is made absolute so the Makefile can live anywhere.
    pub fn new(source_root: impl AsRef<Path>) -> Result<Self, OmakeError> {
        let root = source_root.as_ref();
        let source_root = std::path::absolute(root)
            .map_err(|e| OmakeError::io("resolve source directory", root, e))?;
        Ok(MakefileGenerator {
            source_root,
            platform_flags: false,
        })
    }

    /// Prepend host default flags on the POSIX backend.
    pub fn platform_flags(mut self, enabled: bool) -> Self {
        self.platform_flags = enabled;
        self
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Render the Makefile text for `config` without touching the filesystem.
    pub fn render(&self, config: &BuildConfig) -> (BackendKind, String) {
        let kind = BackendKind::select(config);
        tracing::debug!("selected {} backend for compiler `{}`", kind, config.compiler);

        let text = match kind {
            BackendKind::Posix => {
                let mut backend = GccBackend::new(&self.source_root);
                if self.platform_flags {
                    backend = backend.with_default_flags(host_default_flags());
                }
                backend.render(config)
            }
            BackendKind::Msvc => MsvcBackend::new(&self.source_root).render(config),
        };
        (kind, text)
    }

    /// Write `Makefile` into `output_dir`, creating the directory if needed.
    pub fn generate(
        &self,
        config: &BuildConfig,
        output_dir: &Path,
    ) -> Result<GeneratedMakefile, OmakeError> {
        std::fs::create_dir_all(output_dir)
            .map_err(|e| OmakeError::io("create output directory", output_dir, e))?;

        let (backend, text) = self.render(config);
        let path = output_dir.join(MAKEFILE_NAME);
        std::fs::write(&path, text).map_err(|e| OmakeError::io("write", &path, e))?;

        tracing::info!("wrote {} ({} backend)", path.display(), backend);
        Ok(GeneratedMakefile {
            path,
            backend,
            warnings: object_name_clashes(config, backend),
        })
    }
}

/// Describe every source whose object file another source already produces.
fn object_name_clashes(config: &BuildConfig, backend: BackendKind) -> Vec<String> {
    let ext = match backend {
        BackendKind::Posix => "o",
        BackendKind::Msvc => "obj",
    };
    let mut seen = HashSet::new();
    let mut clashes = Vec::new();
    for rule in &config.file_rules {
        let object = rule.object_name(ext);
        if !seen.insert(object.clone()) {
            tracing::debug!("object name clash on `{}`", object);
            clashes.push(format!(
                "`{}` compiles to `{}`, which another source already produces",
                rule.source, object
            ));
        }
    }
    clashes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser;
    use tempfile::TempDir;

    const SCENARIO: &str = r#"
filebuild "a.cpp"
filebuild "b.cpp", "b.h"
buildfile "prog"
building "-O2"
"#;

    #[test]
    fn test_generate_creates_output_dir() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out").join("nested");
        let config = parser::parse(SCENARIO).unwrap();

        let generated = MakefileGenerator::new(tmp.path())
            .unwrap()
            .generate(&config, &out)
            .unwrap();

        assert_eq!(generated.backend, BackendKind::Posix);
        assert_eq!(generated.path, out.join("Makefile"));
        let text = std::fs::read_to_string(&generated.path).unwrap();
        assert!(text.contains("OBJS = a.o b.o\n"));
        assert!(text.contains("CFLAGS = -O2\n"));
    }

    #[test]
    fn test_scenario_msvc_forced() {
        let tmp = TempDir::new().unwrap();
        let mut config = parser::parse(SCENARIO).unwrap();
        config.use_cl_build = true;

        let (kind, text) = MakefileGenerator::new(tmp.path()).unwrap().render(&config);
        assert_eq!(kind, BackendKind::Msvc);
        assert!(text.contains("OBJS = a.obj b.obj\n"));
        assert!(text.contains("CFLAGS = /O2 kernel32.lib user32.lib gdi32.lib\n"));
    }

    #[test]
    fn test_posix_without_stats_has_no_markers() {
        let tmp = TempDir::new().unwrap();
        let config = parser::parse(SCENARIO).unwrap();
        let (_, text) = MakefileGenerator::new(tmp.path()).unwrap().render(&config);
        assert!(!text.contains("PROGRESS"));
        assert!(!text.contains("/$(TOTAL)]"));
    }

    #[test]
    fn test_object_name_clashes_reported() {
        let tmp = TempDir::new().unwrap();
        let config = parser::parse("filebuild \"src/util.cpp\"\nfilebuild \"lib/util.cpp\"\n").unwrap();

        let generated = MakefileGenerator::new(tmp.path())
            .unwrap()
            .generate(&config, &tmp.path().join("out"))
            .unwrap();
        assert_eq!(generated.warnings.len(), 1);
        assert!(generated.warnings[0].contains("`lib/util.cpp` compiles to `util.o`"));

        let clean = parser::parse(SCENARIO).unwrap();
        assert!(object_name_clashes(&clean, BackendKind::Msvc).is_empty());
    }

    #[test]
    fn test_source_root_is_absolute() {
        let generator = MakefileGenerator::new(".").unwrap();
        assert!(generator.source_root().is_absolute());
    }

    #[test]
    fn test_generate_fails_when_output_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("out");
        std::fs::write(&blocker, "not a directory").unwrap();
        let config = parser::parse(SCENARIO).unwrap();

        let err = MakefileGenerator::new(tmp.path())
            .unwrap()
            .generate(&config, &blocker)
            .unwrap_err();
        assert!(matches!(err, OmakeError::Io { .. }));
    }
}
