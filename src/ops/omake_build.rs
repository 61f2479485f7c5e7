//! Implementation of a full omake run.
//!
//! Reads the build description, generates the Makefile and hands it to the
//! build tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::events::BuildEvent;
use crate::builder::executor::{BuildExecutor, BuildOutcome};
use crate::builder::makefile::{GeneratedMakefile, MakefileGenerator};
use crate::core::build_config::{BuildConfig, Overrides};
use crate::core::errors::OmakeError;
use crate::core::parser;
use crate::util::config::{global_config_path, load_config, project_config_path, Config};
use crate::util::process::{find_executable, ProcessBuilder};
use crate::util::shell::{Shell, Status};

/// Flags that make GNU make rebuild everything and keep each target's
/// output together, so progress markers arrive in order.
pub const STATS_FLAGS: [&str; 3] = ["--always-make", "--output-sync=target", "--no-print-directory"];

/// Options for a run.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Directory holding the build description and sources
    pub source_dir: PathBuf,
    /// Output directory; relative paths are taken from the source directory
    pub output_dir: Option<PathBuf>,
    /// Build description file name
    pub description: Option<String>,
    /// Command-line overrides applied to the parsed configuration
    pub overrides: Overrides,
    /// Stop after writing the Makefile
    pub generate_only: bool,
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub config: BuildConfig,
    pub makefile: GeneratedMakefile,
    /// `None` when only the Makefile was generated
    pub outcome: Option<BuildOutcome>,
}

/// Run omake with configuration files from their usual locations.
pub fn build(shell: &Arc<Shell>, opts: &BuildOptions) -> Result<BuildResult, OmakeError> {
    let global = global_config_path();
    let settings = load_config(global.as_deref(), &project_config_path(&opts.source_dir));
    build_with_config(shell, opts, &settings)
}

/// Run omake with explicit settings.
pub fn build_with_config(
    shell: &Arc<Shell>,
    opts: &BuildOptions,
    settings: &Config,
) -> Result<BuildResult, OmakeError> {
    let description = opts
        .description
        .as_deref()
        .unwrap_or_else(|| settings.description_file());
    let description_path = opts.source_dir.join(description);

    let output_dir = opts.output_dir.clone().unwrap_or_else(|| settings.output_dir());
    let output_dir = if output_dir.is_absolute() {
        output_dir
    } else {
        opts.source_dir.join(output_dir)
    };

    // CL mode must be known before parsing so `buildcode` can be ignored.
    let mut base = BuildConfig::default();
    if let Some(tool) = &settings.build.make_tool {
        base.make_tool = tool.clone();
    }
    base.apply_overrides(&opts.overrides);

    shell.status(Status::Parsing, description_path.display());
    let config = parser::parse_file(&description_path, base)?;
    tracing::debug!(
        "{} source file(s), output `{}`, compiler `{}`",
        config.file_count(),
        config.output_name,
        config.compiler
    );

    let generator =
        MakefileGenerator::new(&opts.source_dir)?.platform_flags(settings.build.platform_flags);
    let makefile = generator.generate(&config, &output_dir)?;
    shell.status(
        Status::Generated,
        format!("{} ({})", makefile.path.display(), makefile.backend),
    );
    for warning in &makefile.warnings {
        shell.warn(warning);
    }
    let event = BuildEvent::MakefileGenerated {
        path: makefile.path.clone(),
        backend: makefile.backend.to_string(),
    };
    shell.json_event(&event.to_value());

    if opts.generate_only {
        return Ok(BuildResult {
            config,
            makefile,
            outcome: None,
        });
    }

    let cmd = make_command(&config, &output_dir)?;
    let mut executor = BuildExecutor::new(Arc::clone(shell))
        .poll_interval(settings.poll_interval())
        .bar_width(settings.bar_width());

    let outcome = if config.show_stats {
        executor.run_with_progress(&cmd, config.file_count())?
    } else {
        executor.run(&cmd, config.file_count())?
    };

    if !outcome.success() {
        return Err(OmakeError::ToolFailed {
            command: cmd.display_command(),
            code: outcome.exit_code,
        });
    }

    Ok(BuildResult {
        config,
        makefile,
        outcome: Some(outcome),
    })
}

/// Command line for building the Makefile in `output_dir`.
pub fn make_command(config: &BuildConfig, output_dir: &Path) -> Result<ProcessBuilder, OmakeError> {
    let tool = resolve_make_tool(&config.make_tool);
    let output_dir = std::path::absolute(output_dir)
        .map_err(|e| OmakeError::io("resolve output directory", output_dir, e))?;

    let cmd = if is_nmake(&tool) {
        let cmd = ProcessBuilder::new(&tool).arg("/NOLOGO").cwd(&output_dir);
        if config.show_stats {
            cmd.arg("/A")
        } else {
            cmd
        }
    } else {
        let cmd = ProcessBuilder::new(&tool).arg("-C").arg(&output_dir);
        if config.show_stats {
            cmd.args(STATS_FLAGS)
        } else {
            cmd
        }
    };
    Ok(cmd)
}

/// On Windows a bare `make` usually means MinGW's `mingw32-make`.
fn resolve_make_tool(tool: &str) -> String {
    if cfg!(windows) && tool == "make" && find_executable("mingw32-make").is_some() {
        tracing::debug!("using mingw32-make for `make`");
        return "mingw32-make".to_string();
    }
    tool.to_string()
}

fn is_nmake(tool: &str) -> bool {
    Path::new(tool)
        .file_stem()
        .map(|stem| stem.to_string_lossy().eq_ignore_ascii_case("nmake"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::shell::{ColorChoice, ShellMode, Verbosity};
    use tempfile::TempDir;

    fn quiet_shell() -> Arc<Shell> {
        Arc::new(Shell::new(ShellMode::Human {
            verbosity: Verbosity::Quiet,
            color: ColorChoice::Never,
        }))
    }

    fn project(description: &str) -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("omakefile.txt"), description).unwrap();
        tmp
    }

    #[test]
    fn test_make_command_gnu() {
        let config = BuildConfig::default();
        let cmd = make_command(&config, Path::new("/tmp/out")).unwrap();
        assert_eq!(cmd.get_args()[0], "-C");
        assert_eq!(cmd.get_args().len(), 2);
        assert!(Path::new(&cmd.get_args()[1]).is_absolute());
    }

    #[test]
    fn test_make_command_stats_flags() {
        let config = BuildConfig {
            show_stats: true,
            make_tool: "gmake".to_string(),
            ..Default::default()
        };
        let cmd = make_command(&config, Path::new("out")).unwrap();
        assert_eq!(cmd.get_program(), Path::new("gmake"));
        assert_eq!(&cmd.get_args()[2..], &STATS_FLAGS);
    }

    #[test]
    fn test_make_command_nmake() {
        let config = BuildConfig {
            make_tool: "nmake.exe".to_string(),
            ..Default::default()
        };
        let cmd = make_command(&config, Path::new("out")).unwrap();
        assert_eq!(cmd.get_args(), &["/NOLOGO".to_string()]);
        assert!(cmd.get_cwd().unwrap().is_absolute());
    }

    #[test]
    fn test_generate_only() {
        let tmp = project("filebuild \"main.cpp\"\nbuildfile \"app\"\n");
        let opts = BuildOptions {
            source_dir: tmp.path().to_path_buf(),
            generate_only: true,
            ..Default::default()
        };

        let result = build_with_config(&quiet_shell(), &opts, &Config::default()).unwrap();
        assert!(result.outcome.is_none());
        assert_eq!(result.makefile.path, tmp.path().join("out").join("Makefile"));
        assert_eq!(result.config.output_name, "app");
        assert!(result.makefile.path.exists());
    }

    #[test]
    fn test_settings_supply_defaults() {
        let tmp = project("filebuild \"main.cpp\"\n");
        std::fs::rename(
            tmp.path().join("omakefile.txt"),
            tmp.path().join("build.omk"),
        )
        .unwrap();

        let mut settings = Config::default();
        settings.build.description = Some("build.omk".to_string());
        settings.build.output_dir = Some(PathBuf::from("target"));
        settings.build.make_tool = Some("gmake".to_string());

        let opts = BuildOptions {
            source_dir: tmp.path().to_path_buf(),
            generate_only: true,
            ..Default::default()
        };
        let result = build_with_config(&quiet_shell(), &opts, &settings).unwrap();
        assert_eq!(result.config.make_tool, "gmake");
        assert!(tmp.path().join("target").join("Makefile").exists());
    }

    #[test]
    fn test_cl_override_ignores_buildcode() {
        let tmp = project("buildcode \"clang++\"\nfilebuild \"main.cpp\"\nbuilding \"-Wall\"\n");
        let opts = BuildOptions {
            source_dir: tmp.path().to_path_buf(),
            generate_only: true,
            overrides: Overrides {
                use_cl_build: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let result = build_with_config(&quiet_shell(), &opts, &Config::default()).unwrap();
        assert_eq!(result.config.compiler, "cl.exe");
        let text = std::fs::read_to_string(&result.makefile.path).unwrap();
        assert!(text.contains("CFLAGS = /W3 kernel32.lib user32.lib gdi32.lib\n"));
        assert!(text.contains("OBJS = main.obj\n"));
    }

    #[test]
    fn test_missing_description() {
        let tmp = TempDir::new().unwrap();
        let opts = BuildOptions {
            source_dir: tmp.path().to_path_buf(),
            ..Default::default()
        };
        let err = build_with_config(&quiet_shell(), &opts, &Config::default()).unwrap_err();
        assert!(matches!(err, OmakeError::Io { .. }));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_parse_error_stops_before_generation() {
        let tmp = project("filebuild \"main.cpp\"\nbuildfile \"x\", \"y\"\n");
        let opts = BuildOptions {
            source_dir: tmp.path().to_path_buf(),
            ..Default::default()
        };
        let err = build_with_config(&quiet_shell(), &opts, &Config::default()).unwrap_err();
        assert!(matches!(err, OmakeError::Parse { line: 2, .. }));
        assert!(!tmp.path().join("out").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_tool_failure_propagates_code() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let tool = tmp.path().join("fake-make");
        std::fs::write(&tool, "#!/bin/sh\necho '[1/1] Building main.o'\nexit 4\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        let description = format!(
            "filebuild \"main.cpp\"\nbuildmake \"{}\"\n",
            tool.display()
        );
        std::fs::write(tmp.path().join("omakefile.txt"), description).unwrap();

        let mut settings = Config::default();
        settings.build.poll_interval_ms = Some(5);
        let opts = BuildOptions {
            source_dir: tmp.path().to_path_buf(),
            overrides: Overrides {
                show_stats: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = build_with_config(&quiet_shell(), &opts, &settings).unwrap_err();
        match err {
            OmakeError::ToolFailed { code, .. } => assert_eq!(code, Some(4)),
            other => panic!("expected tool failure, got {:?}", other),
        }
    }
}
