//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

use omake::core::Overrides;
use omake::util::shell::ColorChoice;

/// omake - generate a Makefile from a build description and run it
#[derive(Parser)]
#[command(name = "omake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Show a live progress line and build statistics
    #[arg(long, visible_alias = "starts")]
    pub stats: bool,

    /// Generate an MSVC Makefile, optionally naming the cl compiler to use
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub clbuild: Option<Option<String>>,

    /// Directory containing the build description and sources
    #[arg(short = 'C', long = "build", value_name = "DIR", default_value = ".")]
    pub source_dir: PathBuf,

    /// Output directory for the Makefile and objects [default: out]
    #[arg(short = 'B', value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Build description file [default: omakefile.txt]
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<String>,

    /// Write the Makefile without running the build tool
    #[arg(long)]
    pub generate_only: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress status output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Output format for messages: human, json
    #[arg(long, value_name = "FMT", default_value = "human")]
    pub message_format: MessageFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

impl Cli {
    /// Settings that take precedence over the build description.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            show_stats: self.stats,
            use_cl_build: self.clbuild.is_some(),
            cl_path: self.clbuild.clone().flatten(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["omake"]).unwrap();
        assert_eq!(cli.source_dir, PathBuf::from("."));
        assert!(cli.output_dir.is_none());
        assert_eq!(cli.overrides(), Overrides::default());
    }

    #[test]
    fn test_clbuild_without_path() {
        let cli = Cli::try_parse_from(["omake", "--clbuild", "--generate-only"]).unwrap();
        let overrides = cli.overrides();
        assert!(overrides.use_cl_build);
        assert!(overrides.cl_path.is_none());
        assert!(cli.generate_only);
    }

    #[test]
    fn test_clbuild_with_path() {
        let cli = Cli::try_parse_from(["omake", "--clbuild", "C:/VC/bin/cl.exe"]).unwrap();
        assert_eq!(cli.overrides().cl_path.as_deref(), Some("C:/VC/bin/cl.exe"));
    }

    #[test]
    fn test_starts_alias() {
        let cli = Cli::try_parse_from(["omake", "--starts", "-B", "build", "-C", "proj"]).unwrap();
        assert!(cli.overrides().show_stats);
        assert_eq!(cli.output_dir, Some(PathBuf::from("build")));
        assert_eq!(cli.source_dir, PathBuf::from("proj"));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["omake", "-q", "-v"]).is_err());
    }
}
