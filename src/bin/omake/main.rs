//! omake CLI - Makefile generator and build driver

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, MessageFormat};
use omake::core::OmakeError;
use omake::ops::omake_build::{build, BuildOptions};
use omake::util::diagnostic;
use omake::util::shell::Shell;

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("omake=debug")
    } else {
        EnvFilter::new("omake=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let shell = Arc::new(Shell::from_flags(
        cli.quiet,
        cli.verbose,
        cli.color,
        cli.message_format == MessageFormat::Json,
    ));

    if let Err(e) = run(&cli, &shell) {
        let code = match e.downcast_ref::<OmakeError>() {
            Some(err) => {
                diagnostic::emit(&err.to_diagnostic(), shell.use_color());
                err.exit_code()
            }
            None => {
                eprintln!("error: {:#}", e);
                1
            }
        };
        std::process::exit(code);
    }
}

fn run(cli: &Cli, shell: &Arc<Shell>) -> Result<()> {
    let opts = BuildOptions {
        source_dir: cli.source_dir.clone(),
        output_dir: cli.output_dir.clone(),
        description: cli.file.clone(),
        overrides: cli.overrides(),
        generate_only: cli.generate_only,
    };

    build(shell, &opts)?;
    Ok(())
}
