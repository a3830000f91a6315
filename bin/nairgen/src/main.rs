//! nairgen CLI
//!
//! Renders the Nair site templates into a static site for GitHub Pages.
//! Running `nairgen` without a subcommand builds the site.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use nairgen::cmd::build::BuildOverrides;

/// Command-line interface for nairgen.
#[derive(Parser)]
#[command(
    name = "nairgen",
    version,
    about = "Render the Nair site templates into a static site"
)]
struct Cli {
    /// Path to configuration file (optional; defaults apply when missing)
    #[arg(short, long, default_value = "nairgen.toml", global = true)]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build the static site (the default)
    Build(BuildArgs),
    /// Validate configuration and templates without writing anything
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

/// Arguments of the build command.
#[derive(clap::Args, Default)]
struct BuildArgs {
    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Templates directory
    #[arg(long)]
    templates: Option<PathBuf>,
    /// Static assets directory
    #[arg(long = "static")]
    static_dir: Option<PathBuf>,
    /// Write error pages with the failure reason instead of stubs
    #[arg(long)]
    diagnostic: bool,
}

impl From<BuildArgs> for BuildOverrides {
    fn from(args: BuildArgs) -> Self {
        Self {
            output: args.output,
            templates: args.templates,
            static_dir: args.static_dir,
            diagnostic: args.diagnostic,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    nairgen::init_tracing(cli.verbose);

    match cli.command.unwrap_or_else(|| Commands::Build(BuildArgs::default())) {
        Commands::Build(args) => {
            nairgen::cmd::build::run(&cli.config, &args.into())?;
        }
        Commands::Check { strict } => {
            nairgen::cmd::check::run(&cli.config, strict)?;
        }
    }

    Ok(())
}
