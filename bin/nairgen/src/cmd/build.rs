//! Build command - renders the static site

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use color_eyre::eyre::{Result, WrapErr};
use nairgen_core::{Config, FallbackMode};
use nairgen_generator::{BuildStats, Builder, PageOutcome};

/// Command-line overrides for the configured build settings.
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    /// Output directory.
    pub output: Option<PathBuf>,
    /// Templates directory.
    pub templates: Option<PathBuf>,
    /// Static assets directory.
    pub static_dir: Option<PathBuf>,
    /// Write diagnostic error pages instead of stubs.
    pub diagnostic: bool,
}

impl BuildOverrides {
    /// Apply the overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.build.output_dir = output.to_string_lossy().to_string();
        }
        if let Some(templates) = &self.templates {
            config.build.templates_dir = templates.to_string_lossy().to_string();
        }
        if let Some(static_dir) = &self.static_dir {
            config.build.static_dir = static_dir.to_string_lossy().to_string();
        }
        if self.diagnostic {
            config.build.fallback = FallbackMode::Diagnostic;
        }
    }
}

/// Run the build command.
///
/// Renders every configured page into the output directory. Pages that fail
/// to render are replaced by a fallback page and do not fail the command.
pub fn run(config_path: &Path, overrides: &BuildOverrides) -> Result<BuildStats> {
    let start = Instant::now();
    tracing::info!(?config_path, ?overrides, "Starting build");

    let mut config =
        Config::load_with_env(config_path).wrap_err("Failed to load configuration")?;
    overrides.apply(&mut config);
    config.validate().wrap_err("Invalid configuration")?;

    tracing::debug!(?config, "Loaded configuration");

    let stats = Builder::from_config(&config)
        .build()
        .wrap_err("Build failed")?;

    let duration = start.elapsed();

    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Pages:      {}", stats.pages);
    println!("  Fallbacks:  {}", stats.fallbacks);
    println!("  Assets:     {}", stats.assets);
    println!();
    println!("  Duration:   {:.2}s", duration.as_secs_f64());
    println!("  Output:     {}", config.build.output_dir);
    println!();

    for report in &stats.reports {
        if let PageOutcome::Fallback { reason } = &report.outcome {
            println!("  ⚠ {} ({}): {reason}", report.output, report.template);
        }
    }

    tracing::info!(?duration, "Build completed successfully");

    Ok(stats)
}
