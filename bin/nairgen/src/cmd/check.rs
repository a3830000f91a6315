//! Check command - validate configuration, sources and templates

use std::path::Path;

use color_eyre::eyre::{Result, bail};
use nairgen_core::Config;
use nairgen_generator::{Builder, LinkRewriter, TemplateContext, TemplateRegistry};

/// Validation result.
#[derive(Debug, Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the check command.
///
/// Validates configuration, source directories and every page template
/// without writing anything.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking configuration and templates");

    let mut result = ValidationResult::default();

    println!("Checking configuration...");
    let config = match Config::load_with_env(config_path) {
        Ok(c) => {
            println!("  ✓ Configuration valid ({} pages)", c.pages.len());
            c
        }
        Err(e) => {
            println!("  ✗ Configuration invalid: {e}");
            bail!("Configuration error: {e}");
        }
    };

    println!("\nChecking directories...");
    let sources_ok = check_directories(&config, &mut result);

    if sources_ok {
        println!("\nChecking pages...");
        check_pages(&config, &mut result);
    }

    // Print summary
    println!();
    println!("Summary:");
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

/// Check that the source directories exist. Returns whether the page checks
/// can run.
fn check_directories(config: &Config, result: &mut ValidationResult) -> bool {
    match Builder::from_config(config).verify_sources() {
        Ok(()) => {
            println!("  ✓ {}/ exists", config.build.templates_dir);
            println!("  ✓ {}/ exists", config.build.static_dir);
            true
        }
        Err(e) => {
            println!("  ✗ {e}");
            result.add_error(e.to_string());
            false
        }
    }
}

/// Check that every page template exists, receives all the variables it
/// needs, and leaves no unresolved placeholder behind.
fn check_pages(config: &Config, result: &mut ValidationResult) {
    let registry = match TemplateRegistry::load_dir(Path::new(&config.build.templates_dir)) {
        Ok(registry) => registry,
        Err(e) => {
            result.add_error(format!("Failed to load templates: {e}"));
            return;
        }
    };
    let rewriter = LinkRewriter::for_routes(config.pages.iter().map(|p| p.route_name()));

    let mut failed = 0;
    for page in &config.pages {
        let context = TemplateContext::from(&page.context);

        let missing: Vec<String> = match registry.variables(&page.template_id) {
            Ok(vars) => vars
                .into_iter()
                .filter(|v| !context.contains(v))
                .collect(),
            Err(e) => {
                result.add_error(format!("{}: {e}", page.output_filename));
                failed += 1;
                continue;
            }
        };
        if !missing.is_empty() {
            result.add_error(format!(
                "{}: template {} needs variables not in the page context: {}",
                page.output_filename,
                page.template_id,
                missing.join(", ")
            ));
            failed += 1;
            continue;
        }

        match registry.render(&page.template_id, &context) {
            Ok(html) => {
                let html = rewriter.rewrite(&html);
                if html.contains("url_for") || html.contains("{{") {
                    result.add_warning(format!(
                        "{}: unresolved placeholder left after rewriting",
                        page.output_filename
                    ));
                }
            }
            Err(e) => {
                result.add_error(format!("{}: {e}", page.output_filename));
                failed += 1;
            }
        }
    }

    let total = config.pages.len();
    if failed == 0 {
        println!("  ✓ All {total} pages render");
    } else {
        println!("  ✗ {failed}/{total} pages fail to render");
    }
}
