//! Site configuration management.
//!
//! Everything has a default, so a site laid out as `templates/` + `static/`
//! builds into `docs/` without any configuration file.

use std::{
    collections::HashSet,
    path::{Component, Path},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, Result},
    page::{PageSpec, default_pages},
};

/// Name of the marker file telling GitHub Pages to skip Jekyll processing.
pub const MARKER_FILE: &str = ".nojekyll";

/// Main configuration structure for nairgen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Pages to render, in order.
    #[serde(default = "default_pages")]
    pub pages: Vec<PageSpec>,
}

/// Build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Output directory for the generated site.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory holding the page templates.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,

    /// Directory holding static assets, copied verbatim to `<output>/static`.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// What to write in place of a page that failed to render.
    #[serde(default)]
    pub fallback: FallbackMode,
}

/// Substitute page policy for pages that fail to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Generic "under construction" page. Reveals nothing about the failure.
    #[default]
    Stub,

    /// Error page naming the template and the failure reason.
    Diagnostic,
}

fn default_output_dir() -> String {
    "docs".to_string()
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            templates_dir: default_templates_dir(),
            static_dir: default_static_dir(),
            fallback: FallbackMode::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build: BuildConfig::default(),
            pages: default_pages(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to the defaults when `path` does not
    /// exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration using the config crate, layering
    /// `NAIRGEN__SECTION__KEY` environment variables over the (optional) file.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("NAIRGEN").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("build.output_dir", &self.build.output_dir),
            ("build.templates_dir", &self.build.templates_dir),
            ("build.static_dir", &self.build.static_dir),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::config(format!("{key} cannot be empty")));
            }
        }

        if self.pages.is_empty() {
            tracing::warn!("no pages configured, only static assets will be published");
        }

        let mut seen = HashSet::new();
        for page in &self.pages {
            let output = page.output_filename.as_str();
            let path = Path::new(output);

            if output.is_empty() || page.template_id.is_empty() {
                return Err(CoreError::config(
                    "page output and template cannot be empty",
                ));
            }
            if path.is_absolute() || output.split(['/', '\\']).any(|c| c == "..") {
                return Err(CoreError::config(format!(
                    "page output must be a relative path inside the output directory: {output}"
                )));
            }
            if !output.ends_with(".html") {
                return Err(CoreError::config(format!(
                    "page output must end in .html: {output}"
                )));
            }

            // `index.html` and `./index.html` name the same file.
            let normalized = path
                .components()
                .filter(|c| !matches!(c, Component::CurDir))
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if normalized.starts_with("static/") || normalized == MARKER_FILE {
                return Err(CoreError::config(format!(
                    "page output collides with generated files: {output}"
                )));
            }
            if !seen.insert(normalized) {
                return Err(CoreError::config(format!("duplicate page output: {output}")));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("nairgen.toml");
        std::fs::write(&config_path, content).expect("write");
        (dir, config_path)
    }

    #[test]
    fn test_load_config() {
        let (_dir, path) = write_config(
            r#"
[build]
output_dir = "public"
templates_dir = "site/templates"
static_dir = "site/static"
fallback = "diagnostic"

[[pages]]
output = "index.html"
template = "home.html"

[pages.context]
title = "Home"

[[pages]]
output = "about.html"
template = "about.html"
"#,
        );

        let config = Config::load(&path).expect("load config");

        assert_eq!(config.build.output_dir, "public");
        assert_eq!(config.build.templates_dir, "site/templates");
        assert_eq!(config.build.static_dir, "site/static");
        assert_eq!(config.build.fallback, FallbackMode::Diagnostic);
        assert_eq!(config.pages.len(), 2);
        assert_eq!(config.pages[0].template_id, "home.html");
        assert_eq!(config.pages[0].title(), Some("Home"));
        assert!(config.pages[1].context.is_empty());
    }

    #[test]
    fn test_config_defaults() {
        let (_dir, path) = write_config("");

        let config = Config::load(&path).expect("load config");

        assert_eq!(config.build.output_dir, "docs");
        assert_eq!(config.build.templates_dir, "templates");
        assert_eq!(config.build.static_dir, "static");
        assert_eq!(config.build.fallback, FallbackMode::Stub);
        assert_eq!(config.pages, default_pages());
    }

    #[test]
    fn test_config_not_found() {
        let result = Config::load(Path::new("/nonexistent/nairgen.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = Config::load_or_default(&dir.path().join("nairgen.toml")).expect("defaults");
        assert_eq!(config.build.output_dir, "docs");
        assert_eq!(config.pages.len(), 4);
    }

    #[test]
    fn test_load_with_env_reads_file() {
        let (_dir, path) = write_config(
            r#"
[build]
fallback = "diagnostic"
"#,
        );

        let config = Config::load_with_env(&path).expect("load config");
        assert_eq!(config.build.fallback, FallbackMode::Diagnostic);
        assert_eq!(config.pages.len(), 4);
    }

    #[test]
    fn test_invalid_toml() {
        let (_dir, path) = write_config("[build\noutput_dir = ");
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
        assert!(matches!(err, CoreError::Config { source: Some(_), .. }));
    }

    #[test]
    fn test_validation_empty_output_dir() {
        let mut config = Config::default();
        config.build.output_dir = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("build.output_dir cannot be empty"));
    }

    #[test]
    fn test_validation_duplicate_output() {
        let mut config = Config::default();
        config.pages.push(PageSpec::new("lor.html", "lor2.html"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate page output: lor.html"));
    }

    #[test]
    fn test_validation_rejects_unsafe_outputs() {
        for output in [
            "../escape.html",
            "/abs.html",
            "static/x.html",
            "./static/x.html",
            "page.txt",
        ] {
            let config = Config {
                build: BuildConfig::default(),
                pages: vec![PageSpec::new(output, "index.html")],
            };
            assert!(config.validate().is_err(), "{output} should be rejected");
        }
    }

    #[test]
    fn test_validation_duplicate_output_through_current_dir() {
        let config = Config {
            build: BuildConfig::default(),
            pages: vec![
                PageSpec::new("index.html", "index.html"),
                PageSpec::new("./index.html", "other.html"),
            ],
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate page output: ./index.html"));
    }
}
