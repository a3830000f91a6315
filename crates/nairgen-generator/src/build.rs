//! Build orchestration.
//!
//! One run goes through Init, Clean, CopyAssets, RenderAll and Finalize in
//! that order. Init, Clean and CopyAssets failures end the run with a
//! [`BuildError`]; a page that fails to render is replaced by a fallback
//! page and the run carries on.

use std::{
    fs,
    path::{Component, Path, PathBuf},
    time::Instant,
};

use nairgen_core::{Config, FallbackMode, MARKER_FILE, PageSpec, default_pages};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    assets::{AssetCopier, AssetError, ensure_dir},
    fallback::fallback_page,
    rewrite::LinkRewriter,
    template::{Renderer, TemplateContext, TemplateError, TemplateRegistry},
};

/// Build errors. All of them are fatal to the run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A source directory is missing.
    #[error("{kind} directory not found: {path}")]
    MissingDirectory { kind: &'static str, path: PathBuf },

    /// The output directory and a source directory contain one another.
    #[error("output directory {output} overlaps source directory {source_dir}")]
    UnsafeOutput { output: PathBuf, source_dir: PathBuf },

    /// Templates could not be loaded.
    #[error("failed to load templates: {0}")]
    Templates(#[from] TemplateError),

    /// Asset error.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// Writing to the output directory failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// What happened to a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Rendered from its template.
    Rendered,

    /// Replaced by a fallback page.
    Fallback {
        /// Why rendering failed.
        reason: String,
    },
}

/// Per-page build report.
#[derive(Debug, Clone)]
pub struct PageReport {
    /// Output file name.
    pub output: String,

    /// Template identifier.
    pub template: String,

    /// Result of rendering.
    pub outcome: PageOutcome,
}

/// Build statistics.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Number of pages rendered from their template.
    pub pages: usize,

    /// Number of pages replaced by a fallback page.
    pub fallbacks: usize,

    /// Number of assets copied.
    pub assets: usize,

    /// Build duration in milliseconds.
    pub duration_ms: u64,

    /// One report per page, in build order.
    pub reports: Vec<PageReport>,
}

/// Site builder that orchestrates the build process.
#[derive(Debug, Clone)]
pub struct Builder {
    templates_dir: PathBuf,
    static_dir: PathBuf,
    output_dir: PathBuf,
    pages: Vec<PageSpec>,
    fallback: FallbackMode,
}

impl Builder {
    /// Create a builder for the default pages.
    #[must_use]
    pub fn new(
        templates_dir: impl Into<PathBuf>,
        static_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            static_dir: static_dir.into(),
            output_dir: output_dir.into(),
            pages: default_pages(),
            fallback: FallbackMode::default(),
        }
    }

    /// Create a builder from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.build.templates_dir,
            &config.build.static_dir,
            &config.build.output_dir,
        )
        .with_pages(config.pages.clone())
        .with_fallback(config.build.fallback)
    }

    /// Replace the page registry.
    #[must_use]
    pub fn with_pages(mut self, pages: Vec<PageSpec>) -> Self {
        self.pages = pages;
        self
    }

    /// Set the fallback page policy.
    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackMode) -> Self {
        self.fallback = fallback;
        self
    }

    /// Pages this builder renders.
    #[must_use]
    pub fn pages(&self) -> &[PageSpec] {
        &self.pages
    }

    /// Output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute the full build, rendering with the templates found in the
    /// templates directory.
    pub fn build(&self) -> Result<BuildStats> {
        self.verify_sources()?;
        let registry = TemplateRegistry::load_dir(&self.templates_dir)?;
        info!(count = registry.len(), "loaded templates");
        self.run(&registry)
    }

    /// Execute the full build with a caller-provided renderer.
    pub fn build_with(&self, renderer: &dyn Renderer) -> Result<BuildStats> {
        self.verify_sources()?;
        self.run(renderer)
    }

    /// Check that both source directories exist and that the output directory
    /// neither contains nor lies inside either of them. Touches nothing.
    pub fn verify_sources(&self) -> Result<()> {
        for (kind, path) in [
            ("templates", &self.templates_dir),
            ("static", &self.static_dir),
        ] {
            if !path.is_dir() {
                return Err(BuildError::MissingDirectory {
                    kind,
                    path: path.clone(),
                });
            }
        }

        // The output may not exist yet, so compare lexically.
        let output = absolute_path(&self.output_dir)?;
        for source in [&self.templates_dir, &self.static_dir] {
            let source_abs = absolute_path(source)?;
            if source_abs.starts_with(&output) || output.starts_with(&source_abs) {
                return Err(BuildError::UnsafeOutput {
                    output: self.output_dir.clone(),
                    source_dir: source.clone(),
                });
            }
        }

        Ok(())
    }

    fn run(&self, renderer: &dyn Renderer) -> Result<BuildStats> {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        info!(
            templates = %self.templates_dir.display(),
            static_dir = %self.static_dir.display(),
            output = %self.output_dir.display(),
            "starting build"
        );

        // 1. Clean output directory
        self.clean_output()?;

        // 2. Copy static assets
        let manifest =
            AssetCopier::new().copy_tree(&self.static_dir, &self.output_dir.join("static"))?;
        stats.assets = manifest.assets().len();

        // 3. Render pages
        self.render_all(renderer, &mut stats)?;

        // 4. Marker file
        self.write_file(&self.output_dir.join(MARKER_FILE), "")?;

        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            pages = stats.pages,
            fallbacks = stats.fallbacks,
            assets = stats.assets,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    /// Clean the output directory.
    fn clean_output(&self) -> Result<()> {
        if self.output_dir.exists() {
            debug!(dir = %self.output_dir.display(), "cleaning output directory");
            fs::remove_dir_all(&self.output_dir)?;
        }
        ensure_dir(&self.output_dir)?;
        Ok(())
    }

    /// Render every page, substituting a fallback page on failure.
    fn render_all(&self, renderer: &dyn Renderer, stats: &mut BuildStats) -> Result<()> {
        let rewriter = LinkRewriter::for_routes(self.pages.iter().map(PageSpec::route_name));

        info!(count = self.pages.len(), "generating HTML pages");

        for page in &self.pages {
            let context = TemplateContext::from(&page.context);
            let (html, outcome) = match renderer.render(&page.template_id, &context) {
                Ok(html) => (rewriter.rewrite(&html), PageOutcome::Rendered),
                Err(e) => {
                    warn!(
                        output = %page.output_filename,
                        template = %page.template_id,
                        error = %e,
                        "page failed to render, writing fallback page"
                    );
                    let reason = e.to_string();
                    (
                        fallback_page(self.fallback, page, &reason),
                        PageOutcome::Fallback { reason },
                    )
                }
            };

            let output_path = self.output_dir.join(&page.output_filename);
            self.write_file(&output_path, &html)?;
            debug!(path = %output_path.display(), "wrote page");

            match outcome {
                PageOutcome::Rendered => stats.pages += 1,
                PageOutcome::Fallback { .. } => stats.fallbacks += 1,
            }
            stats.reports.push(PageReport {
                output: page.output_filename.clone(),
                template: page.template_id.clone(),
                outcome,
            });
        }

        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        fs::write(path, contents).map_err(|source| BuildError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Absolute form of `path` with `.` and `..` resolved without touching the
/// file system.
fn absolute_path(path: &Path) -> Result<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::template::Template;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        let templates = dir.path().join("templates");
        let assets = dir.path().join("static/css");
        fs::create_dir_all(&templates).unwrap();
        fs::create_dir_all(&assets).unwrap();
        fs::write(assets.join("style.css"), "body {}").unwrap();

        for route in ["index", "karta", "lor", "ankety"] {
            fs::write(
                templates.join(format!("{route}.html")),
                format!(
                    "<title>{{{{ title }}}}</title>\
                     <link href=\"{{{{ url_for('static', filename='css/style.css') }}}}\">\
                     <a href=\"{{{{ url_for('index') }}}}\">home</a> {route}"
                ),
            )
            .unwrap();
        }
        dir
    }

    fn builder(site: &TempDir) -> Builder {
        Builder::new(
            site.path().join("templates"),
            site.path().join("static"),
            site.path().join("docs"),
        )
    }

    #[test]
    fn test_build_site() {
        let site = site();
        let stats = builder(&site).build().unwrap();

        assert_eq!(stats.pages, 4);
        assert_eq!(stats.fallbacks, 0);
        assert_eq!(stats.assets, 1);
        assert_eq!(stats.reports.len(), 4);

        let out = site.path().join("docs");
        let karta = fs::read_to_string(out.join("karta.html")).unwrap();
        assert_eq!(
            karta,
            "<title>Карта - Наир</title><link href=\"static/css/style.css\"><a href=\"index.html\">home</a> karta"
        );
        assert!(out.join("static/css/style.css").exists());
        assert_eq!(fs::read(out.join(".nojekyll")).unwrap(), b"");
    }

    #[test]
    fn test_build_cleans_output() {
        let site = site();
        let out = site.path().join("docs");
        fs::create_dir_all(out.join("old")).unwrap();
        fs::write(out.join("stale.html"), "old").unwrap();

        builder(&site).build().unwrap();

        assert!(!out.join("stale.html").exists());
        assert!(!out.join("old").exists());
        assert!(out.join("index.html").exists());
    }

    #[test]
    fn test_missing_templates_dir_is_fatal() {
        let site = site();
        fs::remove_dir_all(site.path().join("templates")).unwrap();

        let err = builder(&site).build().unwrap_err();
        assert!(matches!(err, BuildError::MissingDirectory { kind: "templates", .. }));
        assert!(!site.path().join("docs").exists());
    }

    #[test]
    fn test_missing_static_dir_is_fatal() {
        let site = site();
        fs::remove_dir_all(site.path().join("static")).unwrap();

        let err = builder(&site).build().unwrap_err();
        assert!(matches!(err, BuildError::MissingDirectory { kind: "static", .. }));
    }

    #[test]
    fn test_output_containing_sources_is_rejected() {
        let site = site();
        let builder = Builder::new(
            site.path().join("templates"),
            site.path().join("static"),
            site.path(),
        );

        let err = builder.build().unwrap_err();
        assert!(matches!(err, BuildError::UnsafeOutput { .. }));
        assert!(site.path().join("templates/index.html").exists());
    }

    #[test]
    fn test_output_inside_static_is_rejected() {
        let site = site();
        let output = site.path().join("static/docs");
        let builder = Builder::new(site.path().join("templates"), site.path().join("static"), &output);

        let err = builder.build().unwrap_err();
        assert!(matches!(err, BuildError::UnsafeOutput { .. }));
        assert!(!output.exists());

        // Same directory spelled through `..`.
        let builder = Builder::new(
            site.path().join("templates"),
            site.path().join("static"),
            site.path().join("templates/../static/./docs"),
        );
        assert!(matches!(builder.build(), Err(BuildError::UnsafeOutput { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn test_absolute_path_resolves_dots() {
        let path = absolute_path(Path::new("/site/templates/../docs/./out")).unwrap();
        assert_eq!(path, Path::new("/site/docs/out"));
    }

    #[test]
    fn test_failed_page_gets_fallback() {
        let site = site();
        fs::remove_file(site.path().join("templates/lor.html")).unwrap();

        let stats = builder(&site).build().unwrap();

        assert_eq!(stats.pages, 3);
        assert_eq!(stats.fallbacks, 1);
        let lor = &stats.reports[2];
        assert_eq!(lor.output, "lor.html");
        assert!(
            matches!(&lor.outcome, PageOutcome::Fallback { reason } if reason.contains("lor.html"))
        );

        let html = fs::read_to_string(site.path().join("docs/lor.html")).unwrap();
        assert!(html.contains(crate::fallback::UNDER_CONSTRUCTION));
    }

    #[test]
    fn test_diagnostic_fallback() {
        let site = site();
        let pages = vec![PageSpec::new("index.html", "index.html")];

        builder(&site)
            .with_pages(pages)
            .with_fallback(FallbackMode::Diagnostic)
            .build()
            .unwrap();

        let html = fs::read_to_string(site.path().join("docs/index.html")).unwrap();
        assert!(html.contains("missing required variable: title"));
    }

    #[test]
    fn test_build_with_custom_renderer() {
        let site = site();
        let mut registry = TemplateRegistry::new();
        registry.register(Template::new(
            "about.html",
            "<a href=\"{{ url_for('about') }}\">{{ title }}</a>",
        ));

        let pages = vec![PageSpec::new("about.html", "about.html").with_var("title", "About")];
        let stats = builder(&site).with_pages(pages).build_with(&registry).unwrap();

        assert_eq!(stats.pages, 1);
        assert_eq!(
            fs::read_to_string(site.path().join("docs/about.html")).unwrap(),
            "<a href=\"about.html\">About</a>"
        );
    }

    #[test]
    fn test_nested_output_file() {
        let site = site();
        let pages = vec![
            PageSpec::new("lore/history.html", "lor.html").with_var("title", "История"),
        ];

        builder(&site).with_pages(pages).build().unwrap();
        assert!(site.path().join("docs/lore/history.html").exists());
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.build.output_dir = "public".to_string();
        config.build.fallback = FallbackMode::Diagnostic;

        let builder = Builder::from_config(&config);
        assert_eq!(builder.output_dir(), Path::new("public"));
        assert_eq!(builder.pages().len(), 4);
        assert_eq!(builder.fallback, FallbackMode::Diagnostic);
    }
}
