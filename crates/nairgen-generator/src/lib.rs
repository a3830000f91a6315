//! nairgen Generator Library
//!
//! Renders the site templates into a static site ready for GitHub Pages.
//!
//! # Modules
//!
//! - [`template`] - Template loading and rendering
//! - [`rewrite`] - `url_for` placeholder rewriting
//! - [`assets`] - Verbatim static asset copying
//! - [`fallback`] - Substitute pages for pages that fail to render
//! - [`build`] - Build orchestration

pub mod assets;
pub mod build;
pub mod fallback;
pub mod rewrite;
pub mod template;

pub use assets::{AssetCopier, AssetManifest};
pub use build::{BuildError, BuildStats, Builder, PageOutcome, PageReport};
pub use fallback::fallback_page;
pub use rewrite::{LinkRewriter, rewrite};
pub use template::{Renderer, Template, TemplateContext, TemplateError, TemplateRegistry};
