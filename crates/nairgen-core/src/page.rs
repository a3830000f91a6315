//! Page registry.
//!
//! A page is a static `(output file, template, context)` triple. The default
//! registry holds the four pages of the Nair site.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single page to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    /// Output file name, relative to the output directory (e.g. `karta.html`).
    #[serde(rename = "output")]
    pub output_filename: String,

    /// Template identifier, relative to the templates directory.
    #[serde(rename = "template")]
    pub template_id: String,

    /// Variables made available to the template.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl PageSpec {
    /// Create a page with an empty context.
    #[must_use]
    pub fn new(output_filename: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            output_filename: output_filename.into(),
            template_id: template_id.into(),
            context: BTreeMap::new(),
        }
    }

    /// Add a context variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Route name used by `url_for` placeholders: the output file name
    /// without its `.html` extension.
    #[must_use]
    pub fn route_name(&self) -> &str {
        self.output_filename
            .strip_suffix(".html")
            .unwrap_or(&self.output_filename)
    }

    /// Page title from the context, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.context.get("title").map(String::as_str)
    }
}

/// The pages of the Nair site, in build order.
#[must_use]
pub fn default_pages() -> Vec<PageSpec> {
    [
        ("index", "Главная - Наир"),
        ("karta", "Карта - Наир"),
        ("lor", "Лор - Наир"),
        ("ankety", "Анкеты - Наир"),
    ]
    .into_iter()
    .map(|(route, title)| {
        let file = format!("{route}.html");
        PageSpec::new(file.clone(), file)
            .with_var("title", title)
            .with_var("active_page", route)
    })
    .collect()
}
