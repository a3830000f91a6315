//! Post-render link rewriting.
//!
//! Rendered pages still carry `url_for` placeholders written for the
//! original web framework. A static host has no router, so every placeholder
//! is replaced with a relative file path through an ordered table of literal
//! substitutions.

/// Placeholder opening a static asset reference; the file name follows it.
pub const STATIC_PREFIX: &str = "{{ url_for('static', filename='";

/// Closing fragment left behind by [`STATIC_PREFIX`] rewrites. Always the
/// last rule.
pub const PLACEHOLDER_SUFFIX: &str = "') }}";

/// Routes of the Nair site.
pub const DEFAULT_ROUTES: [&str; 4] = ["index", "karta", "lor", "ankety"];

/// An ordered list of literal replacements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRewriter {
    rules: Vec<(String, String)>,
}

impl LinkRewriter {
    /// Build the table for the given route names.
    ///
    /// Order: static prefix, one rule per route, then the suffix catch-all.
    /// The catch-all must run last or it would cut `') }}` off the route
    /// placeholders before they are matched whole.
    pub fn for_routes<I, S>(routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = vec![(STATIC_PREFIX.to_string(), "static/".to_string())];
        rules.extend(routes.into_iter().map(|route| {
            let route = route.as_ref();
            (format!("{{{{ url_for('{route}') }}}}"), format!("{route}.html"))
        }));
        rules.push((PLACEHOLDER_SUFFIX.to_string(), String::new()));
        Self { rules }
    }

    /// The replacement table, in application order.
    #[must_use]
    pub fn rules(&self) -> &[(String, String)] {
        &self.rules
    }

    /// Apply every rule, in order, to `html`.
    #[must_use]
    pub fn rewrite(&self, html: &str) -> String {
        self.rules
            .iter()
            .fold(html.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
    }
}

impl Default for LinkRewriter {
    fn default() -> Self {
        Self::for_routes(DEFAULT_ROUTES)
    }
}

/// Rewrite `html` with the default table.
#[must_use]
pub fn rewrite(html: &str) -> String {
    LinkRewriter::default().rewrite(html)
}
