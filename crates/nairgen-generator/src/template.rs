//! HTML template system for page generation.
//!
//! A small Jinja-compatible subset, enough for the site templates:
//!
//! - `{{ name }}` interpolates a context variable, HTML-escaped
//! - `{{ name? }}` interpolates an optional variable (empty when missing)
//! - `{{ name|safe }}` interpolates without escaping
//! - `{% include "other.html" %}` inlines another registered template
//! - `{# ... #}` is a comment
//!
//! Any other `{{ ... }}` expression, such as `{{ url_for('index') }}`, is
//! kept verbatim so the link rewriter can resolve it after rendering.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Maximum `{% include %}` nesting depth.
const MAX_INCLUDE_DEPTH: usize = 16;

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Missing required variable.
    #[error("missing required variable: {0}")]
    MissingVariable(String),

    /// Template not found.
    #[error("template not found: {0}")]
    NotFound(String),

    /// Invalid template syntax.
    #[error("invalid template syntax: {0}")]
    InvalidSyntax(String),

    /// Template file could not be read.
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Anything that can turn a template identifier and a context into HTML.
pub trait Renderer {
    /// Render the named template.
    fn render(&self, template_id: &str, context: &TemplateContext) -> Result<String>;
}

/// Template context with variables for interpolation.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable into the context.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Create context with initial variables.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a variable value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Check if a variable exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }
}

impl From<&BTreeMap<String, String>> for TemplateContext {
    fn from(map: &BTreeMap<String, String>) -> Self {
        Self {
            variables: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

/// A parsed piece of template source.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Var {
        name: &'a str,
        optional: bool,
        safe: bool,
    },
    /// An expression this engine does not evaluate, kept with its delimiters.
    Verbatim(&'a str),
    Include(&'a str),
}

/// A named template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    content: String,
}

impl Template {
    /// Create a new template with the given name and content.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Get the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required variables referenced directly by this template, in order of
    /// first appearance. Optional (`?`) variables are not included.
    pub fn variables(&self) -> Result<Vec<&str>> {
        let mut seen = BTreeSet::new();
        Ok(self
            .segments()?
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Var {
                    name,
                    optional: false,
                    ..
                } if seen.insert(name) => Some(name),
                _ => None,
            })
            .collect())
    }

    /// Names of templates pulled in with `{% include %}`.
    pub fn includes(&self) -> Result<Vec<&str>> {
        Ok(self
            .segments()?
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Include(name) => Some(name),
                _ => None,
            })
            .collect())
    }

    /// Render the template on its own. Includes cannot be resolved without a
    /// registry and fail with [`TemplateError::NotFound`].
    pub fn render(&self, context: &TemplateContext) -> Result<String> {
        let mut out = String::with_capacity(self.content.len());
        self.render_into(context, None, 0, &mut out)?;
        Ok(out)
    }

    fn render_into(
        &self,
        context: &TemplateContext,
        registry: Option<&TemplateRegistry>,
        depth: usize,
        out: &mut String,
    ) -> Result<()> {
        for segment in self.segments()? {
            match segment {
                Segment::Text(text) | Segment::Verbatim(text) => out.push_str(text),
                Segment::Var {
                    name,
                    optional,
                    safe,
                } => match context.get(name) {
                    Some(value) if safe => out.push_str(value),
                    Some(value) => out.push_str(&escape_html(value)),
                    None if optional => {}
                    None => return Err(TemplateError::MissingVariable(name.to_string())),
                },
                Segment::Include(name) => {
                    if depth >= MAX_INCLUDE_DEPTH {
                        return Err(TemplateError::InvalidSyntax(format!(
                            "include depth exceeded while including {name} from {}",
                            self.name
                        )));
                    }
                    let included = registry
                        .and_then(|r| r.get(name))
                        .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
                    included.render_into(context, registry, depth + 1, out)?;
                }
            }
        }
        Ok(())
    }

    /// Split the source into text and tag segments.
    fn segments(&self) -> Result<Vec<Segment<'_>>> {
        let src = self.content.as_str();
        let mut segments = Vec::new();
        let mut pos = 0;

        while let Some(offset) = find_tag_start(&src[pos..]) {
            let start = pos + offset;
            if start > pos {
                segments.push(Segment::Text(&src[pos..start]));
            }

            let opener = &src[start..start + 2];
            let closer = match opener {
                "{{" => "}}",
                "{%" => "%}",
                _ => "#}",
            };
            let end = src[start + 2..]
                .find(closer)
                .map(|i| start + 2 + i + 2)
                .ok_or_else(|| {
                    TemplateError::InvalidSyntax(format!(
                        "unclosed {opener} delimiter in {}",
                        self.name
                    ))
                })?;
            let inner = src[start + 2..end - 2].trim();

            match opener {
                "{{" => segments.push(match parse_variable(inner) {
                    Some((name, optional, safe)) => Segment::Var {
                        name,
                        optional,
                        safe,
                    },
                    None => Segment::Verbatim(&src[start..end]),
                }),
                "{%" => segments.push(Segment::Include(
                    parse_include(inner).ok_or_else(|| {
                        TemplateError::InvalidSyntax(format!(
                            "unsupported tag `{{% {inner} %}}` in {}",
                            self.name
                        ))
                    })?,
                )),
                _ => {}
            }

            pos = end;
        }

        if pos < src.len() {
            segments.push(Segment::Text(&src[pos..]));
        }

        Ok(segments)
    }
}

fn find_tag_start(s: &str) -> Option<usize> {
    s.match_indices('{')
        .map(|(i, _)| i)
        .find(|&i| matches!(s.as_bytes().get(i + 1), Some(b'{' | b'%' | b'#')))
}

/// Parse `name`, `name?` or `name|safe`. Anything else is not a variable.
fn parse_variable(expr: &str) -> Option<(&str, bool, bool)> {
    let (expr, safe) = match expr.split_once('|') {
        Some((head, filter)) if filter.trim() == "safe" => (head.trim_end(), true),
        Some(_) => return None,
        None => (expr, false),
    };
    let (name, optional) = match expr.strip_suffix('?') {
        Some(stripped) => (stripped, true),
        None => (expr, false),
    };
    is_identifier(name).then_some((name, optional, safe))
}

fn parse_include(tag: &str) -> Option<&str> {
    let arg = tag.strip_prefix("include")?;
    if !arg.starts_with(char::is_whitespace) {
        return None;
    }
    let arg = arg.trim();
    ['"', '\'']
        .into_iter()
        .find_map(|q| arg.strip_prefix(q)?.strip_suffix(q))
        .filter(|name| !name.is_empty())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Escape text for inclusion in HTML content or attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Registry of templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every template file below `dir`. Template names are paths
    /// relative to `dir` with `/` separators. Hidden files are skipped.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();

        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            let entry = entry.map_err(|e| TemplateError::Io {
                path: e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let name = path
                .strip_prefix(dir)
                .unwrap_or(path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let content = fs::read_to_string(path).map_err(|source| TemplateError::Io {
                path: path.to_path_buf(),
                source,
            })?;

            debug!(template = %name, "loaded template");
            registry.register(Template::new(name, content));
        }

        Ok(registry)
    }

    /// Register a template.
    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Get a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the registry holds no templates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Registered template names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Required variables of a template, following includes.
    pub fn variables(&self, name: &str) -> Result<BTreeSet<String>> {
        let mut vars = BTreeSet::new();
        self.collect_variables(name, 0, &mut vars)?;
        Ok(vars)
    }

    fn collect_variables(
        &self,
        name: &str,
        depth: usize,
        vars: &mut BTreeSet<String>,
    ) -> Result<()> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(TemplateError::InvalidSyntax(format!(
                "include depth exceeded while including {name}"
            )));
        }
        let template = self
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        vars.extend(template.variables()?.into_iter().map(str::to_string));
        for include in template.includes()? {
            self.collect_variables(include, depth + 1, vars)?;
        }
        Ok(())
    }

    /// Render a named template with the given context.
    ///
    /// The context is checked against the variables the template needs
    /// before anything is rendered.
    pub fn render(&self, name: &str, context: &TemplateContext) -> Result<String> {
        let template = self
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;

        if let Some(missing) = self
            .variables(name)?
            .into_iter()
            .find(|var| !context.contains(var))
        {
            return Err(TemplateError::MissingVariable(missing));
        }

        let mut out = String::with_capacity(template.content.len());
        template.render_into(context, Some(self), 0, &mut out)?;
        Ok(out)
    }
}

impl Renderer for TemplateRegistry {
    fn render(&self, template_id: &str, context: &TemplateContext) -> Result<String> {
        TemplateRegistry::render(self, template_id, context)
    }
}
