//! Substitute pages for pages that fail to render.

use nairgen_core::{FallbackMode, PageSpec};

use crate::template::escape_html;

/// Text shown on the stub page.
pub const UNDER_CONSTRUCTION: &str = "Страница в разработке";

/// Build the substitute page for `page`.
#[must_use]
pub fn fallback_page(mode: FallbackMode, page: &PageSpec, reason: &str) -> String {
    match mode {
        FallbackMode::Stub => stub_page(page),
        FallbackMode::Diagnostic => diagnostic_page(page, reason),
    }
}

fn stub_page(page: &PageSpec) -> String {
    let title = escape_html(page.title().unwrap_or(page.route_name()));
    document(
        &title,
        &format!(
            "<h1>{title}</h1>\n    <p>{UNDER_CONSTRUCTION}</p>\n    <p><a href=\"index.html\">На главную</a></p>"
        ),
    )
}

fn diagnostic_page(page: &PageSpec, reason: &str) -> String {
    let template = escape_html(&page.template_id);
    document(
        &format!("Ошибка рендеринга: {template}"),
        &format!(
            "<h1>Ошибка рендеринга</h1>\n    <p>Template <code>{template}</code> failed to render.</p>\n    <pre>{}</pre>",
            escape_html(reason)
        ),
    )
}

fn document(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
</head>
<body>
    {body}
</body>
</html>
"#
    )
}
