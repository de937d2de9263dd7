//! HTML output for a [`Board`].
//!
//! Every function returns a freshly built string; nothing is shared between
//! calls.

use std::{collections::HashMap, fmt::Write as _};

use chrono::{DateTime, Utc};
use shared::domain::{Build, Job};

use crate::{failing::FailingSince, Board, Cell};

const REVISION_LEN: usize = 12;

/// Resolved failing-since annotations, keyed by job name.
pub type FailingSinceMap = HashMap<String, FailingSince>;

#[derive(Debug, Clone)]
pub struct PageOptions {
    pub title: String,
    /// Environment name for the preview banner; `None` on production.
    pub preview_of: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            title: "FreeBSD CI status".into(),
            preview_of: None,
            updated_at: Utc::now(),
        }
    }
}

/// Shortens a git hash to its first twelve characters; other descriptions
/// (svn revisions, free text) are returned as they are.
pub fn short_revision(description: &str) -> &str {
    let description = description.trim();
    if description.len() > REVISION_LEN && description.chars().all(|c| c.is_ascii_hexdigit()) {
        &description[..REVISION_LEN]
    } else {
        description
    }
}

/// `YYYY-MM-DD` and `HH:MM UTC` for an epoch-millisecond timestamp.
pub fn format_timestamp(millis: i64) -> Option<(String, String)> {
    let at = DateTime::<Utc>::from_timestamp_millis(millis)?;
    Some((
        at.format("%Y-%m-%d").to_string(),
        at.format("%H:%M UTC").to_string(),
    ))
}

/// HTML-escapes text and attribute values. `/` is kept as is so labels such as
/// `stable/13` and URLs stay readable in the page source.
fn escape(text: &str) -> String {
    text.split('/')
        .map(|part| v_htmlescape::escape(part).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn render_cell(
    cell: Cell<'_>,
    failing: Option<&FailingSince>,
    test_suite: Option<&Job>,
) -> String {
    let job = match cell {
        Cell::Absent => return "<td>-</td>".to_string(),
        Cell::Pending(_) => return r#"<td class="pending">N/A</td>"#.to_string(),
        Cell::Completed(job) => job,
    };
    let Some(build) = job.last_completed_build.as_ref() else {
        return r#"<td class="pending">N/A</td>"#.to_string();
    };

    let mut html = String::from("<td>");
    let succeeded = build.result.as_ref().is_some_and(|result| result.is_success());
    let class = build
        .result
        .as_ref()
        .map(|result| result.css_class())
        .unwrap_or_else(|| "unknown".to_string());

    let _ = write!(html, r#"<span class="{}">"#, escape(&class));
    match build.timestamp.and_then(format_timestamp) {
        Some((date, time)) => {
            let _ = write!(html, "{date}<br>{time}");
        }
        None => html.push_str("unknown date"),
    }
    html.push_str("</span><br>");

    let revision = build
        .description
        .as_deref()
        .map(short_revision)
        .filter(|revision| !revision.is_empty())
        .unwrap_or("unknown revision");
    let _ = write!(html, "<i>{}</i><br>", escape(revision));

    let failing = (!succeeded)
        .then(|| failing.cloned().unwrap_or_else(|| FailingSince::from_last_successful(job)));

    if let Some(failing) = &failing {
        let since = failing
            .revision()
            .map(short_revision)
            .filter(|revision| !revision.is_empty())
            .unwrap_or("n/a");
        let _ = write!(html, "<i>(failing since {})</i><br>", escape(since));
    }

    html.push_str(r#"<span class="tiny">"#);
    if let Some(failing) = &failing {
        let _ = write!(
            html,
            r#"<a href="{}">{}</a> | "#,
            escape(failing.href()),
            escape(&failing.link_text())
        );
    }
    let _ = write!(
        html,
        r#"<a href="{}">details</a></span><br>"#,
        escape(build.url.as_deref().unwrap_or("#"))
    );

    if let Some(test) = test_suite.and_then(|job| job.last_completed_build.as_ref()) {
        html.push_str(&render_test_suite(test));
    }

    html.push_str("</td>");
    html
}

fn render_test_suite(test: &Build) -> String {
    let result = test
        .result
        .as_ref()
        .map(|result| result.as_str().to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    format!(
        r#"<span class="tiny {class}"><span><a href="{url}">Test suite</a></span> {result}</span><br>"#,
        class = escape(&result.to_ascii_lowercase()),
        url = escape(test.url.as_deref().unwrap_or("#")),
        result = escape(&result),
    )
}

pub fn render_table(board: &Board, failing: &FailingSinceMap) -> String {
    let labels = board.column_labels();

    let mut html = String::from("<table>\n<thead>\n<tr><th></th>");
    for label in &labels {
        let _ = write!(html, r#"<th scope="col">{}</th>"#, escape(label));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for arch in board.architectures() {
        let _ = write!(html, r#"<tr><th scope="row">{}</th>"#, escape(arch));
        for label in &labels {
            let cell = board.cell(arch, label);
            let annotation = match cell {
                Cell::Completed(job) => failing.get(&job.name),
                _ => None,
            };
            html.push_str(&render_cell(cell, annotation, board.test_suite(arch, label)));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>");
    html
}

pub fn render_page(board: &Board, failing: &FailingSinceMap, options: &PageOptions) -> String {
    let banner = options
        .preview_of
        .as_deref()
        .map(|env| {
            format!(
                "<p class=\"preview\">You are viewing a static (preview) version of the site on {}.</p>\n",
                escape(env)
            )
        })
        .unwrap_or_default();

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
table {{ border-collapse: collapse; }}
th, td {{ border: 1px solid #ccc; padding: 4px 8px; text-align: center; }}
.success {{ color: #2e7d32; }}
.failure {{ color: #c62828; }}
.unstable {{ color: #ef6c00; }}
.aborted, .not_built, .pending {{ color: #757575; }}
.tiny {{ font-size: 0.75em; }}
</style>
</head>
<body>
<h1>{title}</h1>
{banner}{table}
<p>Last updated: {updated}</p>
</body>
</html>
"##,
        title = escape(&options.title),
        banner = banner,
        table = render_table(board, failing),
        updated = options.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
