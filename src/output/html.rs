//! Self-contained HTML session report.

use super::SessionReport;
use std::fmt::{self, Write};

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin-bottom:1.5em}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left;vertical-align:top}\
th{background:#f0f0f0}h2{margin-top:2em}.muted{color:#888}";

/// Escape text for use in HTML element content and quoted attributes.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a session report: summary, successful results, then headers and
/// links per responding url.
pub fn render_html<W: Write>(out: &mut W, report: &SessionReport) -> fmt::Result {
    let session = &report.session;
    let name = html_escape(&session.name);

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html><head><meta charset=\"utf-8\">")?;
    writeln!(out, "<title>httpsweep report: {}</title>", name)?;
    writeln!(out, "<style>{}</style></head><body>", STYLE)?;
    writeln!(out, "<h1>Session {}</h1>", name)?;

    writeln!(out, "<table>")?;
    summary_row(out, "Network", &session.network)?;
    summary_row(out, "Ports", &session.ports)?;
    summary_row(
        out,
        "Created",
        &session.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )?;
    summary_row(out, "Responding URLs", &report.responded().to_string())?;
    writeln!(out, "</table>")?;

    writeln!(out, "<h2>Results</h2>")?;
    writeln!(
        out,
        "<table><tr><th>URL</th><th>Status</th><th>Title</th><th>Scanned</th></tr>"
    )?;
    for row in report.results.iter().filter(|r| r.status_code.is_some()) {
        let status = row.status_code.map(|c| c.to_string()).unwrap_or_default();
        writeln!(
            out,
            "<tr><td><a href=\"#{anchor}\">{url}</a></td><td>{status}</td><td>{title}</td><td>{at}</td></tr>",
            anchor = html_escape(&row.url),
            url = html_escape(&row.url),
            status = status,
            title = html_escape(row.page_title.as_deref().unwrap_or("")),
            at = row.scanned_at.format("%Y-%m-%d %H:%M:%S"),
        )?;
    }
    writeln!(out, "</table>")?;

    for row in report.results.iter().filter(|r| r.status_code.is_some()) {
        let url = html_escape(&row.url);
        writeln!(out, "<h2 id=\"{}\">{}</h2>", url, url)?;

        writeln!(out, "<h3>Response Headers</h3>")?;
        writeln!(out, "<table><tr><th>Name</th><th>Value</th></tr>")?;
        for header in report.headers_for(&row.url) {
            writeln!(
                out,
                "<tr><td>{}</td><td>{}</td></tr>",
                html_escape(&header.name),
                html_escape(&header.value)
            )?;
        }
        writeln!(out, "</table>")?;

        writeln!(out, "<h3>Links</h3>")?;
        writeln!(out, "<ul>")?;
        for link in report.links_for(&row.url) {
            match &link.link {
                Some(href) => writeln!(out, "<li>{}</li>", html_escape(href))?,
                None => writeln!(out, "<li class=\"muted\">(no href)</li>")?,
            }
        }
        writeln!(out, "</ul>")?;
    }

    writeln!(out, "</body></html>")
}

fn summary_row<W: Write>(out: &mut W, label: &str, value: &str) -> fmt::Result {
    writeln!(
        out,
        "<tr><th>{}</th><td>{}</td></tr>",
        label,
        html_escape(value)
    )
}
