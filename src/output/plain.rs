//! Plain text output formatting.
//!
//! Produces human-readable tables with colors.

use crate::scanner::{Outcome, ScanSummary};
use crate::storage::{HeaderRow, LinkRow, ResultRow, SessionRecord};
use console::{style, Style};
use std::io::{self, Write};

const RULE: &str = "───────────────────────────────────────────────────────────────";

/// Print what is about to be scanned.
pub fn print_scan_header(session: &str, created: bool, network: &str, hosts: u64, ports: usize) {
    println!();
    if created {
        println!(
            "{} Recording new session name: {}",
            style("[*]").green(),
            style(session).white().bold()
        );
    } else {
        println!(
            "{} Using existing session name: {}",
            style("[*]").yellow(),
            style(session).white().bold()
        );
    }
    println!(
        "{} {} has {} hosts to scan on {} ports",
        style("[*]").dim(),
        network,
        style(hosts).white().bold(),
        style(ports).white().bold()
    );
    println!();
}

/// Print the outcome tally of a scan.
pub fn print_summary(summary: &ScanSummary) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    if summary.interrupted {
        writeln!(
            out,
            "{} Scan interrupted for session: {} ({}/{} targets finished)",
            style("[!]").yellow().bold(),
            summary.session,
            summary.finished(),
            summary.total
        )?;
    } else {
        writeln!(
            out,
            "{} Scan complete for session: {}",
            style("[*]").green(),
            summary.session
        )?;
    }
    writeln!(out, "{} Scan Summary", style("[*]").dim())?;
    writeln!(out, "  {}", style(RULE).dim())?;
    for outcome in Outcome::ALL {
        let count = summary.count(outcome);
        if count == 0 {
            continue;
        }
        let tag_style = match outcome {
            Outcome::Completed => Style::new().green().bold(),
            Outcome::Skipped => Style::new().yellow(),
            Outcome::Errored => Style::new().red(),
        };
        writeln!(
            out,
            "  {:<12} {:>8}",
            tag_style.apply_to(outcome.to_string()),
            count
        )?;
    }
    writeln!(out, "  {}", style(RULE).dim())?;
    writeln!(
        out,
        "  {} targets in {:.2}s",
        summary.total,
        summary.elapsed.as_secs_f64()
    )?;
    writeln!(out)?;
    Ok(())
}

/// Print every known session.
pub fn print_sessions(sessions: &[SessionRecord]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "{} All Available Reports", style("[*]").green())?;
    if sessions.is_empty() {
        writeln!(out, "  {}", style("No sessions recorded yet.").dim())?;
        return Ok(());
    }

    let width = column_width(sessions.iter().map(|s| s.name.as_str()), "NAME");
    writeln!(
        out,
        "  {:<width$}  {:<20}  {:<24}  {}",
        style("NAME").bold(),
        style("NETWORK").bold(),
        style("PORTS").bold(),
        style("CREATED").bold(),
        width = width
    )?;
    writeln!(out, "  {}", style(RULE).dim())?;
    for session in sessions {
        writeln!(
            out,
            "  {:<width$}  {:<20}  {:<24}  {}",
            session.name,
            session.network,
            truncate_string(&session.ports, 24),
            session.created_at.format("%Y-%m-%d %H:%M:%S"),
            width = width
        )?;
    }
    Ok(())
}

/// Print the result rows of a session.
pub fn print_results(rows: &[ResultRow]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if rows.is_empty() {
        writeln!(out, "  {}", style("No results to display.").dim())?;
        return Ok(());
    }

    let width = column_width(rows.iter().map(|r| r.url.as_str()), "URL");
    writeln!(
        out,
        "  {:<width$}  {:>6}  {:<40}  {}",
        style("URL").bold(),
        style("STATUS").bold(),
        style("TITLE").bold(),
        style("ERROR").bold(),
        width = width
    )?;
    writeln!(out, "  {}", style(RULE).dim())?;

    for row in rows {
        let status = match row.status_code {
            Some(code) if code < 400 => style(code.to_string()).green().bold(),
            Some(code) => style(code.to_string()).yellow(),
            None => style("-".to_string()).dim(),
        };
        let title = row
            .page_title
            .as_deref()
            .map(|t| truncate_string(t, 40))
            .unwrap_or_default();
        let error = row
            .last_error
            .as_deref()
            .map(|e| truncate_string(e, 60))
            .unwrap_or_default();

        writeln!(
            out,
            "  {:<width$}  {:>6}  {:<40}  {}",
            row.url,
            status,
            title,
            style(error).red(),
            width = width
        )?;
    }
    Ok(())
}

/// Print headers and links captured for one url.
pub fn print_target_data(url: &str, headers: &[HeaderRow], links: &[LinkRow]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !headers.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "{} Response Headers for URL {}",
            style("[*]").green(),
            style(url).bold()
        )?;
        writeln!(out)?;
        let width = column_width(headers.iter().map(|h| h.name.as_str()), "NAME");
        for header in headers {
            writeln!(
                out,
                "  {:<width$}  {}",
                style(&header.name).cyan(),
                header.value,
                width = width
            )?;
        }
    }

    if !links.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "{} HTML Links for URL {}",
            style("[*]").green(),
            style(url).bold()
        )?;
        writeln!(out)?;
        for link in links {
            match &link.link {
                Some(href) => writeln!(out, "  {}", href)?,
                None => writeln!(out, "  {}", style("(no href)").dim())?,
            }
        }
    }

    Ok(())
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>, header: &str) -> usize {
    values
        .map(|v| v.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0)
}

/// Truncate a string to a maximum number of characters, adding an ellipsis.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
