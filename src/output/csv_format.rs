//! CSV output formatting.

use crate::storage::ResultRow;
use std::io::{self, Write};

/// Write result rows as CSV.
pub fn write_csv<W: Write>(writer: W, rows: &[ResultRow]) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(["url", "status_code", "page_title", "last_error", "scanned_at"])?;

    for row in rows {
        wtr.write_record([
            row.url.as_str(),
            &row.status_code.map_or(String::new(), |c| c.to_string()),
            row.page_title.as_deref().unwrap_or(""),
            row.last_error.as_deref().unwrap_or(""),
            &row.scanned_at.to_rfc3339(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Print result rows in CSV format.
pub fn print_csv(rows: &[ResultRow]) -> io::Result<()> {
    let stdout = io::stdout();
    write_csv(stdout.lock(), rows)
}
