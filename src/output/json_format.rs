//! JSON output formatting.

use super::SessionReport;
use std::io::{self, Write};

/// Write a session report as pretty-printed JSON.
pub fn write_json<W: Write>(mut writer: W, report: &SessionReport) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)
}

/// Print a session report in JSON format.
pub fn print_json(report: &SessionReport) -> io::Result<()> {
    let stdout = io::stdout();
    write_json(stdout.lock(), report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LinkRow, ResultRow, SessionRecord};
    use chrono::Utc;

    #[test]
    fn test_json_shape() {
        let now = Utc::now();
        let report = SessionReport {
            session: SessionRecord {
                name: "s".into(),
                network: "10.0.0.0/30".into(),
                ports: "80".into(),
                created_at: now,
            },
            results: vec![ResultRow {
                session: "s".into(),
                url: "http://10.0.0.2:80".into(),
                status_code: None,
                page_title: None,
                last_error: Some("timed out".into()),
                scanned_at: now,
            }],
            headers: vec![],
            links: vec![LinkRow {
                url: "http://10.0.0.1:80".into(),
                link: None,
            }],
        };

        let mut buf = Vec::new();
        write_json(&mut buf, &report).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value["session"]["name"], "s");
        assert!(value["results"][0]["status_code"].is_null());
        assert_eq!(value["results"][0]["last_error"], "timed out");
        assert!(value["links"][0]["link"].is_null());
    }
}
