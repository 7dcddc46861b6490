//! Renewal-status report rows and their renderings

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tlskeeper_common::{format_duration, AppName, SignedDuration};

use super::scheduler::RenewalWindow;

/// One managed application's renewal status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenewalStatus {
    pub app: AppName,
    pub expiry: DateTime<Utc>,
    pub grace_period: SignedDuration,
    pub time_to_expiry: SignedDuration,
    pub time_to_renewal: SignedDuration,
}

impl RenewalStatus {
    pub fn new(app: AppName, window: RenewalWindow) -> Self {
        Self {
            app,
            expiry: window.expiry,
            grace_period: window.grace_period,
            time_to_expiry: window.time_to_expiry,
            time_to_renewal: window.time_to_renewal,
        }
    }

    pub fn renewal_due(&self) -> bool {
        self.time_to_renewal.is_overdue()
    }

    /// Tab-separated row: app, expiry epoch seconds, grace period, time to
    /// expiry, time to renewal (all in seconds)
    pub fn tsv_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.app,
            self.expiry.timestamp(),
            self.grace_period.seconds(),
            self.time_to_expiry.seconds(),
            self.time_to_renewal.seconds()
        )
    }
}

/// One tab-separated line per row
pub fn render_tsv<'a>(rows: impl IntoIterator<Item = &'a RenewalStatus>) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row.tsv_line());
        out.push('\n');
    }
    out
}

const TABLE_HEADER: [&str; 5] = ["APP", "EXPIRES", "GRACE", "EXPIRES IN", "RENEW IN"];

/// Aligned table with RFC 3339 expiry and human durations
pub fn render_table<'a>(rows: impl IntoIterator<Item = &'a RenewalStatus>) -> String {
    let cells: Vec<[String; 5]> = rows
        .into_iter()
        .map(|row| {
            [
                row.app.to_string(),
                row.expiry.to_rfc3339_opts(SecondsFormat::Secs, true),
                duration_cell(row.grace_period),
                duration_cell(row.time_to_expiry),
                duration_cell(row.time_to_renewal),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADER.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    write_table_line(&mut out, &TABLE_HEADER, &widths);
    for row in &cells {
        write_table_line(&mut out, row, &widths);
    }
    out
}

fn duration_cell(duration: SignedDuration) -> String {
    match format_duration(duration.seconds()) {
        text if text.is_empty() => "now".to_string(),
        text => text,
    }
}

fn write_table_line<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize]) {
    let mut line = String::new();
    for (cell, width) in cells.iter().zip(widths) {
        let _ = write!(line, "{:<width$}  ", cell.as_ref(), width = *width);
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// JSON array of rows
pub fn render_json<'a>(
    rows: impl IntoIterator<Item = &'a RenewalStatus>,
) -> Result<String, serde_json::Error> {
    let rows: Vec<&RenewalStatus> = rows.into_iter().collect();
    serde_json::to_string_pretty(&rows)
}
