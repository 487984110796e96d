//! Text and JSON rendering of alerts, history and heartbeats.

use alerta_model::{
    AlertRecord, HeartbeatRecord, HistoryEntry, TimeField, TimeStyle, Timestamps, Tz, DEFAULT_VALUE,
};
use clap::ValueEnum;
use console::Style;
use serde::Deserialize;
use serde_json::Value;
use strum::Display;

pub const NOT_SET: &str = "<not set>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

/// How records are drawn on a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Render {
    pub color: bool,
    pub timezone: Tz,
    pub details: bool,
}

impl Render {
    fn style(&self, severity: &str) -> Option<Style> {
        if !self.color {
            return None;
        }
        let style = Style::new().force_styling(true);
        let style = match severity {
            "critical" => style.red().bright(),
            "major" => style.magenta().bright(),
            "minor" => style.yellow().bright(),
            "warning" => style.cyan().bright(),
            "indeterminate" | "clear" | "normal" | "informational" | "ok" => style.green().bright(),
            "debug" | "auth" | "unknown" => style.black().bright(),
            _ => return None,
        };
        Some(style)
    }

    fn paint(&self, severity: &str, lines: Vec<String>) -> Vec<String> {
        match self.style(severity) {
            Some(style) => lines.into_iter().map(|line| style.apply_to(line).to_string()).collect(),
            None => lines,
        }
    }

    fn time(&self, record: &impl Timestamps, field: TimeField) -> String {
        record
            .format_time(field, TimeStyle::Local, self.timezone)
            .unwrap_or_else(|_| NOT_SET.to_owned())
    }

    /// Summary line, text line and, with `details`, the full breakdown of one alert.
    pub fn alert(&self, record: &AlertRecord) -> Vec<String> {
        let alert = record.alert();
        let server = record.server();
        let last_receive = TimeStyle::Local.render(&record.latest_time(), self.timezone);
        let mut lines = vec![
            format!(
                "{}|{}|{}|{:>5}|{:<5}|{:<10}|{:<18}|{:>12}|{:>16}|{:>12}",
                record.short_id(),
                last_receive,
                alert.severity(),
                record.duplicate_count(),
                alert.environment(),
                alert.service().join(","),
                alert.resource(),
                alert.group(),
                alert.event(),
                alert.value(),
            ),
            format!("   |{}", alert.text()),
        ];

        if self.details {
            let or_not_set =
                |value: Option<&String>| value.map_or(NOT_SET, String::as_str).to_owned();
            lines.push(format!(
                "    severity   | {} -> {}",
                or_not_set(server.previous_severity.as_ref()),
                alert.severity()
            ));
            lines.push(format!(
                "    trend      | {}",
                or_not_set(server.trend_indication.as_ref())
            ));
            lines.push(format!("    status     | {}", alert.status()));
            lines.push(format!("    resource   | {}", alert.resource()));
            lines.push(format!("    group      | {}", alert.group()));
            lines.push(format!("    event      | {}", alert.event()));
            lines.push(format!("    value      | {}", alert.value()));
            lines.push(format!("    tags       | {}", alert.tags().join(" ")));
            for (key, value) in alert.attributes() {
                let value = value.as_str().map_or_else(|| value.to_string(), str::to_owned);
                lines.push(format!("    {key:<10} | {value}"));
            }
            lines.push(format!(
                "        time created  | {}",
                self.time(record, TimeField::CreateTime)
            ));
            lines.push(format!(
                "        time received | {}",
                self.time(record, TimeField::ReceiveTime)
            ));
            lines.push(format!(
                "        last received | {}",
                self.time(record, TimeField::LastReceiveTime)
            ));
            lines.push(format!("        timeout       | {}s", alert.timeout()));
            lines.push(format!("            alert id     | {}", record.id()));
            lines.push(format!(
                "            last recv id | {}",
                or_not_set(server.last_receive_id.as_ref())
            ));
            lines.push(format!("            environment  | {}", alert.environment()));
            lines.push(format!("            service      | {}", alert.service().join(",")));
            lines.push(format!("            resource     | {}", alert.resource()));
            lines.push(format!("            type         | {}", alert.event_type()));
            lines.push(format!("            repeat       | {}", record.repeat()));
            lines.push(format!("            origin       | {}", alert.origin()));
            lines.push(format!("            correlate    | {}", alert.correlate().join(",")));
        }
        self.paint(alert.severity(), lines)
    }

    /// Lines for a listing. The server returns newest first; listings read oldest first.
    pub fn alerts(&self, records: &[AlertRecord]) -> Vec<String> {
        records.iter().rev().flat_map(|record| self.alert(record)).collect()
    }

    /// Severity changes and status changes are shown as separate lines.
    pub fn history(&self, entries: &[HistoryEntry]) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in entries {
            let updated = TimeStyle::Local.render(&entry.update_time, self.timezone);
            let line = |state: &str, value: &str| {
                format!(
                    "{}|{}|{}|{:<5}|{:<10}|{:<18}|{}|{}|{}|{}",
                    entry.short_id(),
                    updated,
                    state,
                    entry.environment,
                    entry.service.join(","),
                    entry.resource,
                    entry.group,
                    entry.event,
                    value,
                    entry.text,
                )
            };
            let severity = entry.severity.as_deref().unwrap_or_default();
            if entry.is_severity_change() {
                let value = entry.value.as_deref().unwrap_or(DEFAULT_VALUE);
                lines.extend(self.paint(severity, vec![line(severity, value)]));
            }
            if entry.is_status_change() {
                let status = entry.status.as_deref().unwrap_or_default();
                lines.extend(self.paint(severity, vec![line(status, DEFAULT_VALUE)]));
            }
        }
        lines
    }

    pub fn heartbeats(&self, heartbeats: &[HeartbeatRecord]) -> Vec<String> {
        heartbeats
            .iter()
            .map(|heartbeat| {
                format!(
                    "{}|{:<30}|{}|{}|{:>6}s|{}",
                    heartbeat.short_id(),
                    heartbeat.origin(),
                    self.time(heartbeat, TimeField::CreateTime),
                    self.time(heartbeat, TimeField::ReceiveTime),
                    heartbeat.timeout(),
                    heartbeat.tags().join(","),
                )
            })
            .collect()
    }
}

/// The `rawData` of each record, oldest first.
pub fn raw_lines(records: &[AlertRecord]) -> Vec<String> {
    records.iter().rev().map(|record| record.alert().raw_data().to_owned()).collect()
}

pub fn json_list(items: impl IntoIterator<Item = Value>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&items.into_iter().collect::<Vec<_>>())
}

/// The `config` command's table.
pub fn config_table(rows: &[(&'static str, String, String)]) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!("{:<16} {:<30}    {}", "Name", "Value", "Location"),
        format!("{:<16} {:<30}    {}", "----", "-----", "--------"),
    ];
    lines.extend(
        rows.iter().map(|(name, value, source)| format!("{name:<16} {value:<30}    {source}")),
    );
    lines.push(String::new());
    lines
}
