//! Output formatting utilities for the CLI
//!
//! Renders the forwarded ports of a session as a table or as JSON, and
//! prints colored status messages.

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use kf_core::{ForwardedPort, ResolvedTarget};

/// One open port forward as reported to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct ForwardEntry {
    #[tabled(rename = "TARGET")]
    pub target: String,
    #[tabled(rename = "LOCAL")]
    pub local: u16,
    #[tabled(rename = "REMOTE")]
    pub remote: u16,
}

/// Pair resolved targets with their assigned ports, in request order
pub fn forward_entries(targets: &[ResolvedTarget], ports: &[ForwardedPort]) -> Vec<ForwardEntry> {
    targets
        .iter()
        .zip(ports)
        .map(|(target, port)| ForwardEntry {
            target: target.describe(),
            local: port.local,
            remote: port.remote,
        })
        .collect()
}

/// Format forwards as an ASCII table
pub fn format_forwards(entries: &[ForwardEntry]) -> String {
    if entries.is_empty() {
        return "No ports forwarded".to_string();
    }
    Table::new(entries).with(Style::rounded()).to_string()
}

/// Format forwards as pretty-printed JSON
pub fn format_forwards_json(entries: &[ForwardEntry]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(entries)
}

fn print_tagged(mut out: impl std::io::Write, color: Color, tag: &str, msg: &str) {
    let _ = crossterm::execute!(
        out,
        SetForegroundColor(color),
        Print(tag),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a success message in green to stdout
pub fn print_success(msg: &str) {
    print_tagged(std::io::stdout(), Color::Green, "✓ ", msg);
}

/// Print an error message in red to stderr
pub fn print_error(msg: &str) {
    print_tagged(std::io::stderr(), Color::Red, "✗ ", msg);
}

/// Print a warning in yellow to stderr
pub fn print_warning(msg: &str) {
    print_tagged(std::io::stderr(), Color::Yellow, "⚠ ", msg);
}

/// Print an informational message in cyan to stdout
pub fn print_info(msg: &str) {
    print_tagged(std::io::stdout(), Color::Cyan, "ℹ ", msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(index: usize, instance: &str) -> ResolvedTarget {
        ResolvedTarget {
            index,
            instance: instance.into(),
            namespace: "default".into(),
            origin: format!("pod default/{}", instance),
            local_port: 0,
            remote_port: 80,
        }
    }

    #[test]
    fn test_entries_follow_request_order() {
        let targets = vec![target(0, "web-1"), target(1, "api-0")];
        let ports = vec![
            ForwardedPort { local: 41000, remote: 80 },
            ForwardedPort { local: 41001, remote: 80 },
        ];

        let entries = forward_entries(&targets, &ports);
        assert_eq!(entries[0].target, "default/web-1");
        assert_eq!(entries[0].local, 41000);
        assert_eq!(entries[1].target, "default/api-0");
        assert_eq!(entries[1].local, 41001);
    }

    #[test]
    fn test_format_forwards_table() {
        let entries = forward_entries(
            &[target(0, "web-1")],
            &[ForwardedPort { local: 41000, remote: 80 }],
        );
        let table = format_forwards(&entries);
        assert!(table.contains("TARGET"));
        assert!(table.contains("default/web-1"));
        assert!(table.contains("41000"));
        assert_eq!(format_forwards(&[]), "No ports forwarded");
    }

    #[test]
    fn test_format_forwards_json() {
        let entries = forward_entries(
            &[target(0, "web-1")],
            &[ForwardedPort { local: 41000, remote: 80 }],
        );
        let json: serde_json::Value =
            serde_json::from_str(&format_forwards_json(&entries).unwrap()).unwrap();
        assert_eq!(json[0]["target"], "default/web-1");
        assert_eq!(json[0]["local"], 41000);
        assert_eq!(json[0]["remote"], 80);
    }
}
