//! Presentation of command results.
//!
//! Every printer takes an explicit [`OutputFormat`]; JSON goes to stdout as a
//! single document, human output is aligned text or a table.

use comfy_table::Table;
use routerctl_core::{ConnectedDevice, Error, FilteredHost, Information, MacFilterTable};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json { OutputFormat::Json } else { OutputFormat::Human }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    let json = serde_json::to_value(value).unwrap_or_default();
    println!("{}", json);
}

pub fn print_information(info: &Information, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(info),
        OutputFormat::Human => println!("{}", render_information(info)),
    }
}

pub fn render_information(info: &Information) -> String {
    let fields = info.fields();
    let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0) + 1;
    fields
        .iter()
        .map(|(label, value)| format!("{:<width$} {}", format!("{}:", label), value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints connected devices. Inactive devices are only shown with `all`.
pub fn print_devices(devices: &[ConnectedDevice], all: bool, format: OutputFormat) {
    let mut devices: Vec<&ConnectedDevice> =
        devices.iter().filter(|d| all || d.active).collect();
    // inactive first so the live hosts end up at the bottom of the table
    devices.sort_by_key(|d| d.active);

    match format {
        OutputFormat::Json => print_json(&devices),
        OutputFormat::Human => println!("{}", render_devices(&devices)),
    }
}

pub fn render_devices(devices: &[&ConnectedDevice]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Name", "Active", "Interface", "IP Address", "MAC Address"]);
    for device in devices {
        table.add_row(vec![
            device.name.clone(),
            if device.active { "✓" } else { "x" }.to_string(),
            device.interface.clone(),
            device.ip_address.clone(),
            device.mac_address.clone(),
        ]);
    }
    table.to_string()
}

pub fn print_mac_filters(tables: &[MacFilterTable], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(tables),
        OutputFormat::Human => println!("{}", render_mac_filters(tables)),
    }
}

/// Renders the SSIDs that have at least one filtered host.
pub fn render_mac_filters(tables: &[MacFilterTable]) -> String {
    let render_hosts = |title: &str, hosts: &[FilteredHost]| {
        let mut out = format!("{}:", title);
        for host in hosts {
            out.push_str(&format!("\n  {}\t {}", host.name, host.mac_address));
        }
        out
    };

    tables
        .iter()
        .filter(|table| !table.is_empty())
        .map(|table| {
            let mut out = format!("SSID: {}\n", table.ssid);
            out.push_str(&render_hosts("Blacklisted users", &table.blacklisted));
            if !table.whitelisted.is_empty() {
                out.push('\n');
                out.push_str(&render_hosts("Whitelisted users", &table.whitelisted));
            }
            out
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prints an informational status such as `RESTARTING`.
pub fn print_info(code: &str, message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", json!({ "info": code, "message": message })),
        OutputFormat::Human => println!("{}", message),
    }
}

pub fn error_payload(err: &Error) -> serde_json::Value {
    json!({ "error": err.kind(), "message": err.to_string() })
}

/// Prints an error. JSON errors go to stdout so scripts can parse them.
pub fn print_error(err: &Error, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", error_payload(err)),
        OutputFormat::Human => eprintln!("Error: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_payload() {
        let payload = error_payload(&Error::ManyLoginAttempts(3));
        assert_eq!(payload["error"], "MANY_LOGIN_ATTEMPTS");
        assert!(payload["message"].as_str().unwrap().contains("3 consecutive attempts"));

        let payload = error_payload(&Error::GatewayNotFound);
        assert_eq!(payload["error"], "GATEWAY_ERROR");
    }

    #[test]
    fn test_render_information_aligns_labels() {
        let info = Information {
            device_name: "B612".into(),
            band: "3".into(),
            ..Default::default()
        };
        let rendered = render_information(&info);
        let lines: Vec<_> = rendered.lines().collect();

        assert_eq!(lines.len(), 20);
        assert!(lines[0].starts_with("Device Name:"));
        assert!(lines[0].ends_with(" B612"));
        let column = lines[0].find("B612").unwrap();
        assert_eq!(lines[19].find('3'), Some(column));
    }

    #[test]
    fn test_render_devices_table() {
        let device = ConnectedDevice {
            name: "laptop".into(),
            ip_address: "192.168.8.100".into(),
            active: true,
            ..Default::default()
        };
        let rendered = render_devices(&[&device]);
        assert!(rendered.contains("Name"));
        assert!(rendered.contains("laptop"));
        assert!(rendered.contains("192.168.8.100"));
    }

    #[test]
    fn test_render_mac_filters_skips_empty_ssids() {
        let tables = vec![
            MacFilterTable {
                ssid: 0,
                blacklisted: vec![FilteredHost {
                    name: "tv".into(),
                    mac_address: "AA:AA".into(),
                }],
                whitelisted: vec![],
            },
            MacFilterTable {
                ssid: 1,
                ..Default::default()
            },
        ];
        let rendered = render_mac_filters(&tables);
        assert_eq!(rendered, "SSID: 0\nBlacklisted users:\n  tv\t AA:AA");
    }

    #[test]
    fn test_output_format_from_flag() {
        assert_eq!(OutputFormat::from_json_flag(true), OutputFormat::Json);
        assert_eq!(OutputFormat::from_json_flag(false), OutputFormat::Human);
    }
}
