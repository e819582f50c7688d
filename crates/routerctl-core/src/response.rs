//! Typed records decoded from router XML responses.
//!
//! The router answers every query with a loosely structured `<response>`
//! document. The types here pick the fields the CLI cares about and default
//! anything missing, so a firmware that drops a field still decodes.
//!
//! # Example
//!
//! ```
//! use routerctl_core::{response::Information, xml};
//!
//! let doc = xml::parse("<response><DeviceName>B612</DeviceName><cqi0>11</cqi0></response>")
//!     .unwrap();
//! let info = Information::from_element(&doc);
//! assert_eq!(info.device_name, "B612");
//! assert_eq!(info.cqi, "11");
//! ```

use serde::Serialize;
use xmltree::Element;

use crate::xml::{child_elements, child_text, child_text_or_default};

/// Device and radio information.
///
/// Built from the merge of `/api/device/information` and `/api/device/signal`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Information {
    pub device_name: String,
    pub serial_number: String,
    pub imei: String,
    pub imsi: String,
    pub hardware_version: String,
    pub software_version: String,
    pub web_ui_version: String,
    /// Version of the configuration file (`iniversion`).
    pub config_file_version: String,
    pub lan_mac_address: String,
    pub wan_ip_address: String,
    pub wan_ipv6_address: String,
    pub cell_id: String,
    /// Channel quality indicators, space separated.
    pub cqi: String,
    pub rsrq: String,
    pub rsrp: String,
    pub rssi: String,
    pub sinr: String,
    pub wireless_transmit_power: String,
    pub plmn: String,
    pub band: String,
}

impl Information {
    /// Decodes a merged information document.
    pub fn from_element(element: &Element) -> Self {
        let field = |name: &str| child_text_or_default(element, name);

        // cqi0, cqi1, ... up to the first gap
        let cqi = (0..)
            .map_while(|i| child_text(element, &format!("cqi{}", i)))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            device_name: field("DeviceName"),
            serial_number: field("SerialNumber"),
            imei: field("Imei"),
            imsi: field("Imsi"),
            hardware_version: field("HardwareVersion"),
            software_version: field("SoftwareVersion"),
            web_ui_version: field("WebUIVersion"),
            config_file_version: field("iniversion"),
            lan_mac_address: field("MacAddress1"),
            wan_ip_address: field("WanIPAddress"),
            wan_ipv6_address: field("WanIPv6Address"),
            cell_id: field("cell_id"),
            cqi,
            rsrq: field("rsrq"),
            rsrp: field("rsrp"),
            rssi: field("rssi"),
            sinr: field("sinr"),
            wireless_transmit_power: field("txpower"),
            plmn: field("plmn"),
            band: field("band"),
        }
    }

    /// Returns label/value pairs in display order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Device Name", self.device_name.as_str()),
            ("Serial Number", self.serial_number.as_str()),
            ("IMEI", self.imei.as_str()),
            ("IMSI", self.imsi.as_str()),
            ("Hardware Version", self.hardware_version.as_str()),
            ("Software Version", self.software_version.as_str()),
            ("Web UI Version", self.web_ui_version.as_str()),
            ("Configuration File Version", self.config_file_version.as_str()),
            ("LAN MAC Address", self.lan_mac_address.as_str()),
            ("WAN IP Address", self.wan_ip_address.as_str()),
            ("WAN IPv6 Address", self.wan_ipv6_address.as_str()),
            ("Cell ID", self.cell_id.as_str()),
            ("CQI", self.cqi.as_str()),
            ("RSRQ", self.rsrq.as_str()),
            ("RSRP", self.rsrp.as_str()),
            ("RSSI", self.rssi.as_str()),
            ("SINR", self.sinr.as_str()),
            ("Wireless Transmit Power", self.wireless_transmit_power.as_str()),
            ("PLMN", self.plmn.as_str()),
            ("Band", self.band.as_str()),
        ]
    }
}

/// A host known to the router's LAN side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectedDevice {
    pub name: String,
    /// First address of the host; the router may report several.
    pub ip_address: String,
    pub mac_address: String,
    /// Interface the host is attached through (`Ethernet`, `Wireless`).
    pub interface: String,
    /// Seconds since the host associated.
    pub uptime: u64,
    pub active: bool,
    /// Whether the host is the machine issuing the request.
    pub is_local: bool,
}

impl ConnectedDevice {
    /// Decodes a single `<Host>` element.
    pub fn from_element(host: &Element) -> Self {
        let name = child_text(host, "ActualName")
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| child_text_or_default(host, "HostName"));

        let ip_address = child_text_or_default(host, "IpAddress")
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        Self {
            name,
            ip_address,
            mac_address: child_text_or_default(host, "MacAddress"),
            interface: child_text_or_default(host, "InterfaceType"),
            uptime: child_text(host, "AssociatedTime")
                .and_then(|t| t.parse().ok())
                .unwrap_or(0),
            active: flag(host, "Active"),
            is_local: flag(host, "isLocalDevice"),
        }
    }

    /// Decodes every `Hosts/Host` entry of a host list response.
    pub fn list_from_element(element: &Element) -> Vec<Self> {
        element
            .get_child("Hosts")
            .map(|hosts| {
                child_elements(hosts)
                    .filter(|e| e.name == "Host")
                    .map(Self::from_element)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn flag(element: &Element, name: &str) -> bool {
    child_text(element, name).is_some_and(|v| v == "1")
}

/// A MAC address listed in a filter table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilteredHost {
    pub name: String,
    pub mac_address: String,
}

/// Blacklist and whitelist of one SSID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MacFilterTable {
    pub ssid: u32,
    pub blacklisted: Vec<FilteredHost>,
    pub whitelisted: Vec<FilteredHost>,
}

const FILTER_MAC_PREFIX: &str = "WifiMacFilterMac";
const FILTER_HOSTNAME_PREFIX: &str = "wifihostname";

impl MacFilterTable {
    /// Decodes a single `<Ssid>` element.
    pub fn from_element(ssid: &Element) -> Self {
        Self {
            ssid: child_text(ssid, "Index")
                .and_then(|i| i.parse().ok())
                .unwrap_or(0),
            blacklisted: filtered_hosts(ssid, "wifimacblacklist"),
            whitelisted: filtered_hosts(ssid, "wifimacwhitelist"),
        }
    }

    /// Decodes every `Ssids/Ssid` entry of a MAC filter response.
    pub fn list_from_element(element: &Element) -> Vec<Self> {
        element
            .get_child("Ssids")
            .map(|ssids| {
                child_elements(ssids)
                    .filter(|e| e.name == "Ssid")
                    .map(Self::from_element)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns `true` when neither list has entries.
    pub fn is_empty(&self) -> bool {
        self.blacklisted.is_empty() && self.whitelisted.is_empty()
    }
}

fn filtered_hosts(ssid: &Element, list: &str) -> Vec<FilteredHost> {
    let Some(list) = ssid.get_child(list) else {
        return Vec::new();
    };

    child_elements(list)
        .filter_map(|item| {
            let index = item.name.strip_prefix(FILTER_MAC_PREFIX)?;
            let mac_address = item.get_text().map(|t| t.trim().to_string()).unwrap_or_default();
            if mac_address.is_empty() {
                return None;
            }
            let hostname = format!("{}{}", FILTER_HOSTNAME_PREFIX, index);
            let name = child_text(list, &hostname)
                .or_else(|| child_text(ssid, &hostname))
                .unwrap_or_default();
            Some(FilteredHost { name, mac_address })
        })
        .collect()
}
