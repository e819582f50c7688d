//! Default gateway discovery.
//!
//! When no host is given the CLI talks to the machine's default IPv4
//! gateway, which for a home network is almost always the router.

use std::net::Ipv4Addr;

use tracing::debug;

use crate::error::Error;

/// Kernel IPv4 routing table.
pub const ROUTE_TABLE_PATH: &str = "/proc/net/route";

const RTF_GATEWAY: u16 = 0x2;
const DEFAULT_DESTINATION: &str = "00000000";

/// Returns the default IPv4 gateway of this machine.
///
/// # Errors
///
/// Returns [`Error::GatewayNotFound`] if the routing table cannot be read or
/// has no default route.
pub fn default_gateway() -> Result<Ipv4Addr, Error> {
    let table = std::fs::read_to_string(ROUTE_TABLE_PATH).map_err(|e| {
        debug!(path = ROUTE_TABLE_PATH, error = %e, "Failed to read routing table");
        Error::GatewayNotFound
    })?;

    let gateway = parse_route_table(&table).ok_or(Error::GatewayNotFound)?;
    debug!(%gateway, "Found default gateway");
    Ok(gateway)
}

/// Finds the default gateway in the contents of `/proc/net/route`.
///
/// Addresses in the table are little-endian hex.
///
/// ```
/// use std::net::Ipv4Addr;
/// use routerctl_core::gateway::parse_route_table;
///
/// let table = "Iface\tDestination\tGateway\tFlags\n\
///              eth0\t00000000\t0101A8C0\t0003\n";
/// assert_eq!(parse_route_table(table), Some(Ipv4Addr::new(192, 168, 1, 1)));
/// ```
pub fn parse_route_table(table: &str) -> Option<Ipv4Addr> {
    table.lines().skip(1).find_map(|line| {
        let mut columns = line.split_whitespace().skip(1);
        let destination = columns.next()?;
        let gateway = columns.next()?;
        let flags = u16::from_str_radix(columns.next()?, 16).ok()?;

        if destination != DEFAULT_DESTINATION || flags & RTF_GATEWAY == 0 {
            return None;
        }
        let raw = u32::from_str_radix(gateway, 16).ok()?;
        Some(Ipv4Addr::from(raw.to_le_bytes()))
    })
}
