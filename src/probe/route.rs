//! Default gateway lookup from the Linux routing table.
//!
//! `/proc/net/route` lists one route per line with hex-encoded fields. The
//! gateway column holds the raw network-order address printed as a
//! host-order integer, so it is converted back with `u32::from_be`.

use std::net::Ipv4Addr;

use crate::error::{BerthError, LookupError};

/// Destination column value of the default route.
const DEFAULT_DESTINATION: &str = "00000000";

/// `RTF_GATEWAY` flag: the route uses a gateway.
const RTF_GATEWAY: u16 = 0x0002;

const DESTINATION_COLUMN: usize = 1;
const GATEWAY_COLUMN: usize = 2;
const FLAGS_COLUMN: usize = 3;

/// Return the gateway of the first default route in `table`.
///
/// # Errors
///
/// Returns `LookupError::NoDefaultRoute` when no well-formed default route
/// with a gateway is present.
pub(super) fn parse_default_gateway(table: &str) -> Result<Ipv4Addr, BerthError> {
    table
        .lines()
        .skip(1)
        .find_map(default_route_gateway)
        .ok_or_else(|| BerthError::from(LookupError::NoDefaultRoute))
}

fn default_route_gateway(line: &str) -> Option<Ipv4Addr> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    let destination = columns.get(DESTINATION_COLUMN)?;
    let gateway = columns.get(GATEWAY_COLUMN)?;
    let flags = columns.get(FLAGS_COLUMN)?;

    if *destination != DEFAULT_DESTINATION {
        return None;
    }

    let flag_bits = u16::from_str_radix(flags, 16).ok()?;
    if flag_bits & RTF_GATEWAY == 0 {
        return None;
    }

    let raw = u32::from_str_radix(gateway, 16).ok()?;
    Some(Ipv4Addr::from(u32::from_be(raw)))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const HEADER: &str =
        "Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT";

    fn table(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[cfg(target_endian = "little")]
    #[rstest]
    fn parses_docker_bridge_gateway() {
        let routes = table(&[
            "eth0\t00000000\t010011AC\t0003\t0\t0\t0\t00000000\t0\t0\t0",
            "eth0\t000011AC\t00000000\t0001\t0\t0\t0\t0000FFFF\t0\t0\t0",
        ]);

        let gateway = parse_default_gateway(&routes).expect("default route should be found");

        assert_eq!(gateway, Ipv4Addr::new(172, 17, 0, 1));
    }

    #[cfg(target_endian = "little")]
    #[rstest]
    fn skips_default_rows_without_gateway_flag() {
        let routes = table(&[
            "tun0\t00000000\t00000000\t0001\t0\t0\t0\t00000000\t0\t0\t0",
            "eth0\t00000000\t0101A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0",
        ]);

        let gateway = parse_default_gateway(&routes).expect("default route should be found");

        assert_eq!(gateway, Ipv4Addr::new(192, 168, 1, 1));
    }

    #[rstest]
    #[case::header_only(table(&[]))]
    #[case::no_default(table(&["eth0\t000011AC\t00000000\t0001\t0\t0\t0\t0000FFFF\t0\t0\t0"]))]
    #[case::truncated_row(table(&["eth0\t00000000"]))]
    #[case::garbage_gateway(table(&["eth0\t00000000\tZZZZZZZZ\t0003\t0\t0\t0\t00000000\t0\t0\t0"]))]
    fn missing_default_route_is_reported(#[case] routes: String) {
        let result = parse_default_gateway(&routes);

        assert!(
            matches!(result, Err(BerthError::Lookup(LookupError::NoDefaultRoute))),
            "expected no default route, got: {result:?}"
        );
    }
}
