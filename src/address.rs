//! Decides which target addresses may be handed to the scanner.
//!
//! Loopback addresses and the RFC 1918 blocks are never scanned. On top of
//! those, users may exclude further CIDRs or single addresses.

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use cidr_utils::cidr::IpCidr;

use crate::error::{Error, Result};

/// Private IPv4 blocks as `(network, prefix length)`.
const PRIVATE_V4_BLOCKS: [(Ipv4Addr, u8); 3] = [
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
];

const _: () = assert!(blocks_are_well_formed(&PRIVATE_V4_BLOCKS));

const fn prefix_mask(len: u8) -> u32 {
    if len == 0 {
        0
    } else {
        u32::MAX << (32 - len)
    }
}

const fn blocks_are_well_formed(blocks: &[(Ipv4Addr, u8)]) -> bool {
    let mut i = 0;
    while i < blocks.len() {
        let (network, len) = blocks[i];
        if len > 32 || u32::from_be_bytes(network.octets()) & !prefix_mask(len) != 0 {
            return false;
        }
        i += 1;
    }
    true
}

fn in_block(ip: Ipv4Addr, (network, len): (Ipv4Addr, u8)) -> bool {
    u32::from(ip) & prefix_mask(len) == u32::from(network)
}

/// Whether an address is routable or must be left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    /// Loopback or inside one of the private blocks.
    Private,
    /// Anything else; eligible for scanning.
    Routable,
}

/// Classifies an address.
///
/// IPv4-mapped IPv6 addresses are judged by the IPv4 address they carry.
///
/// ```rust
/// # use scanfeed::address::{classify, AddressClass};
/// assert_eq!(classify("192.168.1.1".parse().unwrap()), AddressClass::Private);
/// assert_eq!(classify("8.8.8.8".parse().unwrap()), AddressClass::Routable);
/// ```
pub fn classify(ip: IpAddr) -> AddressClass {
    if is_private(ip) {
        AddressClass::Private
    } else {
        AddressClass::Routable
    }
}

/// Returns true for loopback addresses and members of 10.0.0.0/8,
/// 172.16.0.0/12 and 192.168.0.0/16.
pub fn is_private(ip: IpAddr) -> bool {
    let ip = ip.to_canonical();
    if ip.is_loopback() {
        return true;
    }

    match ip {
        IpAddr::V4(v4) => PRIVATE_V4_BLOCKS.iter().any(|&block| in_block(v4, block)),
        IpAddr::V6(_) => false,
    }
}

/// Parses user supplied exclusions. Each entry is a CIDR or a bare address.
pub fn parse_exclusions(exclusions: &[String]) -> Result<Vec<IpCidr>> {
    exclusions
        .iter()
        .map(|exclusion| {
            IpCidr::from_str(exclusion.trim()).map_err(|_| {
                Error::Config(format!(
                    "Invalid excluded address {exclusion:?}, expected a CIDR or an IP address"
                ))
            })
        })
        .collect()
}

/// Returns true if `ip` falls inside any of the exclusions.
pub fn is_excluded(ip: IpAddr, exclusions: &[IpCidr]) -> bool {
    let ip = ip.to_canonical();
    exclusions.iter().any(|cidr| cidr.contains(&ip))
}
