//! Reads the target file.
//!
//! Every non-empty line has the form `ADDRESS -> [p1,p2,...]`. Parsing is all
//! or nothing: the first malformed line aborts the whole read and no partial
//! map is returned.
//!
//! Ports are kept as the raw strings found between the commas. They are not
//! trimmed and, unless strict port checking is requested, not validated.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use itertools::Itertools;
use log::debug;

use crate::error::{Error, Result};
use crate::input::parse_single_port;

/// Separates the address from its port list.
pub const SEPARATOR: &str = " -> ";

/// One address and the ports requested for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// The address exactly as written, minus surrounding whitespace.
    pub address: String,
    /// Raw port strings in file order.
    pub ports: Vec<String>,
}

impl Target {
    /// Ports in the comma separated form the scanner expects.
    pub fn joined_ports(&self) -> String {
        self.ports.join(",")
    }
}

/// Address to ports mapping with unique addresses.
///
/// Iteration follows the order in which addresses first appeared. Inserting
/// an address that is already present replaces its ports in place.
#[derive(Debug, Default, Clone)]
pub struct TargetMap {
    targets: Vec<Target>,
    index: HashMap<String, usize>,
}

impl TargetMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the ports of `address`, returning the ports it
    /// replaced.
    pub fn insert(&mut self, address: String, ports: Vec<String>) -> Option<Vec<String>> {
        if let Some(&slot) = self.index.get(&address) {
            return Some(std::mem::replace(&mut self.targets[slot].ports, ports));
        }

        self.index.insert(address.clone(), self.targets.len());
        self.targets.push(Target { address, ports });
        None
    }

    /// Ports recorded for `address`, if any.
    pub fn get(&self, address: &str) -> Option<&[String]> {
        self.index
            .get(address)
            .map(|&slot| self.targets[slot].ports.as_slice())
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// True when no address was read.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets in first-seen order.
    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        self.targets.iter()
    }
}

impl<'a> IntoIterator for &'a TargetMap {
    type Item = &'a Target;
    type IntoIter = std::slice::Iter<'a, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Opens and parses a target file.
///
/// ```rust,no_run
/// # use scanfeed::targets::parse_targets;
/// # use std::path::Path;
/// let targets = parse_targets(Path::new("targets.txt"), false)?;
/// for target in &targets {
///     println!("{} -> {}", target.address, target.joined_ports());
/// }
/// # Ok::<(), scanfeed::error::Error>(())
/// ```
pub fn parse_targets(path: &Path, strict_ports: bool) -> Result<TargetMap> {
    let file = File::open(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;

    read_targets(BufReader::new(file), path, strict_ports)
}

/// Parses target lines from any buffered reader. `path` only labels errors.
pub fn read_targets<R: BufRead>(reader: R, path: &Path, strict_ports: bool) -> Result<TargetMap> {
    let mut targets = TargetMap::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if line.is_empty() {
            continue;
        }

        let (address, ports) = parse_line(&line, idx + 1)?;
        if strict_ports {
            validate_ports(&address, &ports)?;
        }

        if targets.insert(address.clone(), ports).is_some() {
            debug!("Address {} repeated on line {}, replacing earlier ports", address, idx + 1);
        }
    }

    debug!("Parsed {} targets from {}", targets.len(), path.display());
    Ok(targets)
}

/// Splits one line into its address and raw port strings.
pub fn parse_line(line: &str, line_number: usize) -> Result<(String, Vec<String>)> {
    let Some((address, ports)) = line.split(SEPARATOR).collect_tuple() else {
        return Err(Error::MalformedLine {
            line_number,
            line: line.to_owned(),
        });
    };

    let ports = ports
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(str::to_owned)
        .collect();

    Ok((address.trim().to_owned(), ports))
}

fn validate_ports(address: &str, ports: &[String]) -> Result<()> {
    for port in ports {
        parse_single_port(port).map_err(|reason| Error::InvalidPort {
            address: address.to_owned(),
            port: port.clone(),
            reason,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_line, parse_targets, read_targets, TargetMap};
    use crate::error::Error;
    use std::io::Cursor;
    use std::path::Path;

    fn read(input: &str) -> Result<TargetMap, Error> {
        read_targets(Cursor::new(input), Path::new("inline"), false)
    }

    #[test]
    fn parses_ports_in_order() {
        let targets = read("8.8.8.8 -> [53,443,80]\n").unwrap();

        assert_eq!(targets.len(), 1);
        assert_eq!(targets.get("8.8.8.8").unwrap(), ["53", "443", "80"]);
    }

    #[test]
    fn trims_address_but_not_ports() {
        let (address, ports) = parse_line("  1.1.1.1 -> [22, 80]", 1).unwrap();

        assert_eq!(address, "1.1.1.1");
        assert_eq!(ports, vec!["22".to_owned(), " 80".to_owned()]);
    }

    #[test]
    fn strips_every_surrounding_bracket() {
        let (_, ports) = parse_line("1.1.1.1 -> [[22]]", 1).unwrap();
        assert_eq!(ports, vec!["22".to_owned()]);
    }

    #[test]
    fn empty_port_list_yields_one_empty_port() {
        let (_, ports) = parse_line("1.1.1.1 -> []", 1).unwrap();
        assert_eq!(ports, vec![String::new()]);
    }

    #[test]
    fn missing_separator_is_fatal() {
        let err = read("8.8.8.8 -> [53]\n8.8.4.4 [53]\n1.1.1.1 -> [80]\n").unwrap_err();

        match err {
            Error::MalformedLine { line_number, line } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "8.8.4.4 [53]");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn repeated_separator_is_fatal() {
        assert!(parse_line("1.1.1.1 -> [1] -> [2]", 7).is_err());
    }

    #[test]
    fn later_duplicate_overwrites_earlier() {
        let targets = read("8.8.8.8 -> [53]\n1.1.1.1 -> [80]\n8.8.8.8 -> [22,23]\n").unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets.get("8.8.8.8").unwrap(), ["22", "23"]);
        let order: Vec<_> = targets.iter().map(|t| t.address.as_str()).collect();
        assert_eq!(order, ["8.8.8.8", "1.1.1.1"]);
    }

    #[test]
    fn empty_lines_and_crlf_are_tolerated() {
        let targets = read("\n8.8.8.8 -> [53]\r\n\r\n1.1.1.1 -> [80]\r\n").unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets.get("1.1.1.1").unwrap(), ["80"]);
    }

    #[test]
    fn whitespace_only_line_is_fatal() {
        let result = read("8.8.8.8 -> [53]\n   \n1.1.1.1 -> [80]\n");

        assert!(matches!(
            result,
            Err(Error::MalformedLine { line_number: 2, ref line }) if line == "   "
        ));
    }

    #[test]
    fn invalid_utf8_is_a_read_error() {
        let result = read_targets(
            Cursor::new(&b"8.8.8.8 -> [5\xff3]\n"[..]),
            Path::new("inline"),
            false,
        );

        assert!(matches!(result, Err(Error::Read { .. })));
    }

    #[test]
    fn strict_ports_rejects_non_numeric() {
        let err = read_targets(
            Cursor::new("8.8.8.8 -> [53,http]\n"),
            Path::new("inline"),
            true,
        )
        .unwrap_err();

        assert!(matches!(err, Error::InvalidPort { ref port, .. } if port == "http"));
    }

    #[test]
    fn strict_ports_accepts_valid_ports() {
        let targets = read_targets(
            Cursor::new("8.8.8.8 -> [1,65535]\n"),
            Path::new("inline"),
            true,
        )
        .unwrap();
        assert_eq!(targets.get("8.8.8.8").unwrap(), ["1", "65535"]);
    }

    #[test]
    fn parse_fixture_file() {
        let targets = parse_targets(Path::new("fixtures/targets.txt"), false).unwrap();

        assert_eq!(targets.len(), 5);
        assert_eq!(targets.get("203.0.113.5").unwrap(), ["22", "80", "443"]);
    }

    #[test]
    fn parse_malformed_fixture_file() {
        let result = parse_targets(Path::new("fixtures/malformed_targets.txt"), false);
        assert!(matches!(result, Err(Error::MalformedLine { line_number: 2, .. })));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = parse_targets(Path::new("fixtures/does_not_exist.txt"), false);
        assert!(matches!(result, Err(Error::Read { .. })));
    }
}
