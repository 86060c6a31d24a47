//! This crate exposes the internal functionality of scanfeed, a small driver
//! that feeds per-host port lists into [Nmap](https://nmap.org).
//!
//! Port discovery tools usually report their findings as one line per host:
//!
//! ```text
//! 203.0.113.5 -> [22,80,443]
//! 198.51.100.7 -> [25,110]
//! ```
//!
//! scanfeed reads such a file, drops private and loopback addresses as well
//! as hosts with an unreasonable number of ports, and runs one Nmap service
//! scan per remaining host. Each scan writes its XML report to
//! `<output>/<address>.xml`.
//!
//! ## Architecture Overview
//!
//! A run is strictly sequential:
//!
//! 1. **Input Processing**: [`input::Opts`] and the optional TOML
//!    [`input::Config`] are merged and resolved into one [`input::RunConfig`]
//! 2. **Parsing**: [`targets::parse_targets`] turns the target file into a
//!    [`targets::TargetMap`]; the first malformed line aborts the run
//! 3. **Classification**: [`address::classify`] separates private addresses
//!    from routable ones
//! 4. **Dispatch**: [`dispatch::Dispatcher`] renders one Nmap command per
//!    eligible host and runs it through a [`dispatch::Runner`]
//!
//! There is no concurrency. Each Nmap process runs to completion before the
//! next host is considered, and the first Nmap failure stops the run.
//!
//! ## Library Usage
//!
//! ```rust
//! use std::io::Cursor;
//! use std::path::Path;
//!
//! use scanfeed::dispatch::{DispatchConfig, Dispatcher, DryRunRunner};
//! use scanfeed::targets::read_targets;
//!
//! fn main() -> Result<(), scanfeed::error::Error> {
//!     let input = "203.0.113.5 -> [22,80,443]\n192.168.1.1 -> [80]\n";
//!     let targets = read_targets(Cursor::new(input), Path::new("inline"), false)?;
//!
//!     let config = DispatchConfig::new("/tmp/out");
//!     let summary = Dispatcher::new(&config, DryRunRunner::new(true)).run(&targets)?;
//!
//!     assert_eq!(summary.scanned, 1);
//!     assert_eq!(summary.private, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Security Considerations
//!
//! The default command performs a SYN (`-sS`) scan, which needs raw socket
//! privileges on Linux and macOS. Only scan hosts you are authorised to scan.
#![allow(clippy::needless_doctest_main)]
#![warn(missing_docs)]

pub mod tui;

pub mod input;

pub mod error;

pub mod address;

pub mod targets;

pub mod dispatch;
