//! Core functionality for handing targets to the external scanner.
//!
//! Targets are processed one after another. Each scanner invocation blocks
//! until the scanner exits, and the first failure aborts the run: files
//! written for earlier targets are left in place.
pub mod command;

use std::fmt;
use std::fs;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use cidr_utils::cidr::IpCidr;
use log::debug;

use crate::address::{classify, is_excluded, AddressClass};
use crate::error::{Error, Result};
use crate::targets::{Target, TargetMap};
use crate::{detail, output, warning};
use command::{CommandTemplate, ScanCommand};

/// Targets with more ports than this are skipped unless configured otherwise.
pub const DEFAULT_MAX_PORTS: usize = 1000;

/// Everything the dispatcher needs to know, resolved once at startup.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Folder receiving one `ADDRESS.xml` report per scanned target.
    pub output_dir: PathBuf,
    /// Largest port count still dispatched.
    pub max_ports: usize,
    /// Scanner invocation filled in for every target.
    pub command: CommandTemplate,
    /// Ranges skipped in addition to the private ones.
    pub exclusions: Vec<IpCidr>,
    /// Plain output without colours or prefixes.
    pub accessible: bool,
}

impl DispatchConfig {
    /// Default scanner settings writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_ports: DEFAULT_MAX_PORTS,
            command: CommandTemplate::default(),
            exclusions: Vec::new(),
            accessible: false,
        }
    }
}

/// Executes a rendered scanner command.
pub trait Runner {
    /// Runs `command` to completion. Any error aborts the dispatch.
    fn run(&self, command: &ScanCommand) -> Result<()>;
}

impl<T: Runner + ?Sized> Runner for &T {
    fn run(&self, command: &ScanCommand) -> Result<()> {
        (**self).run(command)
    }
}

/// Spawns the scanner and waits for it.
///
/// The scanner's standard output is discarded; its standard error is kept
/// for the error report when it exits unsuccessfully.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&self, command: &ScanCommand) -> Result<()> {
        debug!("Running {}", command);
        let result = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| Error::Launch {
                program: command.program.clone(),
                address: command.address.clone(),
                source,
            })?;

        if result.status.success() {
            return Ok(());
        }

        Err(Error::ScanFailed {
            address: command.address.clone(),
            ports: command.ports.clone(),
            status: result.status,
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_owned(),
        })
    }
}

/// Prints each command instead of running it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner {
    accessible: bool,
}

impl DryRunRunner {
    /// Prints through the accessible or coloured terminal macros.
    pub fn new(accessible: bool) -> Self {
        Self { accessible }
    }
}

impl Runner for DryRunRunner {
    fn run(&self, command: &ScanCommand) -> Result<()> {
        output!(format!("Would run: {command}"), self.accessible);
        Ok(())
    }
}

/// What happened to a single target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Handed to the runner, which succeeded.
    Scanned,
    /// Loopback or private range.
    Private,
    /// Inside a user excluded range.
    Excluded,
    /// Not an IP address.
    Invalid,
    /// More ports than the configured maximum.
    Oversized,
}

/// Per-outcome counts for a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Targets handed to the scanner.
    pub scanned: usize,
    /// Loopback and private addresses skipped.
    pub private: usize,
    /// Addresses skipped by an exclusion.
    pub excluded: usize,
    /// Entries whose address is not an IP.
    pub invalid: usize,
    /// Entries over the port limit.
    pub oversized: usize,
}

impl DispatchSummary {
    fn record(&mut self, outcome: Outcome) {
        let slot = match outcome {
            Outcome::Scanned => &mut self.scanned,
            Outcome::Private => &mut self.private,
            Outcome::Excluded => &mut self.excluded,
            Outcome::Invalid => &mut self.invalid,
            Outcome::Oversized => &mut self.oversized,
        };
        *slot += 1;
    }

    /// Every target that was not scanned.
    pub fn skipped(&self) -> usize {
        self.private + self.excluded + self.invalid + self.oversized
    }
}

impl fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scanned, {} skipped ({} private, {} excluded, {} invalid, {} with too many ports)",
            self.scanned,
            self.skipped(),
            self.private,
            self.excluded,
            self.invalid,
            self.oversized
        )
    }
}

/// Creates the output folder and any missing parents.
pub fn prepare_output_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source: io::Error| Error::CreateOutput {
        path: path.to_path_buf(),
        source,
    })
}

/// Walks a [`TargetMap`] and hands every eligible target to a [`Runner`].
#[derive(Debug)]
pub struct Dispatcher<'a, R> {
    config: &'a DispatchConfig,
    runner: R,
}

impl<'a, R: Runner> Dispatcher<'a, R> {
    /// Binds a runner to resolved settings.
    pub fn new(config: &'a DispatchConfig, runner: R) -> Self {
        Self { config, runner }
    }

    /// Dispatches every target in order, stopping at the first scanner failure.
    pub fn run(&self, targets: &TargetMap) -> Result<DispatchSummary> {
        debug!(
            "Start dispatching. \nNumber of targets {}\nOutput folder {}\nMax ports {}",
            targets.len(),
            self.config.output_dir.display(),
            self.config.max_ports
        );

        let mut summary = DispatchSummary::default();
        for target in targets {
            summary.record(self.dispatch(target)?);
        }

        debug!("Dispatch summary: {:?}", summary);
        Ok(summary)
    }

    /// Classifies one target and scans it if eligible.
    pub fn dispatch(&self, target: &Target) -> Result<Outcome> {
        let accessible = self.config.accessible;
        let address = target.address.as_str();

        let Ok(ip) = address.parse::<IpAddr>() else {
            warning!(format!("Invalid IP address: {address}, skipping"), accessible);
            return Ok(Outcome::Invalid);
        };

        if classify(ip) == AddressClass::Private {
            detail!(format!("Skipping internal IP: {address}"), accessible);
            return Ok(Outcome::Private);
        }

        if is_excluded(ip, &self.config.exclusions) {
            detail!(format!("Skipping excluded IP: {address}"), accessible);
            return Ok(Outcome::Excluded);
        }

        if target.ports.len() > self.config.max_ports {
            warning!(
                format!(
                    "{address}: ports length {} > {}, skipping...",
                    target.ports.len(),
                    self.config.max_ports
                ),
                accessible
            );
            return Ok(Outcome::Oversized);
        }

        let command = self.config.command.render(target, &self.config.output_dir);
        output!(format!("Scanning {address} on ports {}", command.ports), accessible);
        detail!(format!("Output file: {}", command.output.display()), accessible);

        self.runner.run(&command)?;
        Ok(Outcome::Scanned)
    }
}
