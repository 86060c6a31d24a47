//! Provides a means to read, parse and hold configuration options for a run.
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use serde_derive::Deserialize;

use crate::address::parse_exclusions;
use crate::dispatch::command::{CommandTemplate, DEFAULT_COMMAND};
use crate::dispatch::{DispatchConfig, DEFAULT_MAX_PORTS};
use crate::error::{Error, Result};

const LOWEST_PORT_NUMBER: u16 = 1;
const TOP_PORT_NUMBER: u16 = 65535;

/// Long flags that may also be spelled with a single dash, e.g. `-input`.
const LEGACY_LONG_FLAGS: [&str; 2] = ["input", "output"];

const CONFIG_FILE_NAME: &str = ".scanfeed.toml";

/// Checks that a port is a decimal number between 1 and 65535.
pub(crate) fn parse_single_port(port_str: &str) -> std::result::Result<u16, String> {
    let port: u16 = port_str
        .parse()
        .map_err(|_| format!("Invalid port number '{port_str}'"))?;

    if port < LOWEST_PORT_NUMBER {
        return Err(format!(
            "Port {port} must be between {LOWEST_PORT_NUMBER} and {TOP_PORT_NUMBER}",
        ));
    }

    Ok(port)
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "scanfeed",
    version = env!("CARGO_PKG_VERSION"),
    max_term_width = 120,
    help_template = "{bin} {version}\n{about}\n\nUSAGE:\n    {usage}\n\nOPTIONS:\n{options}",
)]
#[allow(clippy::struct_excessive_bools)]
/// Feeds per-host port lists into Nmap.
/// Reads `ADDRESS -> [p1,p2,...]` lines, skips private and loopback addresses,
/// and runs one Nmap scan per remaining address, writing XML results to
/// OUTPUT/ADDRESS.xml.
/// Only scan hosts you are authorised to scan.
pub struct Opts {
    /// File of `ADDRESS -> [p1,p2,...]` lines. Also accepted as `-input`.
    #[arg(short, long, value_parser)]
    pub input: Option<PathBuf>,

    /// Folder receiving one XML file per scanned address. Created if missing.
    /// Also accepted as `-output`.
    #[arg(short, long, value_parser)]
    pub output: Option<PathBuf>,

    /// Whether to ignore the configuration file or not.
    #[arg(short, long)]
    pub no_config: bool,

    /// Custom path to config file
    #[arg(short, long, value_parser)]
    pub config_path: Option<PathBuf>,

    /// Accessible mode. Turns off features which negatively affect screen readers.
    #[arg(long)]
    pub accessible: bool,

    /// Addresses with more ports than this are skipped.
    #[arg(short, long, default_value_t = DEFAULT_MAX_PORTS)]
    pub max_ports: usize,

    /// The scanner command. Placeholders: {{address}}, {{ports}}, {{output}}.
    /// Every whitespace separated token becomes one argument; no shell is used.
    #[arg(long, default_value = DEFAULT_COMMAND)]
    pub command: String,

    /// A list of comma separated CIDRs or IPs to be excluded from scanning.
    #[arg(short = 'x', long = "exclude-addresses", value_delimiter = ',')]
    pub exclude_addresses: Option<Vec<String>>,

    /// Reject the input file unless every port is a number between 1 and 65535.
    #[arg(long)]
    pub strict_ports: bool,

    /// Print the scanner commands instead of running them.
    #[arg(long)]
    pub dry_run: bool,
}

/// The resolved settings of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Target file to read.
    pub input: PathBuf,
    /// Validate every port before any scan starts.
    pub strict_ports: bool,
    /// Print commands instead of running them.
    pub dry_run: bool,
    /// Settings handed to the dispatcher.
    pub dispatch: DispatchConfig,
}

#[cfg(not(tarpaulin_include))]
impl Opts {
    /// Parses the process arguments, accepting the single-dash legacy flags.
    pub fn read() -> Self {
        Self::parse_from(normalize_legacy_flags(std::env::args_os()))
    }
}

impl Opts {
    /// Merges values found within the user configuration file.
    pub fn merge(&mut self, config: &Config) {
        if !self.no_config {
            self.merge_required(config);
            self.merge_optional(config);
        }
    }

    fn merge_required(&mut self, config: &Config) {
        macro_rules! merge_required {
            ($($field: ident),+) => {
                $(
                    if let Some(e) = &config.$field {
                        self.$field = e.clone();
                    }
                )+
            }
        }

        merge_required!(max_ports, command, accessible, strict_ports);
    }

    fn merge_optional(&mut self, config: &Config) {
        macro_rules! merge_optional {
            ($($field: ident),+) => {
                $(
                    if self.$field.is_none() {
                        self.$field = config.$field.clone();
                    }
                )+
            }
        }

        merge_optional!(input, output, exclude_addresses);
    }

    /// Validates the options and builds the run configuration.
    pub fn resolve(&self) -> Result<RunConfig> {
        let (Some(input), Some(output)) = (&self.input, &self.output) else {
            return Err(Error::Config(
                "Both input and output paths are required".to_owned(),
            ));
        };

        let exclusions = parse_exclusions(self.exclude_addresses.as_deref().unwrap_or(&[]))?;
        let command = CommandTemplate::parse(&self.command)?;

        Ok(RunConfig {
            input: input.clone(),
            strict_ports: self.strict_ports,
            dry_run: self.dry_run,
            dispatch: DispatchConfig {
                output_dir: output.clone(),
                max_ports: self.max_ports,
                command,
                exclusions,
                accessible: self.accessible,
            },
        })
    }
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            no_config: true,
            config_path: None,
            accessible: false,
            max_ports: DEFAULT_MAX_PORTS,
            command: DEFAULT_COMMAND.to_owned(),
            exclude_addresses: None,
            strict_ports: false,
            dry_run: false,
        }
    }
}

/// Rewrites `-input`/`-output` (and their `=value` forms) to the double-dash
/// spelling clap understands. Everything after `--` is left untouched.
pub fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg: OsString| {
            if passthrough {
                return arg;
            }
            if arg.as_os_str() == "--" {
                passthrough = true;
                return arg;
            }
            let legacy = arg
                .to_str()
                .filter(|flag| is_legacy_flag(flag))
                .map(|flag| format!("-{flag}"));
            legacy.map_or(arg, OsString::from)
        })
        .collect()
}

fn is_legacy_flag(arg: &str) -> bool {
    let Some(name) = arg.strip_prefix('-') else {
        return false;
    };
    let name = name.split_once('=').map_or(name, |(name, _)| name);
    LEGACY_LONG_FLAGS.contains(&name)
}

/// Struct used to deserialize the options specified within our config file.
/// These will be further merged with our command line arguments in order to
/// generate the final Opts struct.
#[cfg(not(tarpaulin_include))]
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    max_ports: Option<usize>,
    command: Option<String>,
    exclude_addresses: Option<Vec<String>>,
    accessible: Option<bool>,
    strict_ports: Option<bool>,
}

#[cfg(not(tarpaulin_include))]
impl Config {
    /// Reads the configuration file with TOML format and parses it into a
    /// Config struct.
    ///
    /// # Format
    ///
    /// input = "targets.txt"
    /// output = "results"
    /// max_ports = 1000
    /// command = "nmap -sV -sS -p {{ports}} -oX {{output}} {{address}}"
    /// exclude_addresses = ["203.0.113.0/24"]
    /// accessible = false
    /// strict_ports = false
    ///
    /// A missing file at the default location is not an error; a missing
    /// file at an explicitly given path is.
    pub fn read(custom_config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match custom_config_path {
            Some(path) => path,
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&config_path).map_err(|e| Error::ConfigFile {
            path: config_path.clone(),
            reason: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|reason| Error::ConfigFile {
            path: config_path,
            reason,
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}

/// Constructs default path to config toml
pub fn default_config_path() -> Option<PathBuf> {
    let mut config_path = dirs::home_dir()?;
    config_path.push(CONFIG_FILE_NAME);
    Some(config_path)
}
