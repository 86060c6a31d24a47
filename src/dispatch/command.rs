//! Builds the external scanner invocation for a single target.
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use text_placeholder::Template;

use crate::error::{Error, Result};
use crate::targets::Target;

/// Version detection, SYN scan, explicit port list, XML output, address last.
pub const DEFAULT_COMMAND: &str = "nmap -sV -sS -p {{ports}} -oX {{output}} {{address}}";

const PLACEHOLDERS: [&str; 3] = ["address", "ports", "output"];

/// A whitespace separated command line with `{{address}}`, `{{ports}}` and
/// `{{output}}` placeholders.
///
/// Each token is filled in separately and becomes exactly one argument, so
/// a port list containing spaces still reaches the scanner as one argument.
/// No shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    /// Splits `template` on whitespace and checks every placeholder name.
    pub fn parse(template: &str) -> Result<Self> {
        let mut tokens = template.split_whitespace().map(str::to_owned);
        let Some(program) = tokens.next() else {
            return Err(Error::Config("The scan command template is empty".to_owned()));
        };
        let args: Vec<String> = tokens.collect();

        if let Some(unknown) = std::iter::once(&program)
            .chain(&args)
            .flat_map(|token| placeholder_names(token))
            .find(|name| !PLACEHOLDERS.contains(name))
        {
            return Err(Error::Config(format!(
                "Unknown placeholder {{{{{unknown}}}}} in scan command, expected one of {}",
                PLACEHOLDERS.join(", ")
            )));
        }

        Ok(Self { program, args })
    }

    /// Fills the template for `target`, writing into `output_dir`.
    ///
    /// ```rust
    /// # use scanfeed::dispatch::command::{CommandTemplate, DEFAULT_COMMAND};
    /// # use scanfeed::targets::Target;
    /// # use std::path::Path;
    /// let template = CommandTemplate::parse(DEFAULT_COMMAND).unwrap();
    /// let target = Target {
    ///     address: "203.0.113.5".to_owned(),
    ///     ports: vec!["22".to_owned(), "80".to_owned()],
    /// };
    /// let command = template.render(&target, Path::new("/tmp/out"));
    /// assert_eq!(command.to_string(), "nmap -sV -sS -p 22,80 -oX /tmp/out/203.0.113.5.xml 203.0.113.5");
    /// ```
    pub fn render(&self, target: &Target, output_dir: &Path) -> ScanCommand {
        let ports = target.joined_ports();
        let output = output_path(output_dir, &target.address);
        let output_str = output.to_string_lossy();

        let mut table: HashMap<&str, &str> = HashMap::new();
        table.insert("address", &target.address);
        table.insert("ports", &ports);
        table.insert("output", &output_str);

        let fill = |token: &str| Template::new(token).fill_with_hashmap(&table);
        let program = fill(self.program.as_str());
        let args = self.args.iter().map(|token| fill(token.as_str())).collect();

        ScanCommand {
            address: target.address.clone(),
            ports,
            output,
            program,
            args,
        }
    }
}

impl Default for CommandTemplate {
    fn default() -> Self {
        Self {
            program: "nmap".to_owned(),
            args: DEFAULT_COMMAND
                .split_whitespace()
                .skip(1)
                .map(str::to_owned)
                .collect(),
        }
    }
}

fn placeholder_names(token: &str) -> impl Iterator<Item = &str> + '_ {
    token
        .split("{{")
        .skip(1)
        .filter_map(|rest| rest.split_once("}}").map(|(name, _)| name))
}

/// `<output_dir>/<address>.xml`
pub fn output_path(output_dir: &Path, address: &str) -> PathBuf {
    output_dir.join(format!("{address}.xml"))
}

/// A fully rendered scanner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCommand {
    /// Target address as read from the input.
    pub address: String,
    /// Comma joined port list.
    pub ports: String,
    /// Report file the scanner is asked to write.
    pub output: PathBuf,
    /// Executable to spawn.
    pub program: String,
    /// Arguments after the program, one per template token.
    pub args: Vec<String>,
}

impl fmt::Display for ScanCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
