//! Error types shared by the parser, the configuration layer and the dispatcher.
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result type alias for scanfeed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a run.
///
/// A malformed address inside an otherwise well-formed line is not an error:
/// the dispatcher skips it with a warning.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or contradictory options.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The TOML configuration file exists but could not be read or parsed.
    #[error("Found {reason} in configuration file {}", .path.display())]
    ConfigFile {
        /// The configuration file.
        path: PathBuf,
        /// Why reading or parsing failed.
        reason: String,
    },

    /// The target file could not be opened or read.
    #[error("Error reading file {}: {source}", .path.display())]
    Read {
        /// The target file.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A target line is not of the form `ADDRESS -> [ports]`.
    #[error("Invalid line format at line {line_number}: {line}")]
    MalformedLine {
        /// 1-based line number.
        line_number: usize,
        /// The offending line.
        line: String,
    },

    /// A port failed validation while strict port checking was enabled.
    #[error("Invalid port {port:?} for {address}: {reason}")]
    InvalidPort {
        /// Address the port was listed for.
        address: String,
        /// The rejected port string.
        port: String,
        /// Validation message.
        reason: String,
    },

    /// The output folder could not be created.
    #[error("Failed to create output folder {}: {source}", .path.display())]
    CreateOutput {
        /// The output folder.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The external scanner could not be started at all.
    #[error("Failed to launch {program} for {address}: {source}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Target being scanned.
        address: String,
        /// The spawn failure.
        #[source]
        source: io::Error,
    },

    /// The external scanner ran but reported failure.
    #[error("Error running scan for {address}:{ports}: {status}{}", stderr_suffix(.stderr))]
    ScanFailed {
        /// Target being scanned.
        address: String,
        /// Comma joined ports passed to the scanner.
        ports: String,
        /// Exit status of the scanner.
        status: ExitStatus,
        /// Trimmed standard error of the scanner.
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(" ({stderr})")
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn malformed_line_names_the_line() {
        let err = Error::MalformedLine {
            line_number: 3,
            line: "8.8.8.8 [53]".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid line format at line 3: 8.8.8.8 [53]"
        );
    }

    #[test]
    fn config_error_is_prefixed() {
        let err = Error::Config("Both input and output paths are required".to_owned());
        assert!(err.to_string().starts_with("Configuration error: "));
    }
}
