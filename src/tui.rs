//! Utilities for terminal output during a run.

/// Prints a red `[!]` line, or the bare message in accessible mode.
#[macro_export]
macro_rules! warning {
    ($name:expr) => {
        println!("{} {}", ansi_term::Colour::Red.bold().paint("[!]"), $name);
    };
    ($name:expr, $accessible:expr) => {
        if $accessible {
            println!("{}", $name);
        } else {
            println!("{} {}", ansi_term::Colour::Red.bold().paint("[!]"), $name);
        }
    };
}

/// Prints a blue `[~]` line, or the bare message in accessible mode.
#[macro_export]
macro_rules! detail {
    ($name:expr) => {
        println!("{} {}", ansi_term::Colour::Blue.bold().paint("[~]"), $name);
    };
    ($name:expr, $accessible:expr) => {
        if $accessible {
            println!("{}", $name);
        } else {
            println!("{} {}", ansi_term::Colour::Blue.bold().paint("[~]"), $name);
        }
    };
}

/// Prints a green `[>]` line, or the bare message in accessible mode.
#[macro_export]
macro_rules! output {
    ($name:expr) => {
        println!(
            "{} {}",
            ansi_term::Colour::RGB(0, 255, 9).bold().paint("[>]"),
            $name
        );
    };
    ($name:expr, $accessible:expr) => {
        if $accessible {
            println!("{}", $name);
        } else {
            println!(
                "{} {}",
                ansi_term::Colour::RGB(0, 255, 9).bold().paint("[>]"),
                $name
            );
        }
    };
}
