use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use scanfeed::dispatch::command::ScanCommand;
use scanfeed::dispatch::{prepare_output_dir, DispatchConfig, Dispatcher, Runner};
use scanfeed::error::Result;
use scanfeed::input::Opts;
use scanfeed::targets::parse_targets;

/// Records commands and writes an empty report, the way nmap would.
#[derive(Default)]
struct FakeScanner {
    commands: RefCell<Vec<ScanCommand>>,
}

impl Runner for FakeScanner {
    fn run(&self, command: &ScanCommand) -> Result<()> {
        fs::write(&command.output, "<nmaprun/>").unwrap();
        self.commands.borrow_mut().push(command.clone());
        Ok(())
    }
}

#[test]
fn fixture_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("scans");
    let opts = Opts {
        input: Some(PathBuf::from("fixtures/targets.txt")),
        output: Some(out.clone()),
        ..Opts::default()
    };
    let run = opts.resolve().unwrap();
    prepare_output_dir(&run.dispatch.output_dir).unwrap();

    let targets = parse_targets(&run.input, run.strict_ports).unwrap();
    let scanner = FakeScanner::default();
    let summary = Dispatcher::new(&run.dispatch, &scanner).run(&targets).unwrap();

    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.private, 2);
    assert_eq!(summary.invalid, 1);

    let commands = scanner.commands.borrow();
    let addresses: Vec<_> = commands.iter().map(|c| c.address.as_str()).collect();
    assert_eq!(addresses, ["203.0.113.5", "198.51.100.7"]);
    assert_eq!(commands[1].ports, "25,110");
    assert!(out.join("203.0.113.5.xml").is_file());
    assert!(out.join("198.51.100.7.xml").is_file());
    assert!(!out.join("127.0.0.1.xml").exists());
}

#[test]
fn duplicate_lines_scan_latest_ports_once() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("targets.txt");
    fs::write(
        &input,
        "203.0.113.5 -> [22]\n198.51.100.7 -> [25]\n203.0.113.5 -> [8080,8443]\n",
    )
    .unwrap();

    let targets = parse_targets(&input, false).unwrap();
    let config = DispatchConfig::new(dir.path());
    let scanner = FakeScanner::default();
    Dispatcher::new(&config, &scanner).run(&targets).unwrap();

    let commands = scanner.commands.borrow();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].address, "203.0.113.5");
    assert_eq!(commands[0].ports, "8080,8443");
}

#[test]
fn exact_invocation_for_documented_example() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("targets.txt");
    fs::write(&input, "203.0.113.5 -> [22,80,443]\n").unwrap();

    let targets = parse_targets(&input, false).unwrap();
    let config = DispatchConfig::new("/tmp/out");
    let recorder = Recorder::default();
    Dispatcher::new(&config, &recorder).run(&targets).unwrap();

    let commands = recorder.0.borrow();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].program, "nmap");
    assert_eq!(
        commands[0].args,
        ["-sV", "-sS", "-p", "22,80,443", "-oX", "/tmp/out/203.0.113.5.xml", "203.0.113.5"]
    );
    assert_eq!(commands[0].output, Path::new("/tmp/out/203.0.113.5.xml"));
}

#[derive(Default)]
struct Recorder(RefCell<Vec<ScanCommand>>);

impl Runner for Recorder {
    fn run(&self, command: &ScanCommand) -> Result<()> {
        self.0.borrow_mut().push(command.clone());
        Ok(())
    }
}
