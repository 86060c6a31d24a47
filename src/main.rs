#![deny(clippy::all)]
#![warn(clippy::pedantic)]

use anyhow::Context;
use log::{debug, error};
use scanfeed::dispatch::{prepare_output_dir, Dispatcher, DryRunRunner, ProcessRunner};
use scanfeed::input::{Config, Opts};
use scanfeed::targets::parse_targets;
use scanfeed::{detail, output};

#[cfg(not(tarpaulin_include))]
fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(not(tarpaulin_include))]
fn run() -> anyhow::Result<()> {
    let mut opts = Opts::read();
    let config = if opts.no_config {
        Config::default()
    } else {
        Config::read(opts.config_path.clone())?
    };
    opts.merge(&config);

    debug!("Main() `opts` arguments are {:?}", opts);

    let run_config = opts.resolve()?;
    let accessible = run_config.dispatch.accessible;

    if !run_config.dry_run {
        prepare_output_dir(&run_config.dispatch.output_dir)?;
    }

    let targets = parse_targets(&run_config.input, run_config.strict_ports)
        .context("Could not load targets")?;
    detail!(
        format!("Loaded {} targets from {}", targets.len(), run_config.input.display()),
        accessible
    );

    let summary = if run_config.dry_run {
        Dispatcher::new(&run_config.dispatch, DryRunRunner::new(accessible)).run(&targets)
    } else {
        Dispatcher::new(&run_config.dispatch, ProcessRunner).run(&targets)
    }
    .context("Scan aborted")?;

    detail!(summary.to_string(), accessible);
    output!(
        "Scanning completed. Results appended to the output folder.",
        accessible
    );
    Ok(())
}
