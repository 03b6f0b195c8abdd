//! NetSim - production network simulator
//!
//! Loads a topology file, checks that every ramp can reach a storehouse,
//! and runs the tick simulation, printing turn reports to stdout.

mod config;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use netsim_core::report::{generate_simulation_turn_report, generate_structure_report};
use netsim_core::sim::{ConsistencyPolicy, simulate};
use netsim_core::validation::check_consistency;
use netsim_io::{load_factory_structure, save_factory_structure};

#[derive(Parser)]
#[command(
    name = "netsim",
    about = "Tick-driven simulation of a ramp/worker/storehouse production network",
    version
)]
struct Cli {
    /// Topology file to load
    topology: PathBuf,

    /// Number of turns to simulate
    #[arg(short, long)]
    turns: Option<u64>,

    /// Seed for the routing RNG
    #[arg(short, long)]
    seed: Option<u64>,

    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a turn report every N turns, starting with turn 1
    #[arg(long, value_name = "N", conflicts_with = "report_turns")]
    report_every: Option<u64>,

    /// Print turn reports only for the listed turns
    #[arg(long, value_name = "TURNS", value_delimiter = ',')]
    report_turns: Option<Vec<u64>>,

    /// Do not print turn reports
    #[arg(long, conflicts_with_all = ["report_every", "report_turns"])]
    no_reports: bool,

    /// What to do when the topology fails the consistency check
    #[arg(long, value_enum)]
    consistency: Option<PolicyArg>,

    /// Print the structure report before simulating
    #[arg(long)]
    structure: bool,

    /// Only check consistency; exit status 1 if inconsistent
    #[arg(long)]
    check_only: bool,

    /// Write the topology back out in canonical form
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Ignore,
    Warn,
    Reject,
}

impl From<PolicyArg> for ConsistencyPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Ignore => ConsistencyPolicy::Ignore,
            PolicyArg::Warn => ConsistencyPolicy::Warn,
            PolicyArg::Reject => ConsistencyPolicy::Reject,
        }
    }
}

impl Cli {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            turns: self.turns,
            seed: self.seed,
            report_every: self.report_every,
            report_turns: self.report_turns.clone(),
            no_reports: self.no_reports,
            consistency: self.consistency.map(Into::into),
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Reports go to stdout; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let stdout = io::stdout();
    let succeeded = run(&cli, &mut stdout.lock())?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Execute one invocation, writing reports to `out`. Returns `false` only
/// when `--check-only` finds the topology inconsistent.
fn run(cli: &Cli, out: &mut impl Write) -> anyhow::Result<bool> {
    let text = std::fs::read_to_string(&cli.topology)
        .with_context(|| format!("failed to read topology {}", cli.topology.display()))?;
    let mut factory = load_factory_structure(&text)
        .with_context(|| format!("failed to load topology {}", cli.topology.display()))?;

    // A full run leaves the check to the driver, which applies the policy.
    if cli.check_only {
        return Ok(match check_consistency(&factory) {
            Ok(()) => {
                writeln!(out, "Topology is consistent.")?;
                true
            }
            Err(inconsistency) => {
                writeln!(out, "Topology is NOT consistent: {inconsistency}")?;
                false
            }
        });
    }

    if let Some(path) = &cli.save {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        save_factory_structure(&factory, &mut writer)
            .with_context(|| format!("failed to save topology to {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved topology");
    }

    if cli.structure {
        generate_structure_report(&factory, out)?;
    }

    let config = config::apply_overrides(config::load_config(cli.config.as_deref())?, &cli.overrides());

    let mut report_error = None;
    let summary = simulate(&mut factory, &config, |factory, turn| {
        if report_error.is_none() {
            if let Err(e) = generate_simulation_turn_report(factory, out, turn) {
                report_error = Some(e);
            }
        }
    })?;
    if let Some(e) = report_error {
        return Err(e).context("failed to write turn report");
    }

    let verdict = match summary.consistent {
        Some(true) => "consistent",
        Some(false) => "inconsistent",
        None => "unchecked",
    };
    writeln!(
        out,
        "Simulated {} turns: {} packages delivered, {} reports, topology {verdict}.",
        summary.turns_run, summary.delivered, summary.reports
    )?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOOPING: &str = "\
LOADING_RAMP id=1 delivery-interval=1
WORKER id=1 processing-time=1 queue-type=FIFO
STOREHOUSE id=1
LINK src=ramp-1 dest=worker-1
LINK src=worker-1 dest=worker-1
";

    fn topology_file(name: &str, text: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("netsim-{}-{name}.txt", std::process::id()));
        std::fs::write(&path, text).unwrap();
        path
    }

    fn run_with(args: &[&str]) -> (bool, String) {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        let mut out = Vec::new();
        let succeeded = run(&cli, &mut out).unwrap();
        (succeeded, String::from_utf8(out).unwrap())
    }

    #[test]
    fn check_only_reports_the_verdict_once() {
        let path = topology_file("check-only", LOOPING);
        let (succeeded, out) = run_with(&["netsim", path.to_str().unwrap(), "--check-only"]);
        assert!(!succeeded);
        assert_eq!(out.matches("NOT consistent").count(), 1);
        assert!(out.contains("worker #1"));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn warn_run_mentions_the_verdict_only_in_the_summary() {
        let path = topology_file("warn-run", LOOPING);
        let (succeeded, out) = run_with(&["netsim", path.to_str().unwrap(), "--turns", "2"]);
        assert!(succeeded);
        assert!(!out.contains("NOT consistent"));
        assert_eq!(out.matches("=== [ Turn:").count(), 2);
        assert!(out.ends_with("topology inconsistent.\n"), "{out}");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn reject_policy_fails_the_run() {
        let path = topology_file("reject-run", LOOPING);
        let cli = Cli::try_parse_from([
            "netsim",
            path.to_str().unwrap(),
            "--consistency",
            "reject",
        ])
        .unwrap();
        let err = run(&cli, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("topology rejected"), "{err}");
        std::fs::remove_file(path).unwrap();
    }
}
