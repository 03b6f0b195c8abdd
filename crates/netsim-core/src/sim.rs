//! Tick driver: runs the factory for a number of turns and decides when to
//! emit reports.

use crate::factory::{Factory, FactoryError};
use crate::id::Time;
use crate::validation::{Inconsistency, check_consistency};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// When the driver calls the report callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSchedule {
    Never,
    /// Every `n` turns, starting with turn 1.
    Every(u64),
    /// Exactly the listed turns.
    Turns(Vec<Time>),
}

impl Default for ReportSchedule {
    fn default() -> Self {
        ReportSchedule::Every(1)
    }
}

/// What the driver does when the topology fails the consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyPolicy {
    /// Skip the check.
    Ignore,
    /// Log the inconsistency and simulate anyway.
    #[default]
    Warn,
    /// Refuse to simulate.
    Reject,
}

/// Driver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of turns to run, starting at turn 1.
    pub turns: Time,
    /// Seed for the default routing RNG; `None` keeps the factory's generator.
    pub seed: Option<u64>,
    pub report: ReportSchedule,
    pub consistency: ConsistencyPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            turns: 10,
            seed: None,
            report: ReportSchedule::default(),
            consistency: ConsistencyPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Report notifier
// ---------------------------------------------------------------------------

/// Decides, turn by turn, whether a report is due.
#[derive(Debug, Clone)]
pub struct ReportNotifier {
    schedule: ReportSchedule,
}

impl ReportNotifier {
    pub fn new(schedule: ReportSchedule) -> Self {
        Self { schedule }
    }

    pub fn should_generate_report(&self, t: Time) -> bool {
        match &self.schedule {
            ReportSchedule::Never => false,
            ReportSchedule::Every(n) => t >= 1 && (t - 1) % (*n).max(1) == 0,
            ReportSchedule::Turns(turns) => turns.contains(&t),
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Errors that stop a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("topology rejected: {0}")]
    Inconsistent(#[from] Inconsistency),
    #[error("turn {turn} aborted: {source}")]
    Turn {
        turn: Time,
        #[source]
        source: FactoryError,
    },
}

/// What a finished run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationSummary {
    pub turns_run: Time,
    /// Packages held by storehouses at the end of the run.
    pub delivered: usize,
    pub reports: usize,
    /// Whether the topology passed the consistency check (`None` if skipped).
    pub consistent: Option<bool>,
}

/// Run turns `1..=config.turns`, calling `on_report` after each turn the
/// schedule selects.
pub fn simulate<F>(
    factory: &mut Factory,
    config: &SimulationConfig,
    mut on_report: F,
) -> Result<SimulationSummary, SimulationError>
where
    F: FnMut(&Factory, Time),
{
    let mut summary = SimulationSummary::default();

    if config.consistency != ConsistencyPolicy::Ignore {
        match check_consistency(factory) {
            Ok(()) => summary.consistent = Some(true),
            Err(inconsistency) => {
                if config.consistency == ConsistencyPolicy::Reject {
                    return Err(inconsistency.into());
                }
                tracing::warn!(%inconsistency, "simulating an inconsistent topology");
                summary.consistent = Some(false);
            }
        }
    }

    if let Some(seed) = config.seed {
        factory.set_generator(crate::rng::SimRng::new(seed));
    }

    tracing::info!(turns = config.turns, "simulation started");
    let notifier = ReportNotifier::new(config.report.clone());
    for turn in 1..=config.turns {
        factory
            .tick(turn)
            .map_err(|source| SimulationError::Turn { turn, source })?;
        summary.turns_run = turn;
        if notifier.should_generate_report(turn) {
            on_report(&*factory, turn);
            summary.reports += 1;
        }
    }

    summary.delivered = factory.delivered_count();
    tracing::info!(
        turns = summary.turns_run,
        delivered = summary.delivered,
        "simulation finished"
    );
    Ok(summary)
}
