//! Run configuration: an optional TOML file, overridden by command-line flags.
//!
//! ```toml
//! [simulation]
//! turns = 20
//! seed = 42
//! consistency = "reject"   # ignore | warn | reject
//! report = { every = 5 }   # or "never", or { turns = [1, 10, 20] }
//! ```

use anyhow::Context;
use netsim_core::sim::{ConsistencyPolicy, ReportSchedule, SimulationConfig};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    simulation: SimulationConfig,
}

/// Flag values that take precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub turns: Option<u64>,
    pub seed: Option<u64>,
    pub report_every: Option<u64>,
    pub report_turns: Option<Vec<u64>>,
    pub no_reports: bool,
    pub consistency: Option<ConsistencyPolicy>,
}

/// Parse TOML configuration text.
pub fn parse_config(text: &str) -> anyhow::Result<SimulationConfig> {
    let file: ConfigFile = toml::from_str(text).context("invalid configuration")?;
    Ok(file.simulation)
}

/// Read the configuration file, or fall back to defaults when none is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config =
        parse_config(&text).with_context(|| format!("in config file {}", path.display()))?;
    tracing::debug!(?config, path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Apply command-line overrides on top of `config`.
pub fn apply_overrides(mut config: SimulationConfig, overrides: &Overrides) -> SimulationConfig {
    if let Some(turns) = overrides.turns {
        config.turns = turns;
    }
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
    if let Some(every) = overrides.report_every {
        config.report = ReportSchedule::Every(every);
    }
    if let Some(turns) = &overrides.report_turns {
        config.report = ReportSchedule::Turns(turns.clone());
    }
    if overrides.no_reports {
        config.report = ReportSchedule::Never;
    }
    if let Some(policy) = overrides.consistency {
        config.consistency = policy;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(parse_config("").unwrap(), SimulationConfig::default());
    }

    #[test]
    fn full_file_parses() {
        let config = parse_config(
            r#"
            [simulation]
            turns = 20
            seed = 42
            consistency = "reject"
            report = { turns = [1, 10, 20] }
            "#,
        )
        .unwrap();
        assert_eq!(config.turns, 20);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.consistency, ConsistencyPolicy::Reject);
        assert_eq!(config.report, ReportSchedule::Turns(vec![1, 10, 20]));
    }

    #[test]
    fn report_never_parses() {
        let config = parse_config("[simulation]\nreport = \"never\"\n").unwrap();
        assert_eq!(config.report, ReportSchedule::Never);
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(parse_config("[render]\nfps = 60\n").is_err());
        assert!(parse_config("[simulation]\nturns = \"many\"\n").is_err());
        assert!(parse_config("[simulation]\ntrns = 5\n").is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let base = parse_config("[simulation]\nturns = 20\nreport = { every = 5 }\n").unwrap();
        let config = apply_overrides(
            base.clone(),
            &Overrides {
                turns: Some(3),
                report_turns: Some(vec![2]),
                ..Overrides::default()
            },
        );
        assert_eq!(config.turns, 3);
        assert_eq!(config.report, ReportSchedule::Turns(vec![2]));

        let untouched = apply_overrides(base.clone(), &Overrides::default());
        assert_eq!(untouched, base);

        let silent = apply_overrides(
            base,
            &Overrides {
                no_reports: true,
                report_every: Some(2),
                ..Overrides::default()
            },
        );
        assert_eq!(silent.report, ReportSchedule::Never);
    }

    #[test]
    fn missing_config_path_is_default() {
        assert_eq!(load_config(None).unwrap(), SimulationConfig::default());
        assert!(load_config(Some(Path::new("/nonexistent/netsim.toml"))).is_err());
    }
}
