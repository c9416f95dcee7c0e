//! Tunable simulation rules and logging settings carried by scenarios

use serde::{Deserialize, Serialize};

fn default_work_ticks() -> u32 {
    10
}

fn default_rock_drop_chance() -> f64 {
    0.5
}

fn default_wander_steps() -> u32 {
    40
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRules {
    /// Turns spent mining, eating or building before the work completes.
    #[serde(default = "default_work_ticks")]
    pub work_ticks: u32,
    /// Chance that a mined tile leaves a rock behind.
    #[serde(default = "default_rock_drop_chance")]
    pub rock_drop_chance: f64,
    /// Length of the random walk that picks a wandering destination.
    #[serde(default = "default_wander_steps")]
    pub wander_steps: u32,
}

impl Default for SimulationRules {
    fn default() -> Self {
        Self {
            work_ticks: default_work_ticks(),
            rock_drop_chance: default_rock_drop_chance(),
            wander_steps: default_wander_steps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_defaults_fill_missing_fields() {
        let rules: SimulationRules = serde_yaml::from_str("work_ticks: 4").unwrap();
        assert_eq!(rules.work_ticks, 4);
        assert_eq!(rules.rock_drop_chance, 0.5);
        assert_eq!(rules.wander_steps, 40);
    }

    #[test]
    fn test_logging_default_level() {
        let logging: LoggingConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(logging, LoggingConfig::default());
        assert_eq!(logging.level, "info");
    }
}
