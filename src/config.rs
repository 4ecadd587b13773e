use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Session settings for the pipeline explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Period of the automatic cycle timer.
    pub cycle_interval_ms: u64,
    /// Words accepted by one execute frame.
    pub max_execute_instructions: usize,
    pub auto_cycle: bool,
    /// Upper bound on cycles a runner performs before giving up.
    pub max_cycles: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 500,
            max_execute_instructions: 8,
            auto_cycle: false,
            max_cycles: 10_000,
        }
    }
}

impl ExplorerConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let cfg = ExplorerConfig::from_json(r#"{ "cycle_interval_ms": 100 }"#).unwrap();
        assert_eq!(cfg.cycle_interval(), Duration::from_millis(100));
        assert_eq!(cfg.max_execute_instructions, 8);
        assert!(!cfg.auto_cycle);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(ExplorerConfig::from_json(r#"{ "auto_cycle": "yes" }"#).is_err());
    }
}
