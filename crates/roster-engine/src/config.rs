//! Engine configuration

use serde::{Deserialize, Serialize};

/// Tunable engine behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether the synchronizer records per-subject match history.
    #[serde(default = "default_true")]
    pub record_match_history: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            record_match_history: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_records_history() {
        assert!(EngineConfig::default().record_match_history);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert!(config.record_match_history);
    }
}
