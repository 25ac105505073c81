//! Engine adapter configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the engine adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Connection identities (ProgIDs), tried in order.
    #[serde(default = "default_identities")]
    pub identities: Vec<String>,

    /// Delay after opening a document, in milliseconds.
    /// The engine completes document load asynchronously; saving too early
    /// produces truncated output on some versions.
    #[serde(default = "default_stabilization_delay")]
    pub stabilization_delay_ms: u64,

    /// Format hint passed to `Open`; the engine auto-detects from content.
    #[serde(default = "default_open_format_hint")]
    pub open_format_hint: String,

    /// Option string passed to `Open`.
    #[serde(default = "default_open_options")]
    pub open_options: String,
}

fn default_identities() -> Vec<String> {
    vec![
        "HWPControl.HwpCtrl.1".to_string(),
        "HwpObject.HwpObject".to_string(),
        "HWPFrame.HwpObject".to_string(),
    ]
}

fn default_stabilization_delay() -> u64 {
    300
}

fn default_open_format_hint() -> String {
    "HWP".to_string()
}

fn default_open_options() -> String {
    "forceopen:true".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identities: default_identities(),
            stabilization_delay_ms: default_stabilization_delay(),
            open_format_hint: default_open_format_hint(),
            open_options: default_open_options(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.identities.len(), 3);
        assert_eq!(config.identities[0], "HWPControl.HwpCtrl.1");
        assert_eq!(config.stabilization_delay_ms, 300);
        assert_eq!(config.open_format_hint, "HWP");
        assert_eq!(config.open_options, "forceopen:true");
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{ "stabilization_delay_ms": 50 }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.stabilization_delay_ms, 50);
        assert_eq!(config.identities.len(), 3);
    }

    #[test]
    fn test_deserialize_custom_identities() {
        let json = r#"{ "identities": ["Custom.Engine.1"] }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.identities, vec!["Custom.Engine.1"]);
    }
}
