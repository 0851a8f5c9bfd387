use serde::Deserialize;

/// Directory-level configuration, loaded from `questgate.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Event name stamped on winner records.
    pub event_name: String,
    /// Channel stamped on winner records.
    pub channel: u16,
    pub limits: InstanceLimits,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_name: "event".to_string(),
            channel: 1,
            limits: InstanceLimits::default(),
        }
    }
}

/// Caps and observability thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstanceLimits {
    /// Maximum number of live instances per directory.
    pub max_live_instances: usize,
    /// Hook calls slower than this are logged as warnings.
    pub slow_hook_warn_millis: u64,
}

impl Default for InstanceLimits {
    fn default() -> Self {
        Self {
            max_live_instances: 50,
            slow_hook_warn_millis: 250,
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Validate configuration, logging warnings for issues.
    pub fn validate(&self) {
        if self.event_name.is_empty() {
            tracing::warn!("event_name is empty; winner records will be unkeyed");
        }
        if self.limits.max_live_instances == 0 {
            tracing::warn!("max_live_instances is 0; no instance can be created");
        }
    }
}
