use serde::{Deserialize, Serialize};

/// Per-join settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Stop after this many complete matches.
    pub match_limit: Option<u64>,
    /// Emit the depth/leg summary at debug level when a run starts.
    pub log_plan: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            match_limit: None,
            log_plan: true,
        }
    }
}

impl JoinConfig {
    pub fn with_match_limit(mut self, limit: u64) -> Self {
        self.match_limit = Some(limit);
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
