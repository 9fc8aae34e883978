//! Configuration loaded from `.jreverse.toml`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::score::ScoreBands;
use crate::types::Severity;

pub const CONFIG_FILE: &str = ".jreverse.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub scoring: ScoringConfig,
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Fully parse method bodies inside nested library jars.
    pub deep_library_scan: bool,
    /// Abort with partial results after this many seconds.
    pub deadline_secs: Option<u64>,
    /// Analyzer ids to run; empty means all registered.
    pub analyzers: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            deep_library_scan: false,
            deadline_secs: None,
            analyzers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub bands: ScoreBands,
    /// Per-analyzer weight overrides: `[scoring.weights.injection]`
    /// `field_injection = -10`. Analyzers fall back to their own defaults.
    pub weights: HashMap<String, HashMap<String, i32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    /// Per-category severity overrides.
    pub severities: HashMap<String, Severity>,
    /// `check` fails when an issue at or above this severity exists.
    pub fail_on: Severity,
    /// `check` fails when any analyzer scores below this.
    pub min_score: Option<u8>,
    pub thresholds: Thresholds,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            severities: HashMap::new(),
            fail_on: Severity::High,
            min_score: None,
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    pub max_fan_out: usize,
    pub max_complexity: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_fan_out: 10,
            max_complexity: 10,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Walk from `start` up through its ancestors looking for a config
    /// file; defaults when none is found.
    pub fn load_or_default(start: &Path) -> anyhow::Result<Self> {
        let mut dir = Some(start);
        while let Some(d) = dir {
            let candidate = d.join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::load(&candidate);
            }
            dir = d.parent();
        }
        Ok(Self::default())
    }

    /// Effective severity for an issue category.
    pub fn severity_for(&self, category: &str, default: Severity) -> Severity {
        self.rules
            .severities
            .get(category)
            .copied()
            .unwrap_or(default)
    }

    /// Effective score weight for an analyzer's category.
    pub fn weight_for(&self, analyzer: &str, category: &str, default: i32) -> i32 {
        self.scoring
            .weights
            .get(analyzer)
            .and_then(|w| w.get(category))
            .copied()
            .unwrap_or(default)
    }

    pub fn analyzer_enabled(&self, id: &str) -> bool {
        self.analysis.analyzers.is_empty() || self.analysis.analyzers.iter().any(|a| a == id)
    }
}

/// Commented template written by `jreverse init`.
pub fn default_toml() -> String {
    r#"# jreverse configuration

[analysis]
# Fully parse method bodies inside BOOT-INF/lib jars (slower).
deep_library_scan = false
# Abort with partial results after this many seconds.
# deadline_secs = 120
# Run only these analyzers (empty = all).
# analyzers = ["injection", "cycles"]

[scoring.bands]
critical_below = 40
sufficient_below = 60
good_below = 80

# Per-analyzer score weights (negative = penalty, positive = bonus).
# [scoring.weights.injection]
# field_injection = -8

[rules]
# `check` fails on any issue at or above this severity.
fail_on = "high"
# `check` fails when any analyzer scores below this.
# min_score = 60

[rules.thresholds]
max_fan_out = 10
max_complexity = 10

# Per-category severity overrides.
# [rules.severities]
# field_injection = "high"
"#
    .to_string()
}
