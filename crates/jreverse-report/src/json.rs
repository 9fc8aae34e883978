use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use jreverse_core::pipeline::AnalysisResult;
use jreverse_core::score::{ScoreEntry, ScoreLevel};
use jreverse_core::types::{AnalyzerFailure, Issue, LoadErrorRecord, Severity};
use jreverse_core::ArchiveLayout;
use jreverse_core::model::DuplicateClass;

/// Serializable view of one analysis run.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub generated_at: String,
    pub layout: ArchiveLayout,
    pub class_count: usize,
    pub application_class_count: usize,
    pub incomplete: bool,
    pub scores: BTreeMap<&'a str, ScoreView<'a>>,
    pub issues: Vec<&'a Issue>,
    pub load_errors: &'a [LoadErrorRecord],
    pub duplicates: &'a [DuplicateClass],
    pub analyzer_failures: &'a [AnalyzerFailure],
}

#[derive(Debug, Serialize)]
pub struct ScoreView<'a> {
    pub value: u8,
    pub level: ScoreLevel,
    pub penalties: &'a [ScoreEntry],
    pub bonuses: &'a [ScoreEntry],
}

impl<'a> JsonReport<'a> {
    pub fn from_result(result: &'a AnalysisResult) -> Self {
        let scores = result
            .scores_by_analyzer
            .iter()
            .map(|(id, score)| {
                (
                    id.as_str(),
                    ScoreView {
                        value: score.value(),
                        level: score.level(&result.bands),
                        penalties: &score.penalties,
                        bonuses: &score.bonuses,
                    },
                )
            })
            .collect();
        JsonReport {
            tool: "jreverse",
            version: env!("CARGO_PKG_VERSION"),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            layout: result.layout,
            class_count: result.pool.len(),
            application_class_count: result.pool.application_classes().count(),
            incomplete: result.incomplete,
            scores,
            issues: result.issues().collect(),
            load_errors: &result.load_errors,
            duplicates: &result.duplicates,
            analyzer_failures: &result.failures,
        }
    }
}

/// Format a full analysis report as JSON.
pub fn format_report(result: &AnalysisResult, compact: bool) -> String {
    let report = JsonReport::from_result(result);
    if compact {
        serde_json::to_string(&report).expect("JsonReport should be serializable")
    } else {
        serde_json::to_string_pretty(&report).expect("JsonReport should be serializable")
    }
}

/// Wrapper for check output that adds pass/fail metadata.
#[derive(Debug, Serialize)]
pub struct CheckOutput<'a> {
    #[serde(flatten)]
    pub report: JsonReport<'a>,
    pub check: CheckStatus,
}

#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub passed: bool,
    pub fail_on: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<u8>,
    pub failing_issue_count: usize,
}

/// Format a check result as JSON. Returns (json_string, passed).
pub fn format_check(
    result: &AnalysisResult,
    fail_on: Severity,
    min_score: Option<u8>,
    compact: bool,
) -> (String, bool) {
    let failing_issue_count = result.issues().filter(|i| i.severity >= fail_on).count();
    let score_ok = result
        .scores_by_analyzer
        .values()
        .all(|s| min_score.is_none_or(|min| s.value() >= min));
    let passed = failing_issue_count == 0 && score_ok && result.failures.is_empty();

    let output = CheckOutput {
        report: JsonReport::from_result(result),
        check: CheckStatus {
            passed,
            fail_on,
            min_score,
            failing_issue_count,
        },
    };
    let json = if compact {
        serde_json::to_string(&output).expect("CheckOutput should be serializable")
    } else {
        serde_json::to_string_pretty(&output).expect("CheckOutput should be serializable")
    };
    (json, passed)
}
