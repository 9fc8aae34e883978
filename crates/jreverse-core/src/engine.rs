//! The rule engine: a registry of analyzers run in parallel over the
//! shared analysis context, with per-analyzer failure isolation.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::graph::{Capabilities, Graphs};
use crate::model::ClassPool;
use crate::score::QualityScore;
use crate::types::{AnalyzerFailure, Issue};

/// Read-only view shared by every analyzer.
pub struct AnalysisContext<'a> {
    pub pool: &'a ClassPool,
    pub graphs: &'a Graphs,
    pub config: &'a Config,
}

#[derive(Debug, Default)]
pub struct AnalyzerReport {
    pub issues: Vec<Issue>,
    pub score: QualityScore,
}

/// One rule module. Implementations must be deterministic: same context,
/// same report, regardless of thread scheduling.
pub trait Analyzer: Send + Sync {
    /// Stable id, used for config lookup and result keying.
    fn id(&self) -> &'static str;
    fn required_graphs(&self) -> Capabilities;
    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> AnalyzerReport;
}

#[derive(Debug, Default)]
pub struct EngineOutput {
    pub issues_by_analyzer: BTreeMap<String, Vec<Issue>>,
    pub scores_by_analyzer: BTreeMap<String, QualityScore>,
    pub failures: Vec<AnalyzerFailure>,
}

pub struct RuleEngine {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl RuleEngine {
    pub fn new(analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        Self { analyzers }
    }

    /// The union of every registered analyzer's graph needs.
    pub fn required_graphs(&self) -> Capabilities {
        self.analyzers
            .iter()
            .fold(Capabilities::default(), |acc, a| {
                acc.union(a.required_graphs())
            })
    }

    pub fn analyzer_ids(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.id()).collect()
    }

    /// Run every analyzer. A panicking analyzer becomes a failure record;
    /// the rest still report. Analyzers skipped by cancellation simply
    /// produce nothing.
    pub fn run(&self, ctx: &AnalysisContext<'_>, cancel: &CancelToken) -> EngineOutput {
        let results: Vec<(String, Result<AnalyzerReport, String>)> = self
            .analyzers
            .par_iter()
            .filter_map(|analyzer| {
                if cancel.is_cancelled() {
                    return None;
                }
                let outcome = catch_unwind(AssertUnwindSafe(|| analyzer.evaluate(ctx)))
                    .map_err(panic_message);
                Some((analyzer.id().to_string(), outcome))
            })
            .collect();

        let mut output = EngineOutput::default();
        for (id, outcome) in results {
            match outcome {
                Ok(report) => {
                    output.issues_by_analyzer.insert(id.clone(), report.issues);
                    output.scores_by_analyzer.insert(id, report.score);
                }
                Err(detail) => output.failures.push(AnalyzerFailure { analyzer: id, detail }),
            }
        }
        output.failures.sort_by(|a, b| a.analyzer.cmp(&b.analyzer));
        output
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "analyzer panicked".to_string()
    }
}
