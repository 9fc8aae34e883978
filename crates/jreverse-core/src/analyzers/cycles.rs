//! Circular dependency rules over the DI graph.

use crate::engine::{AnalysisContext, Analyzer, AnalyzerReport};
use crate::graph::{find_cycles, Capabilities};
use crate::types::{Issue, IssueLocation, Severity};

const CYCLE_WEIGHT: i32 = -15;
const LAZY_CYCLE_WEIGHT: i32 = -4;

pub struct CycleAnalyzer;

impl Analyzer for CycleAnalyzer {
    fn id(&self) -> &'static str {
        "cycles"
    }

    fn required_graphs(&self) -> Capabilities {
        Capabilities {
            dependency: true,
            ..Default::default()
        }
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> AnalyzerReport {
        let mut report = AnalyzerReport::default();
        let mut hard = 0u32;
        let mut lazy = 0u32;

        for cycle in find_cycles(&ctx.graphs.dependency) {
            let anchor = cycle.nodes.first().cloned().unwrap_or_default();
            let (category, default_severity) = if cycle.lazy {
                lazy += 1;
                ("lazy_di_cycle", Severity::Low)
            } else {
                hard += 1;
                ("di_cycle", Severity::High)
            };
            report.issues.push(Issue {
                analyzer: "cycles".to_string(),
                category: category.to_string(),
                severity: ctx.config.severity_for(category, default_severity),
                location: IssueLocation::class(anchor),
                description: if cycle.lazy {
                    format!(
                        "circular dependency {} is only breakable because an edge is @Lazy",
                        cycle.describe()
                    )
                } else {
                    format!("circular dependency: {}", cycle.describe())
                },
                recommendation: Some(
                    "break the cycle by extracting an interface one side can depend on, or mark one injection point @Lazy"
                        .to_string(),
                ),
            });
        }

        report.score.record(
            "di_cycle",
            ctx.config.weight_for("cycles", "di_cycle", CYCLE_WEIGHT),
            hard,
        );
        report.score.record(
            "lazy_di_cycle",
            ctx.config.weight_for("cycles", "lazy_di_cycle", LAZY_CYCLE_WEIGHT),
            lazy,
        );
        report
    }
}
