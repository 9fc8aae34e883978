//! Hot-path rules over method bodies.

use crate::engine::{AnalysisContext, Analyzer, AnalyzerReport};
use crate::graph::Capabilities;
use crate::model::ClassPool;
use crate::types::{Issue, IssueLocation, Severity};

const N_PLUS_ONE_WEIGHT: i32 = -10;
const IO_IN_LOOP_WEIGHT: i32 = -6;
const COMPLEXITY_WEIGHT: i32 = -4;

pub struct PerformanceAnalyzer;

impl Analyzer for PerformanceAnalyzer {
    fn id(&self) -> &'static str {
        "performance"
    }

    // Works off per-method call sites in the pool; no graph needed.
    fn required_graphs(&self) -> Capabilities {
        Capabilities::default()
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> AnalyzerReport {
        let mut report = AnalyzerReport::default();
        let max_complexity = ctx.config.rules.thresholds.max_complexity;

        let mut n_plus_one = 0u32;
        let mut io_in_loop = 0u32;
        let mut complex = 0u32;

        for class in ctx.pool.application_classes() {
            for method in &class.methods {
                for call in method.call_sites.iter().filter(|c| c.inside_loop) {
                    if is_repository_call(ctx.pool, &call.target_class, &call.target_method) {
                        n_plus_one += 1;
                        report.issues.push(Issue {
                            analyzer: "performance".to_string(),
                            category: "n_plus_one_query".to_string(),
                            severity: ctx.config.severity_for("n_plus_one_query", Severity::High),
                            location: IssueLocation::method(&class.name, &method.name)
                                .with_line(call.line),
                            description: format!(
                                "{}.{} is called inside a loop; each iteration issues its own query",
                                call.target_class, call.target_method
                            ),
                            recommendation: Some(
                                "fetch the whole batch before the loop, e.g. with an IN query or a fetch join".to_string(),
                            ),
                        });
                    } else if is_io_class(&call.target_class) {
                        io_in_loop += 1;
                        report.issues.push(Issue {
                            analyzer: "performance".to_string(),
                            category: "io_in_loop".to_string(),
                            severity: ctx.config.severity_for("io_in_loop", Severity::Medium),
                            location: IssueLocation::method(&class.name, &method.name)
                                .with_line(call.line),
                            description: format!(
                                "I/O call {}.{} inside a loop",
                                call.target_class, call.target_method
                            ),
                            recommendation: Some(
                                "buffer or batch the I/O outside the loop".to_string(),
                            ),
                        });
                    }
                }

                if method.complexity > max_complexity {
                    complex += 1;
                    report.issues.push(Issue {
                        analyzer: "performance".to_string(),
                        category: "high_complexity".to_string(),
                        severity: ctx.config.severity_for("high_complexity", Severity::Low),
                        location: IssueLocation::method(&class.name, &method.name),
                        description: format!(
                            "cyclomatic complexity {} exceeds the limit of {}",
                            method.complexity, max_complexity
                        ),
                        recommendation: Some("split the method along its branches".to_string()),
                    });
                }
            }
        }

        let config = ctx.config;
        report.score.record(
            "n_plus_one_query",
            config.weight_for("performance", "n_plus_one_query", N_PLUS_ONE_WEIGHT),
            n_plus_one,
        );
        report.score.record(
            "io_in_loop",
            config.weight_for("performance", "io_in_loop", IO_IN_LOOP_WEIGHT),
            io_in_loop,
        );
        report.score.record(
            "high_complexity",
            config.weight_for("performance", "high_complexity", COMPLEXITY_WEIGHT),
            complex,
        );
        report
    }
}

const QUERY_PREFIXES: &[&str] = &["find", "get", "query", "search", "count", "exists", "load"];

/// A call that plausibly hits the database: the owner is annotated
/// `@Repository`, implements a Spring Data interface, or is named like a
/// repository/DAO with a query-shaped method.
fn is_repository_call(pool: &ClassPool, owner: &str, method: &str) -> bool {
    if let Some(class) = pool.get(owner) {
        if class.has_annotation("Repository") {
            return true;
        }
        if class
            .interfaces
            .iter()
            .any(|i| i.starts_with("org.springframework.data."))
        {
            return true;
        }
    }
    let named_like_repo = owner.ends_with("Repository") || owner.ends_with("Dao");
    named_like_repo && QUERY_PREFIXES.iter().any(|p| method.starts_with(p))
}

fn is_io_class(owner: &str) -> bool {
    owner.starts_with("java.io.")
        || owner.starts_with("java.nio.")
        || owner.starts_with("java.sql.")
        || owner.starts_with("java.net.")
}
