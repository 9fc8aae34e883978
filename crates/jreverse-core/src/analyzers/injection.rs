//! Dependency-injection style rules.

use petgraph::visit::EdgeRef;

use crate::engine::{AnalysisContext, Analyzer, AnalyzerReport};
use crate::graph::{Capabilities, InjectionKind};
use crate::types::{Issue, IssueLocation, Severity};

const FIELD_INJECTION_WEIGHT: i32 = -8;
const MISSING_QUALIFIER_WEIGHT: i32 = -3;
const CONSTRUCTOR_BONUS_WEIGHT: i32 = 2;

pub struct InjectionAnalyzer;

impl Analyzer for InjectionAnalyzer {
    fn id(&self) -> &'static str {
        "injection"
    }

    fn required_graphs(&self) -> Capabilities {
        Capabilities {
            dependency: true,
            ..Default::default()
        }
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> AnalyzerReport {
        let mut report = AnalyzerReport::default();
        let graph = &ctx.graphs.dependency;

        let mut field_injections = 0u32;
        let mut missing_qualifiers = 0u32;
        let mut constructor_only_beans = 0u32;

        for class in graph.sorted_classes() {
            let Some(idx) = graph.node(class) else { continue };
            if graph.graph[idx].external {
                continue;
            }

            let mut has_field = false;
            let mut has_constructor = false;
            let mut has_any = false;
            for edge in graph.graph.edges(idx) {
                let dep = edge.weight();
                has_any = true;
                match dep.kind {
                    InjectionKind::Field => {
                        has_field = true;
                        field_injections += 1;
                        report.issues.push(Issue {
                            analyzer: "injection".to_string(),
                            category: "field_injection".to_string(),
                            severity: ctx.config.severity_for("field_injection", Severity::Medium),
                            location: IssueLocation::method(class, &dep.site),
                            description: format!(
                                "field `{}` is injected directly; the dependency on {} is hidden from constructors and tests",
                                dep.site,
                                graph.graph[edge.target()].class
                            ),
                            recommendation: Some(
                                "inject through the constructor so the dependency is explicit and the field can be final".to_string(),
                            ),
                        });
                    }
                    InjectionKind::Constructor => has_constructor = true,
                    InjectionKind::Method | InjectionKind::Value => {}
                }
                // Ambiguity: several pool classes implement the target
                // interface and nothing picks a bean.
                if dep.kind != InjectionKind::Value && dep.qualifier.is_none() {
                    let target = &graph.graph[edge.target()].class;
                    if ctx.pool.implementations_of(target).len() > 1 {
                        missing_qualifiers += 1;
                        report.issues.push(Issue {
                            analyzer: "injection".to_string(),
                            category: "missing_qualifier".to_string(),
                            severity: ctx.config.severity_for("missing_qualifier", Severity::High),
                            location: IssueLocation::method(class, &dep.site),
                            description: format!(
                                "{} has multiple implementations in the archive but the injection carries no @Qualifier",
                                target
                            ),
                            recommendation: Some(
                                "add @Qualifier or @Primary to disambiguate the bean".to_string(),
                            ),
                        });
                    }
                }
            }
            if has_any && has_constructor && !has_field {
                constructor_only_beans += 1;
            }
        }

        let config = ctx.config;
        report.score.record(
            "field_injection",
            config.weight_for("injection", "field_injection", FIELD_INJECTION_WEIGHT),
            field_injections,
        );
        report.score.record(
            "missing_qualifier",
            config.weight_for("injection", "missing_qualifier", MISSING_QUALIFIER_WEIGHT),
            missing_qualifiers,
        );
        report.score.record(
            "constructor_injection",
            config.weight_for("injection", "constructor_injection", CONSTRUCTOR_BONUS_WEIGHT),
            constructor_only_beans,
        );
        report
    }
}
