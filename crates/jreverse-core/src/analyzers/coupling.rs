//! Coupling metrics over the DI graph.

use crate::engine::{AnalysisContext, Analyzer, AnalyzerReport};
use crate::graph::Capabilities;
use crate::types::{Issue, IssueLocation, Severity};

const HIGH_FAN_OUT_WEIGHT: i32 = -5;
const LOW_COUPLING_BONUS: i32 = 3;

pub struct CouplingAnalyzer;

impl Analyzer for CouplingAnalyzer {
    fn id(&self) -> &'static str {
        "coupling"
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
        let max_fan_out = ctx.config.rules.thresholds.max_fan_out;

        let mut over = 0u32;
        let mut beans = 0u32;

        for class in graph.sorted_classes() {
            let Some(idx) = graph.node(class) else { continue };
            if graph.graph[idx].external {
                continue;
            }
            beans += 1;
            let fan_out = graph.fan_out(idx);
            if fan_out > max_fan_out {
                over += 1;
                report.issues.push(Issue {
                    analyzer: "coupling".to_string(),
                    category: "high_fan_out".to_string(),
                    severity: ctx.config.severity_for("high_fan_out", Severity::Medium),
                    location: IssueLocation::class(class),
                    description: format!(
                        "{} depends on {} beans, over the limit of {} (fan-in: {})",
                        class,
                        fan_out,
                        max_fan_out,
                        graph.fan_in(idx)
                    ),
                    recommendation: Some(
                        "split the class along its responsibilities; a bean needing this many collaborators is doing several jobs".to_string(),
                    ),
                });
            }
        }

        report.score.record(
            "high_fan_out",
            ctx.config
                .weight_for("coupling", "high_fan_out", HIGH_FAN_OUT_WEIGHT),
            over,
        );
        if beans > 0 && over == 0 {
            report.score.record(
                "low_coupling",
                ctx.config
                    .weight_for("coupling", "low_coupling", LOW_COUPLING_BONUS),
                1,
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::config::Config;
    use crate::graph::Graphs;
    use crate::model::test_support::*;
    use crate::model::ClassPool;
    use jreverse_classfile::ArchiveLayout;

    fn run_with(classes: Vec<crate::model::ClassModel>, config: Config) -> AnalyzerReport {
        let mut pool = ClassPool::new(ArchiveLayout::PlainJar);
        for c in classes {
            pool.insert(c);
        }
        let graphs = Graphs::build(&pool, &CancelToken::new());
        CouplingAnalyzer.evaluate(&AnalysisContext {
            pool: &pool,
            graphs: &graphs,
            config: &config,
        })
    }

    fn god_service(dep_count: usize) -> crate::model::ClassModel {
        let mut svc = class(
            "com.acme.Everything",
            vec![annotation("org.springframework.stereotype.Service")],
        );
        for i in 0..dep_count {
            svc.fields.push(field(
                &format!("dep{}", i),
                &format!("com.acme.Collaborator{}", i),
                vec![annotation("org.springframework.beans.factory.annotation.Autowired")],
            ));
        }
        svc
    }

    #[test]
    fn test_fan_out_over_threshold() {
        let config: Config = toml::from_str("[rules.thresholds]\nmax_fan_out = 3\n").unwrap();
        let report = run_with(vec![god_service(5)], config);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].category, "high_fan_out");
        assert!(report.issues[0].description.contains("5 beans"));
        assert_eq!(report.score.value(), 95);
    }

    #[test]
    fn test_low_coupling_bonus() {
        let report = run_with(vec![god_service(2)], Config::default());
        assert!(report.issues.is_empty());
        assert_eq!(report.score.bonuses.len(), 1);
        assert_eq!(report.score.bonuses[0].category, "low_coupling");
    }

    #[test]
    fn test_empty_pool_gets_no_bonus() {
        let report = run_with(vec![], Config::default());
        assert!(report.score.bonuses.is_empty());
    }
}
