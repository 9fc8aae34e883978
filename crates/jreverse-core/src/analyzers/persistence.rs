//! JPA mapping rules over the relationship graph.

use petgraph::visit::EdgeRef;

use crate::engine::{AnalysisContext, Analyzer, AnalyzerReport};
use crate::graph::{Capabilities, Cardinality, Fetch};
use crate::types::{Issue, IssueLocation, Severity};

const EAGER_COLLECTION_WEIGHT: i32 = -5;
const MISSING_MAPPED_BY_WEIGHT: i32 = -6;
const CASCADE_REMOVE_WEIGHT: i32 = -8;

pub struct PersistenceAnalyzer;

impl Analyzer for PersistenceAnalyzer {
    fn id(&self) -> &'static str {
        "persistence"
    }

    fn required_graphs(&self) -> Capabilities {
        Capabilities {
            relationship: true,
            ..Default::default()
        }
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> AnalyzerReport {
        let mut report = AnalyzerReport::default();
        let graph = &ctx.graphs.relationship;

        let mut eager = 0u32;
        let mut unmapped = 0u32;
        let mut cascade_remove = 0u32;

        for class in graph.sorted_classes() {
            let Some(idx) = graph.node(class) else { continue };
            for edge in graph.graph.edges(idx) {
                let assoc = edge.weight();
                let target = &graph.graph[edge.target()].class;
                let collection = matches!(
                    assoc.cardinality,
                    Cardinality::OneToMany | Cardinality::ManyToMany
                );

                if collection && assoc.fetch == Fetch::Eager {
                    eager += 1;
                    report.issues.push(Issue {
                        analyzer: "persistence".to_string(),
                        category: "eager_collection".to_string(),
                        severity: ctx.config.severity_for("eager_collection", Severity::Medium),
                        location: IssueLocation::method(class, &assoc.field),
                        description: format!(
                            "collection `{}` of {} is fetched eagerly; every load of {} pulls the whole collection",
                            assoc.field, target, class
                        ),
                        recommendation: Some(
                            "use FetchType.LAZY and fetch joins in the queries that need the data".to_string(),
                        ),
                    });
                }

                // Both directions owning the same association: each side
                // gets its own join structure and they drift apart.
                if assoc.owning() {
                    let both_owning = graph
                        .graph
                        .edges_connecting(edge.target(), idx)
                        .any(|inv| inv.weight().owning());
                    // report once, from the lexicographically smaller side
                    if both_owning && class < target.as_str() {
                        unmapped += 1;
                        report.issues.push(Issue {
                            analyzer: "persistence".to_string(),
                            category: "missing_mapped_by".to_string(),
                            severity: ctx.config.severity_for("missing_mapped_by", Severity::High),
                            location: IssueLocation::method(class, &assoc.field),
                            description: format!(
                                "{} and {} both own their association; neither side declares mappedBy",
                                class, target
                            ),
                            recommendation: Some(
                                "pick an owning side and add mappedBy on the inverse".to_string(),
                            ),
                        });
                    }
                }

                if assoc.cardinality == Cardinality::ManyToMany
                    && assoc.cascades.iter().any(|c| c == "REMOVE" || c == "ALL")
                {
                    cascade_remove += 1;
                    report.issues.push(Issue {
                        analyzer: "persistence".to_string(),
                        category: "cascade_remove".to_string(),
                        severity: ctx.config.severity_for("cascade_remove", Severity::High),
                        location: IssueLocation::method(class, &assoc.field),
                        description: format!(
                            "many-to-many `{}` cascades REMOVE; deleting one {} deletes shared {} rows",
                            assoc.field, class, target
                        ),
                        recommendation: Some(
                            "drop CascadeType.REMOVE from the many-to-many and delete join rows explicitly".to_string(),
                        ),
                    });
                }
            }
        }

        let config = ctx.config;
        report.score.record(
            "eager_collection",
            config.weight_for("persistence", "eager_collection", EAGER_COLLECTION_WEIGHT),
            eager,
        );
        report.score.record(
            "missing_mapped_by",
            config.weight_for("persistence", "missing_mapped_by", MISSING_MAPPED_BY_WEIGHT),
            unmapped,
        );
        report.score.record(
            "cascade_remove",
            config.weight_for("persistence", "cascade_remove", CASCADE_REMOVE_WEIGHT),
            cascade_remove,
        );
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
    use crate::model::{AnnotationValue, ClassPool, FieldModel};
    use jreverse_classfile::ArchiveLayout;

    fn run(classes: Vec<crate::model::ClassModel>) -> AnalyzerReport {
        let mut pool = ClassPool::new(ArchiveLayout::PlainJar);
        for c in classes {
            pool.insert(c);
        }
        let graphs = Graphs::build(&pool, &CancelToken::new());
        let config = Config::default();
        PersistenceAnalyzer.evaluate(&AnalysisContext {
            pool: &pool,
            graphs: &graphs,
            config: &config,
        })
    }

    fn entity(name: &str) -> crate::model::ClassModel {
        class(name, vec![annotation("jakarta.persistence.Entity")])
    }

    fn assoc(
        name: &str,
        ann: crate::model::AnnotationModel,
        element: &str,
    ) -> FieldModel {
        let mut f = field(name, "java.util.List", vec![ann]);
        f.signature = Some(format!("Ljava/util/List<L{};>;", element.replace('.', "/")));
        f
    }

    #[test]
    fn test_eager_collection_flagged() {
        let mut customer = entity("com.acme.Customer");
        customer.fields.push(assoc(
            "orders",
            annotation_with(
                "jakarta.persistence.OneToMany",
                vec![
                    ("mappedBy", AnnotationValue::Str("customer".into())),
                    (
                        "fetch",
                        AnnotationValue::EnumRef {
                            type_name: "jakarta.persistence.FetchType".into(),
                            value: "EAGER".into(),
                        },
                    ),
                ],
            ),
            "com.acme.Order",
        ));
        let report = run(vec![customer]);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].category, "eager_collection");
        assert_eq!(report.score.value(), 95);
    }

    #[test]
    fn test_lazy_collection_clean() {
        let mut customer = entity("com.acme.Customer");
        customer.fields.push(assoc(
            "orders",
            annotation_with(
                "jakarta.persistence.OneToMany",
                vec![("mappedBy", AnnotationValue::Str("customer".into()))],
            ),
            "com.acme.Order",
        ));
        assert!(run(vec![customer]).issues.is_empty());
    }

    #[test]
    fn test_both_sides_owning_reported_once() {
        let mut a = entity("com.acme.Author");
        a.fields.push(assoc(
            "books",
            annotation("jakarta.persistence.ManyToMany"),
            "com.acme.Book",
        ));
        let mut b = entity("com.acme.Book");
        b.fields.push(assoc(
            "authors",
            annotation("jakarta.persistence.ManyToMany"),
            "com.acme.Author",
        ));
        let report = run(vec![a, b]);
        let mapped: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.category == "missing_mapped_by")
            .collect();
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].location.class, "com.acme.Author");
    }

    #[test]
    fn test_mapped_by_silences_ownership_rule() {
        let mut a = entity("com.acme.Author");
        a.fields.push(assoc(
            "books",
            annotation("jakarta.persistence.ManyToMany"),
            "com.acme.Book",
        ));
        let mut b = entity("com.acme.Book");
        b.fields.push(assoc(
            "authors",
            annotation_with(
                "jakarta.persistence.ManyToMany",
                vec![("mappedBy", AnnotationValue::Str("books".into()))],
            ),
            "com.acme.Author",
        ));
        let report = run(vec![a, b]);
        assert!(report
            .issues
            .iter()
            .all(|i| i.category != "missing_mapped_by"));
    }

    #[test]
    fn test_cascade_remove_on_many_to_many() {
        let mut a = entity("com.acme.Course");
        a.fields.push(assoc(
            "students",
            annotation_with(
                "jakarta.persistence.ManyToMany",
                vec![(
                    "cascade",
                    AnnotationValue::Array(vec![AnnotationValue::EnumRef {
                        type_name: "jakarta.persistence.CascadeType".into(),
                        value: "ALL".into(),
                    }]),
                )],
            ),
            "com.acme.Student",
        ));
        let report = run(vec![a]);
        assert!(report
            .issues
            .iter()
            .any(|i| i.category == "cascade_remove" && i.severity == Severity::High));
    }
}
