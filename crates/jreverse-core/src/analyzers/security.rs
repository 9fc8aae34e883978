//! Web endpoint security rules.

use regex::Regex;

use crate::engine::{AnalysisContext, Analyzer, AnalyzerReport};
use crate::graph::Capabilities;
use crate::model::{AnnotationValue, ClassModel, MethodModel};
use crate::types::{Issue, IssueLocation, Severity};

const UNPROTECTED_WEIGHT: i32 = -8;
const WILDCARD_CORS_WEIGHT: i32 = -7;

const MAPPING_ANNOTATIONS: &[&str] = &[
    "RequestMapping",
    "GetMapping",
    "PostMapping",
    "PutMapping",
    "DeleteMapping",
    "PatchMapping",
];

const GUARD_ANNOTATIONS: &[&str] = &["PreAuthorize", "Secured", "RolesAllowed"];

pub struct SecurityAnalyzer;

impl Analyzer for SecurityAnalyzer {
    fn id(&self) -> &'static str {
        "security"
    }

    fn required_graphs(&self) -> Capabilities {
        Capabilities::default()
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> AnalyzerReport {
        let mut report = AnalyzerReport::default();
        // hasRole('X') / hasAuthority("X") out of guard expressions
        let role_re = match Regex::new(r#"has(?:Any)?(?:Role|Authority)\s*\(\s*['"]([^'"]+)"#) {
            Ok(re) => re,
            Err(_) => return report,
        };

        let mut unprotected = 0u32;
        let mut wildcard_cors = 0u32;

        for class in ctx.pool.application_classes() {
            let is_controller =
                class.has_annotation("RestController") || class.has_annotation("Controller");
            if !is_controller {
                continue;
            }
            let class_guard = guard_of(class);

            if let Some(issue) = wildcard_cors_issue(ctx, class, None, class.annotation("CrossOrigin")) {
                wildcard_cors += 1;
                report.issues.push(issue);
            }

            for method in &class.methods {
                let mapped = MAPPING_ANNOTATIONS.iter().any(|a| method.has_annotation(a));
                if !mapped {
                    continue;
                }

                if let Some(issue) =
                    wildcard_cors_issue(ctx, class, Some(method), method.annotation("CrossOrigin"))
                {
                    wildcard_cors += 1;
                    report.issues.push(issue);
                }

                let method_guard = method_guard_of(method);
                if method_guard.is_none() && class_guard.is_none() {
                    unprotected += 1;
                    report.issues.push(Issue {
                        analyzer: "security".to_string(),
                        category: "unprotected_endpoint".to_string(),
                        severity: ctx.config.severity_for("unprotected_endpoint", Severity::High),
                        location: IssueLocation::method(&class.name, &method.name),
                        description: format!(
                            "endpoint {} on {} has no @PreAuthorize, @Secured or @RolesAllowed guard",
                            endpoint_path(method).unwrap_or_else(|| method.name.clone()),
                            class.simple_name
                        ),
                        recommendation: Some(
                            "guard the handler, or document it as intentionally public in the security config".to_string(),
                        ),
                    });
                } else if let Some(expr) = method_guard.or(class_guard.clone()) {
                    // guarded endpoints surface their roles for the report
                    let roles: Vec<&str> = role_re
                        .captures_iter(&expr)
                        .filter_map(|c| c.get(1).map(|m| m.as_str()))
                        .collect();
                    if !roles.is_empty() {
                        report.issues.push(Issue {
                            analyzer: "security".to_string(),
                            category: "guarded_endpoint".to_string(),
                            severity: Severity::Low,
                            location: IssueLocation::method(&class.name, &method.name),
                            description: format!(
                                "endpoint requires role(s): {}",
                                roles.join(", ")
                            ),
                            recommendation: None,
                        });
                    }
                }
            }
        }

        let config = ctx.config;
        report.score.record(
            "unprotected_endpoint",
            config.weight_for("security", "unprotected_endpoint", UNPROTECTED_WEIGHT),
            unprotected,
        );
        report.score.record(
            "wildcard_cors",
            config.weight_for("security", "wildcard_cors", WILDCARD_CORS_WEIGHT),
            wildcard_cors,
        );
        report
    }
}

fn guard_of(class: &ClassModel) -> Option<String> {
    GUARD_ANNOTATIONS.iter().find_map(|g| {
        class
            .annotation(g)
            .map(|a| a.string_member("value").unwrap_or_default().to_string())
    })
}

fn method_guard_of(method: &MethodModel) -> Option<String> {
    GUARD_ANNOTATIONS.iter().find_map(|g| {
        method
            .annotation(g)
            .map(|a| a.string_member("value").unwrap_or_default().to_string())
    })
}

fn endpoint_path(method: &MethodModel) -> Option<String> {
    MAPPING_ANNOTATIONS.iter().find_map(|a| {
        let ann = method.annotation(a)?;
        let value = ann.member("value").or_else(|| ann.member("path"))?;
        value
            .iter_flat()
            .next()
            .and_then(AnnotationValue::as_str)
            .map(String::from)
    })
}

fn wildcard_cors_issue(
    ctx: &AnalysisContext<'_>,
    class: &ClassModel,
    method: Option<&MethodModel>,
    cors: Option<&crate::model::AnnotationModel>,
) -> Option<Issue> {
    let cors = cors?;
    let origins = cors.member("origins").or_else(|| cors.member("value"));
    // @CrossOrigin with no member defaults to all origins
    let wildcard = match origins {
        None => true,
        Some(v) => v
            .iter_flat()
            .filter_map(AnnotationValue::as_str)
            .any(|o| o == "*"),
    };
    if !wildcard {
        return None;
    }
    let location = match method {
        Some(m) => IssueLocation::method(&class.name, &m.name),
        None => IssueLocation::class(&class.name),
    };
    Some(Issue {
        analyzer: "security".to_string(),
        category: "wildcard_cors".to_string(),
        severity: ctx.config.severity_for("wildcard_cors", Severity::High),
        location,
        description: "@CrossOrigin allows every origin".to_string(),
        recommendation: Some("list the origins that actually need access".to_string()),
    })
}
