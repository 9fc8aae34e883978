use colored::Colorize;

use jreverse_core::pipeline::AnalysisResult;
use jreverse_core::score::ScoreLevel;
use jreverse_core::types::Severity;

/// Format a full analysis report for terminal output.
pub fn format_report(result: &AnalysisResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "JReverse - JAR Analysis".bold()));
    out.push_str(&format!("{}\n\n", "=".repeat(40)));

    if result.incomplete {
        out.push_str(&format!(
            "{}\n\n",
            "INCOMPLETE: the run was cancelled before all stages finished"
                .yellow()
                .bold()
        ));
    }

    out.push_str(&format!(
        "{}: {} archive, {} classes ({} application)\n",
        "Summary".bold(),
        result.layout,
        result.pool.len(),
        result.pool.application_classes().count(),
    ));

    out.push_str(&format!("\n{}\n{}\n", "Scores".bold(), "-".repeat(40)));
    for (analyzer, score) in &result.scores_by_analyzer {
        let value = score.value();
        let level = score.level(&result.bands);
        let value_str = format!("{value:>3}");
        let colored_value = match level {
            ScoreLevel::Excellent | ScoreLevel::Good => value_str.green(),
            ScoreLevel::Sufficient => value_str.yellow(),
            ScoreLevel::Critical => value_str.red(),
        };
        out.push_str(&format!(
            "  {analyzer:<12} {colored_value}/100 ({level})\n"
        ));
    }

    let issue_count = result.issues().count();
    if issue_count == 0 {
        out.push_str(&format!("\n{}\n", "No issues found!".green().bold()));
    } else {
        out.push_str(&format!(
            "\n{} ({} found)\n{}\n",
            "Issues".red().bold(),
            issue_count,
            "-".repeat(40),
        ));

        // highest severity first, analyzer order within
        let mut issues: Vec<_> = result.issues().collect();
        issues.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.analyzer.cmp(&b.analyzer)));

        for issue in issues {
            let severity_str = match issue.severity {
                Severity::Critical => "CRIT".red().bold().to_string(),
                Severity::High => "HIGH".red().bold().to_string(),
                Severity::Medium => "MED ".yellow().bold().to_string(),
                Severity::Low => "LOW ".blue().bold().to_string(),
            };
            out.push_str(&format!(
                "\n  {} [{}/{}] {}\n",
                severity_str, issue.analyzer, issue.category, issue.location,
            ));
            out.push_str(&format!("    {}\n", issue.description));
            if let Some(ref rec) = issue.recommendation {
                out.push_str(&format!("    {}: {}\n", "Suggestion".cyan(), rec));
            }
        }
    }

    if !result.load_errors.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n{}\n",
            "Unreadable entries".yellow().bold(),
            result.load_errors.len(),
            "-".repeat(40),
        ));
        for err in &result.load_errors {
            out.push_str(&format!("  {}: {}\n", err.entry, err.message));
        }
    }

    if !result.duplicates.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n",
            "Duplicate classes (first occurrence kept)".yellow().bold(),
            result.duplicates.len(),
        ));
        for dup in &result.duplicates {
            out.push_str(&format!(
                "  {}: kept {}, ignored {}\n",
                dup.name, dup.kept_origin, dup.ignored_origin
            ));
        }
    }

    if !result.failures.is_empty() {
        out.push_str(&format!(
            "\n{}\n",
            "Analyzer failures".red().bold()
        ));
        for failure in &result.failures {
            out.push_str(&format!("  {}: {}\n", failure.analyzer, failure.detail));
        }
    }

    out.push('\n');
    out
}

/// Format a check result for CI use. Returns (text, passed).
pub fn format_check(
    result: &AnalysisResult,
    fail_on: Severity,
    min_score: Option<u8>,
) -> (String, bool) {
    let failing_issues = result
        .issues()
        .filter(|i| i.severity >= fail_on)
        .count();
    let failing_scores: Vec<(&String, u8)> = result
        .scores_by_analyzer
        .iter()
        .map(|(id, score)| (id, score.value()))
        .filter(|(_, v)| min_score.is_some_and(|min| *v < min))
        .collect();

    let passed = failing_issues == 0 && failing_scores.is_empty() && result.failures.is_empty();

    let mut out = format_report(result);
    if passed {
        out.push_str(&format!("{}\n", "CHECK PASSED".green().bold()));
    } else {
        out.push_str(&format!("{}\n", "CHECK FAILED".red().bold()));
        if failing_issues > 0 {
            out.push_str(&format!(
                "  {} issue(s) at severity {} or above\n",
                failing_issues, fail_on,
            ));
        }
        for (analyzer, value) in &failing_scores {
            out.push_str(&format!(
                "  {} scored {}, below the minimum of {}\n",
                analyzer,
                value,
                min_score.unwrap_or_default(),
            ));
        }
        if !result.failures.is_empty() {
            out.push_str(&format!(
                "  {} analyzer(s) failed to run\n",
                result.failures.len()
            ));
        }
    }

    (out, passed)
}
