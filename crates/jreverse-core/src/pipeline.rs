//! The four-stage pipeline: Ingestion, Model, Graphs, Rules. Strictly
//! forward; each stage's output is immutable before the next starts.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use jreverse_classfile::{load_with, ArchiveLayout, LoadOptions};

use crate::builder::build_pool;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::engine::{AnalysisContext, RuleEngine};
use crate::graph::Graphs;
use crate::model::{ClassPool, DuplicateClass};
use crate::score::{QualityScore, ScoreBands};
use crate::types::{AnalyzerFailure, Issue, LoadErrorRecord};

pub struct AnalysisPipeline {
    engine: RuleEngine,
    config: Config,
}

/// Everything one run produced. Renderers read this and nothing else.
pub struct AnalysisResult {
    pub pool: ClassPool,
    pub graphs: Graphs,
    pub issues_by_analyzer: BTreeMap<String, Vec<Issue>>,
    pub scores_by_analyzer: BTreeMap<String, QualityScore>,
    pub load_errors: Vec<LoadErrorRecord>,
    pub duplicates: Vec<DuplicateClass>,
    pub failures: Vec<AnalyzerFailure>,
    pub layout: ArchiveLayout,
    pub bands: ScoreBands,
    /// True when a cancellation or deadline cut the run short.
    pub incomplete: bool,
}

impl AnalysisResult {
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues_by_analyzer.values().flatten()
    }
}

impl AnalysisPipeline {
    pub fn new(engine: RuleEngine, config: Config) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn analyze(&self, jar: &Path) -> anyhow::Result<AnalysisResult> {
        let cancel = match self.config.analysis.deadline_secs {
            Some(secs) => CancelToken::with_deadline(Duration::from_secs(secs)),
            None => CancelToken::new(),
        };
        self.analyze_with(jar, &cancel)
    }

    /// Only a failure to open the root archive is an `Err`; everything
    /// else, malformed entries included, is data in the result.
    pub fn analyze_with(&self, jar: &Path, cancel: &CancelToken) -> anyhow::Result<AnalysisResult> {
        let options = LoadOptions {
            deep_library_scan: self.config.analysis.deep_library_scan,
        };
        let archive = load_with(jar, &options)?;
        let load_errors = archive
            .errors
            .iter()
            .map(|e| LoadErrorRecord {
                entry: e.path.clone(),
                message: e.error.to_string(),
            })
            .collect();
        let layout = archive.layout;

        let pool = build_pool(&archive, cancel);
        let graphs = Graphs::build_with(&pool, self.engine.required_graphs(), cancel);

        let ctx = AnalysisContext {
            pool: &pool,
            graphs: &graphs,
            config: &self.config,
        };
        let output = self.engine.run(&ctx, cancel);

        let duplicates = pool.duplicates.clone();
        Ok(AnalysisResult {
            pool,
            graphs,
            issues_by_analyzer: output.issues_by_analyzer,
            scores_by_analyzer: output.scores_by_analyzer,
            load_errors,
            duplicates,
            failures: output.failures,
            layout,
            bands: self.config.scoring.bands,
            incomplete: cancel.is_cancelled(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::default_registry;
    use std::fs::File;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn pipeline() -> AnalysisPipeline {
        let config = Config::default();
        let engine = RuleEngine::new(default_registry(&config));
        AnalysisPipeline::new(engine, config)
    }

    fn empty_jar(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("app.jar");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"Manifest-Version: 1.0\n").unwrap();
        zip.finish().unwrap();
        path
    }

    #[test]
    fn test_missing_archive_is_hard_error() {
        let result = pipeline().analyze(Path::new("/nonexistent/app.jar"));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_archive_analyzes_clean() {
        let dir = tempfile::tempdir().unwrap();
        let result = pipeline().analyze(&empty_jar(dir.path())).unwrap();
        assert!(result.pool.is_empty());
        assert!(!result.incomplete);
        assert_eq!(result.layout, ArchiveLayout::PlainJar);
        // every registered analyzer reported
        assert_eq!(result.scores_by_analyzer.len(), 6);
        assert!(result.issues().next().is_none());
    }

    #[test]
    fn test_malformed_entry_is_data_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jar");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("com/acme/Broken.class", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(&[0u8; 16]).unwrap();
        zip.finish().unwrap();

        let result = pipeline().analyze(&path).unwrap();
        assert_eq!(result.load_errors.len(), 1);
        assert_eq!(result.load_errors[0].entry, "com/acme/Broken.class");
        assert!(result.pool.is_empty());
    }

    #[test]
    fn test_deep_library_scan_option_reaches_loader() {
        let dir = tempfile::tempdir().unwrap();
        let jar = empty_jar(dir.path());
        let mut config = Config::default();
        config.analysis.deep_library_scan = true;
        let engine = RuleEngine::new(default_registry(&config));
        let result = AnalysisPipeline::new(engine, config).analyze(&jar).unwrap();
        assert!(result.load_errors.is_empty());
        assert_eq!(result.layout, ArchiveLayout::PlainJar);
    }

    #[test]
    fn test_cancelled_run_marked_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let jar = empty_jar(dir.path());
        let token = CancelToken::new();
        token.cancel();
        let result = pipeline().analyze_with(&jar, &token).unwrap();
        assert!(result.incomplete);
        assert!(result.scores_by_analyzer.is_empty());
    }
}
