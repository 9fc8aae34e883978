//! Semantic modeling, graph construction and the rule/scoring engine.
//!
//! The crate is organized as a strictly forward pipeline: a raw archive
//! from `jreverse-classfile` becomes an immutable [`model::ClassPool`],
//! the pool becomes the [`graph::Graphs`], and the [`engine::RuleEngine`]
//! reads both to produce issues and scores. Nothing executes target code.

pub mod analyzers;
pub mod builder;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod graph;
pub mod model;
pub mod pipeline;
pub mod score;
pub mod types;

pub use jreverse_classfile::ArchiveLayout;

pub use analyzers::default_registry;
pub use builder::build_pool;
pub use cancel::CancelToken;
pub use config::{default_toml, Config, CONFIG_FILE};
pub use engine::{AnalysisContext, Analyzer, AnalyzerReport, RuleEngine};
pub use graph::{Capabilities, Graphs};
pub use model::{ClassModel, ClassPool};
pub use pipeline::{AnalysisPipeline, AnalysisResult};
pub use score::{QualityScore, ScoreBands, ScoreLevel};
pub use types::{AnalyzerFailure, Issue, IssueLocation, LoadErrorRecord, Severity};
