//! The built-in rule modules.

mod coupling;
mod cycles;
mod injection;
mod performance;
mod persistence;
mod security;

pub use coupling::CouplingAnalyzer;
pub use cycles::CycleAnalyzer;
pub use injection::InjectionAnalyzer;
pub use performance::PerformanceAnalyzer;
pub use persistence::PersistenceAnalyzer;
pub use security::SecurityAnalyzer;

use crate::config::Config;
use crate::engine::Analyzer;

/// Every built-in analyzer, filtered by the config's enable list.
pub fn default_registry(config: &Config) -> Vec<Box<dyn Analyzer>> {
    let all: Vec<Box<dyn Analyzer>> = vec![
        Box::new(InjectionAnalyzer),
        Box::new(CycleAnalyzer),
        Box::new(PersistenceAnalyzer),
        Box::new(PerformanceAnalyzer),
        Box::new(SecurityAnalyzer),
        Box::new(CouplingAnalyzer),
    ];
    all.into_iter()
        .filter(|a| config.analyzer_enabled(a.id()))
        .collect()
}
