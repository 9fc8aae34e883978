use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use jreverse_core::config::{default_toml, Config, CONFIG_FILE};
use jreverse_core::pipeline::{AnalysisPipeline, AnalysisResult};
use jreverse_core::types::Severity;
use jreverse_core::{default_registry, RuleEngine};

use jreverse_report::{dot, json, text};

#[derive(Parser)]
#[command(name = "jreverse")]
#[command(about = "Analyze compiled Java/Spring Boot JARs without running them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a JAR and print a full report
    Analyze {
        /// Path to the JAR archive
        jar: PathBuf,
        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Config file path (defaults to .jreverse.toml near the JAR)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Abort with partial results after this many seconds
        #[arg(long)]
        deadline: Option<u64>,
    },
    /// Analyze and exit with code 0 (pass) or 1 (fail)
    Check {
        /// Path to the JAR archive
        jar: PathBuf,
        /// Minimum severity to cause failure (overrides config)
        #[arg(long)]
        fail_on: Option<Severity>,
        /// Fail when any analyzer scores below this (overrides config)
        #[arg(long)]
        min_score: Option<u8>,
        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Emit a GraphViz diagram of the dependency-injection graph
    Graph {
        /// Path to the JAR archive
        jar: PathBuf,
        /// Write the diagram to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Create a default .jreverse.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            jar,
            format,
            output,
            config,
            deadline,
        } => cmd_analyze(&jar, format, output.as_deref(), config.as_deref(), deadline),
        Commands::Check {
            jar,
            fail_on,
            min_score,
            format,
            config,
        } => cmd_check(&jar, fail_on, min_score, format, config.as_deref()),
        Commands::Graph {
            jar,
            output,
            config,
        } => cmd_graph(&jar, output.as_deref(), config.as_deref()),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn cmd_analyze(
    jar: &Path,
    format: Format,
    output: Option<&Path>,
    config_path: Option<&Path>,
    deadline: Option<u64>,
) -> Result<()> {
    let mut config = load_config(jar, config_path)?;
    if deadline.is_some() {
        config.analysis.deadline_secs = deadline;
    }
    let result = run_analysis(jar, config)?;
    let report = match format {
        Format::Text => text::format_report(&result),
        Format::Json => json::format_report(&result, false),
    };
    emit(&report, output)
}

fn cmd_check(
    jar: &Path,
    fail_on: Option<Severity>,
    min_score: Option<u8>,
    format: Format,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(jar, config_path)?;
    let fail_on = fail_on.unwrap_or(config.rules.fail_on);
    let min_score = min_score.or(config.rules.min_score);
    let result = run_analysis(jar, config)?;
    let (report, passed) = match format {
        Format::Text => text::format_check(&result, fail_on, min_score),
        Format::Json => json::format_check(&result, fail_on, min_score, false),
    };
    print!("{report}");
    if !passed {
        process::exit(1);
    }
    Ok(())
}

fn cmd_graph(jar: &Path, output: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(jar, config_path)?;
    let result = run_analysis(jar, config)?;
    let diagram = dot::generate_di_diagram(&result.graphs.dependency);
    emit(&diagram, output)
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    fs::write(&target, default_toml())?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn load_config(jar: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => {
            let start = jar.parent().unwrap_or(Path::new("."));
            Config::load_or_default(start)
        }
    }
}

fn run_analysis(jar: &Path, config: Config) -> Result<AnalysisResult> {
    let engine = RuleEngine::new(default_registry(&config));
    let pipeline = AnalysisPipeline::new(engine, config);
    pipeline
        .analyze(jar)
        .with_context(|| format!("analyzing {}", jar.display()))
}

fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("writing report to {}", path.display())),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}
