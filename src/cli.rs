//! Command-line interface for readme-lens.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::config::{self, Config, DEFAULT_CONFIG};
use crate::logging;
use crate::readme::{find_readmes, ReadmeParser};
use crate::registry::AnalyzerRegistry;
use crate::report::{self, FileReport, OutputFormat};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Turn project READMEs into structured, confidence-scored project metadata.
///
/// readme-lens parses a README, runs several independent analyzers over it
/// (languages, commands, dependencies, testing, metadata) and merges their
/// findings into one record with per-category confidence scores.
#[derive(Parser)]
#[command(name = "readme-lens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a README file, or every README under a directory
    #[command(visible_alias = "analyze")]
    Parse(ParseArgs),
    /// Write a default configuration file
    Init(InitArgs),
    /// List the analyzers a configuration registers
    Analyzers(AnalyzersArgs),
}

/// Arguments for the parse command.
#[derive(Parser)]
pub struct ParseArgs {
    /// README file or directory to search for README files
    pub path: PathBuf,

    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, or yaml
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Per-analyzer timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Run analyzers one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Include informational diagnostics in pretty output
    #[arg(long)]
    pub show_info: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "readme-lens.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the analyzers command.
#[derive(Parser)]
pub struct AnalyzersArgs {
    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Dispatch a parsed command line and return the process exit code.
pub fn run(cli: Cli) -> i32 {
    logging::init_logging(cli.verbose);
    let outcome = match &cli.command {
        Commands::Parse(args) => run_parse(args),
        Commands::Init(args) => run_init(args),
        Commands::Analyzers(args) => run_analyzers(args),
    };
    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    }
}

/// Load and validate the configuration, printing why on failure.
fn load_config(explicit: Option<&Path>) -> Option<Config> {
    let (config, source) = match Config::load(explicit) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return None;
        }
    };
    if let Err(e) = config::validate(&config) {
        eprintln!("Error: invalid configuration: {}", e);
        return None;
    }
    match &source {
        Some(path) => tracing::info!(config = %path.display(), "configuration loaded"),
        None => tracing::info!("no configuration file found, using defaults"),
    }
    Some(config)
}

/// Run the parse command.
pub fn run_parse(args: &ParseArgs) -> anyhow::Result<i32> {
    let Some(format) = OutputFormat::parse(&args.format) else {
        eprintln!(
            "Error: invalid format {:?}, must be one of {}",
            args.format,
            OutputFormat::NAMES.join(", ")
        );
        return Ok(EXIT_ERROR);
    };

    let Some(mut config) = load_config(args.config.as_deref()) else {
        return Ok(EXIT_ERROR);
    };
    if let Some(ms) = args.timeout_ms {
        if ms == 0 {
            eprintln!("Error: --timeout-ms must be greater than zero");
            return Ok(EXIT_ERROR);
        }
        config.analyzer_timeout_ms = Some(ms);
    }
    if args.sequential {
        config.parallel = Some(false);
    }

    let metadata = match std::fs::metadata(&args.path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    let files = if metadata.is_dir() {
        find_readmes(&args.path)?
    } else {
        vec![args.path.clone()]
    };
    if files.is_empty() {
        eprintln!("Warning: no README files found under {}", args.path.display());
        return Ok(EXIT_SUCCESS);
    }

    let parser = ReadmeParser::new(config)?;
    let reports = parse_all(&parser, &files, format == OutputFormat::Pretty);

    match format {
        OutputFormat::Json => report::write_json(&reports)?,
        OutputFormat::Yaml => report::write_yaml(&reports)?,
        OutputFormat::Pretty => report::write_pretty(&reports, args.show_info),
    }

    if reports.iter().all(|r| r.result.success) {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Parse every file, in parallel when there are several. Output order
/// follows `files`.
fn parse_all(parser: &ReadmeParser, files: &[PathBuf], show_progress: bool) -> Vec<FileReport> {
    let progress = if show_progress && files.len() > 1 {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("  {spinner} [{bar:30}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let reports = files
        .par_iter()
        .map(|path| {
            let result = parser.parse_file(path);
            progress.set_message(path.display().to_string());
            progress.inc(1);
            FileReport {
                path: path.display().to_string(),
                result,
            }
        })
        .collect();
    progress.finish_and_clear();
    reports
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it, pass --force, or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, DEFAULT_CONFIG) {
        eprintln!("Error: failed to write configuration: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to tune thresholds or add pattern analyzers", args.output.display());
    println!("  2. Run: readme-lens parse README.md --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

/// Run the analyzers command.
pub fn run_analyzers(args: &AnalyzersArgs) -> anyhow::Result<i32> {
    let Some(config) = load_config(args.config.as_deref()) else {
        return Ok(EXIT_ERROR);
    };
    let registry = AnalyzerRegistry::with_builtins(&config)?;

    println!("Registered analyzers:");
    println!();
    for info in registry.describe() {
        let mut roles = Vec::new();
        if info.capabilities.provides_context {
            roles.push("provides context");
        }
        if info.capabilities.uses_context {
            roles.push("uses context");
        }
        if roles.is_empty() {
            println!("  {}", info.name);
        } else {
            println!("  {:<22} ({})", info.name, roles.join(", "));
        }
    }
    for name in &config.disabled_analyzers {
        println!("  {:<22} (disabled)", name);
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "readme-lens",
            "-vv",
            "parse",
            "README.md",
            "--format",
            "json",
            "--timeout-ms",
            "250",
            "--sequential",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Parse(args) => {
                assert_eq!(args.path, PathBuf::from("README.md"));
                assert_eq!(args.format, "json");
                assert_eq!(args.timeout_ms, Some(250));
                assert!(args.sequential);
            }
            _ => panic!("expected parse"),
        }
    }

    #[test]
    fn test_invalid_format_is_usage_error() {
        let args = ParseArgs {
            path: PathBuf::from("README.md"),
            config: None,
            format: "sarif".to_string(),
            timeout_ms: None,
            sequential: false,
            show_info: false,
        };
        assert_eq!(run_parse(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_parse_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("README.md");
        std::fs::write(&good, "# demo\n\n```bash\nnpm install\n```\n").unwrap();
        let config = dir.path().join("readme-lens.yaml");
        std::fs::write(&config, DEFAULT_CONFIG).unwrap();

        let mut args = ParseArgs {
            path: good,
            config: Some(config),
            format: "json".to_string(),
            timeout_ms: None,
            sequential: true,
            show_info: false,
        };
        assert_eq!(run_parse(&args).unwrap(), EXIT_SUCCESS);

        let binary = dir.path().join("docs");
        std::fs::create_dir_all(&binary).unwrap();
        std::fs::write(binary.join("README.md"), b"\0\0\0").unwrap();
        args.path = binary;
        assert_eq!(run_parse(&args).unwrap(), EXIT_FAILED);

        args.path = dir.path().join("missing");
        assert_eq!(run_parse(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_init_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("conf/readme-lens.yaml");
        let args = InitArgs {
            output: output.clone(),
            force: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), DEFAULT_CONFIG);
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
    }
}
