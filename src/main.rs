use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::ThreadPool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use treescan::config::{load_from_path, RuleSetConfig};
use treescan::scan::{metrics, Metric, SeverityCounts};
use treescan::ts::queries;
use treescan::{
    EngineSettings, Language, ResultRecord, Rule, ScanMode, Scanner, ScannerOptions, Severity,
};
use walkdir::WalkDir;

/// Exit status when at least one finding was reported.
const EXIT_FINDINGS: i32 = 1;
/// Exit status when a file or rule could not be processed.
const EXIT_FAILURE: i32 = 2;

#[derive(Parser)]
#[command(name = "treescan")]
#[command(about = "Rule-driven static analysis over tree-sitter syntax trees", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report rule violations
    Scan(RunArgs),

    /// Count matches per rule
    Measure(RunArgs),

    /// Print the text of every node captured by a query as a JSON array
    Dump {
        /// Source file
        path: PathBuf,

        /// Query to run (defaults to listing syntax errors)
        #[arg(short, long)]
        query: Option<String>,

        /// Grammar to use instead of detecting it from the extension
        #[arg(short, long)]
        lang: Option<Language>,
    },

    /// List the rules declared in a rule file
    Rules {
        /// Rule set (TOML or JSON)
        #[arg(short, long)]
        rules: PathBuf,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Files or directories to scan
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Rule set (TOML or JSON)
    #[arg(short, long)]
    rules: PathBuf,

    /// Grammar to use instead of the rule set's or the file extension's
    #[arg(short, long)]
    lang: Option<Language>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Evaluate rules one at a time
    #[arg(long)]
    sequential: bool,

    /// Worker threads for rule evaluation (0 = one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Lowest severity that makes `scan` exit with findings
    #[arg(long, default_value_t = Severity::Info)]
    fail_on: Severity,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let status = match cli.command {
        Commands::Scan(args) => cmd_run(args, ScanMode::Scan)?,
        Commands::Measure(args) => cmd_run(args, ScanMode::Measure)?,
        Commands::Dump { path, query, lang } => cmd_dump(&path, query.as_deref(), lang)?,
        Commands::Rules { rules } => cmd_rules(&rules)?,
    };

    if status != 0 {
        std::process::exit(status);
    }
    Ok(())
}

/// Per-invocation state shared by every scanned file.
struct RunContext {
    rules: Vec<Arc<dyn Rule>>,
    language: Option<Language>,
    settings: EngineSettings,
    thread_pool: Option<Arc<ThreadPool>>,
}

impl RunContext {
    fn new(config: &RuleSetConfig, args: &RunArgs) -> Result<Self> {
        let rules = config.build_rules()?;

        let mut settings = config.engine;
        if args.sequential {
            settings.parallel = false;
        }
        if let Some(jobs) = args.jobs {
            settings.jobs = jobs;
        }

        Ok(Self {
            rules,
            language: args.lang.or_else(|| config.language()),
            thread_pool: settings.build_pool(),
            settings,
        })
    }

    fn options(&self, path: &Path) -> ScannerOptions {
        let mut options =
            ScannerOptions::new(path, self.rules.clone()).with_settings(self.settings);
        if let Some(language) = self.language {
            options = options.with_language(language);
        }
        if let Some(pool) = &self.thread_pool {
            options = options.with_thread_pool(Arc::clone(pool));
        }
        options
    }
}

fn cmd_run(args: RunArgs, mode: ScanMode) -> Result<i32> {
    let config = load_from_path(&args.rules)?;
    let context = RunContext::new(&config, &args)?;
    let files = collect_sources(&args.paths, context.language)?;

    if files.is_empty() {
        eprintln!("{}", "Warning: no source files matched".yellow());
        return Ok(0);
    }

    let mut records: Vec<ResultRecord> = Vec::new();
    let mut totals: Vec<Metric> = Vec::new();
    let mut counts = SeverityCounts::default();
    let mut failed = 0usize;

    for path in &files {
        let scanner = match Scanner::create(context.options(path)) {
            Ok(scanner) => scanner,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                failed += 1;
                continue;
            }
        };

        let outcome = scanner.execute(mode);
        for failure in &outcome.failures {
            eprintln!(
                "{} {}: {}",
                "✗".red(),
                path.display(),
                failure.error
            );
        }
        if !outcome.failures.is_empty() {
            failed += 1;
        }

        match mode {
            ScanMode::Scan => {
                counts.merge(SeverityCounts::from_results(&outcome.results));
                records.extend(outcome.results.iter().map(|r| r.to_record()));
            }
            ScanMode::Measure => {
                merge_metrics(
                    &mut totals,
                    metrics(&context.rules, mode, &outcome.results),
                );
            }
        }
    }

    match (mode, args.format) {
        (ScanMode::Scan, Format::Json) => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        (ScanMode::Scan, Format::Text) => print_findings(&records, &counts, files.len()),
        (ScanMode::Measure, Format::Json) => {
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
        (ScanMode::Measure, Format::Text) => print_metrics(&totals, files.len()),
    }

    let status = if failed > 0 {
        EXIT_FAILURE
    } else if mode == ScanMode::Scan && exceeds(&counts, args.fail_on) {
        EXIT_FINDINGS
    } else {
        0
    };
    Ok(status)
}

fn cmd_dump(path: &Path, query: Option<&str>, language: Option<Language>) -> Result<i32> {
    let mut options = ScannerOptions::new(path, Vec::new());
    if let Some(language) = language {
        options = options.with_language(language);
    }
    let scanner = Scanner::create(options)?;
    let query = query.unwrap_or(queries::DEFAULT_DUMP_QUERY);
    let dump = scanner
        .dump(query)
        .with_context(|| format!("failed to run query against {}", path.display()))?;
    println!("{dump}");
    Ok(0)
}

fn cmd_rules(rules_path: &Path) -> Result<i32> {
    let config = load_from_path(rules_path)?;
    let rules = config.build_rules()?;

    let title = if config.meta.name.is_empty() {
        rules_path.display().to_string()
    } else {
        config.meta.name.clone()
    };
    println!("{}", title.bold());
    if let Some(language) = config.language() {
        println!("Language: {}", language);
    }
    println!();

    for rule in &rules {
        let meta = rule.meta();
        println!(
            "  {} {} [{}] {}",
            colorize_severity(meta.effective_severity()),
            meta.id(),
            meta.context(),
            meta.name()
        );
        if !meta.category().is_empty() {
            println!("      {}", meta.category().dimmed());
        }
    }
    println!();
    println!("{} rule(s)", rules.len());
    Ok(0)
}

/// Expand directories into the source files they contain.
///
/// Explicit file arguments are kept as given; walked files must have an
/// extension of `language` (or of any supported language when unset).
fn collect_sources(paths: &[PathBuf], language: Option<Language>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut walked = Vec::new();
        for entry in WalkDir::new(path) {
            let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let detected = Language::from_path(entry.path());
            let keep = match language {
                Some(language) => detected == Some(language),
                None => detected.is_some(),
            };
            if keep {
                walked.push(entry.path().to_path_buf());
            }
        }
        walked.sort();
        files.extend(walked);
    }
    Ok(files)
}

fn merge_metrics(totals: &mut Vec<Metric>, file_metrics: Vec<Metric>) {
    if totals.is_empty() {
        *totals = file_metrics;
        return;
    }
    for (total, metric) in totals.iter_mut().zip(file_metrics) {
        total.count += metric.count;
    }
}

fn colorize_severity(severity: Severity) -> colored::ColoredString {
    let label = severity.to_string();
    match severity {
        Severity::Info => label.blue(),
        Severity::Warning => label.yellow(),
        Severity::Violation => label.red(),
        Severity::Critical => label.red().bold(),
    }
}

/// Whether any finding is at or above `threshold`.
fn exceeds(counts: &SeverityCounts, threshold: Severity) -> bool {
    counts.highest().is_some_and(|highest| highest >= threshold)
}

fn print_findings(records: &[ResultRecord], counts: &SeverityCounts, file_count: usize) {
    for record in records {
        let location = match &record.file {
            Some(file) => format!("{}:{}:{}", file.display(), record.line, record.column),
            None => format!("{}:{}", record.line, record.column),
        };
        println!(
            "{} {} {} {}",
            location,
            colorize_severity(record.severity),
            format!("[{}]", record.rule_id).dimmed(),
            record.message
        );
        if !record.suggestion.is_empty() {
            println!("    {} {}", "→".cyan(), record.suggestion);
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} file(s) scanned", file_count);
    println!("  {} critical", format!("{}", counts.critical).red());
    println!("  {} violation(s)", format!("{}", counts.violation).red());
    println!("  {} warning(s)", format!("{}", counts.warning).yellow());
    println!("  {} info", format!("{}", counts.info).blue());
}

fn print_metrics(totals: &[Metric], file_count: usize) {
    println!("{}", "Metrics:".bold());
    let width = totals.iter().map(|m| m.rule_id.len()).max().unwrap_or(0);
    for metric in totals {
        println!(
            "  {:<width$}  {:>6}  {}",
            metric.rule_id,
            metric.count,
            metric.name.dimmed(),
            width = width
        );
    }
    println!();
    println!("  {} file(s) measured", file_count);
}
