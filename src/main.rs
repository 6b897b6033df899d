use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use cxx_refactor::compdb::CompilationDatabase;
use cxx_refactor::config::{self, ColorChoice};
use cxx_refactor::frontend::{Frontend, FrontendCommand};
use cxx_refactor::{Driver, FileStatus, MessageFormat, RuleKind, RunOptions, StreamReporter};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cxx-refactor")]
#[command(about = "Automated refactoring fixes for C++ sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Source files to refactor
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Build directory containing compile_commands.json
    #[arg(short = 'p', long)]
    build_path: Option<PathBuf>,

    /// Config file (default: .cxx-refactor.toml in the current directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory scanned for *.facts.json dumps
    #[arg(long)]
    facts_dir: Option<PathBuf>,

    /// Front-end command printing a fact dump (overrides the config)
    #[arg(long)]
    frontend: Option<String>,

    /// Disable a rule by name or code (repeatable)
    #[arg(long, value_name = "RULE")]
    disable: Vec<RuleKind>,

    /// Dry run - report fixes without modifying files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(long)]
    diff: bool,

    /// Diagnostic output format
    #[arg(long, value_enum)]
    message_format: Option<MessageFormat>,

    /// Colour diagnostics
    #[arg(long, value_enum)]
    color: Option<ColorChoice>,

    /// Log level for tracing output
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Arguments forwarded to the front-end
    #[arg(last = true)]
    compiler_args: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    let succeeded = run(cli)?;
    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Returns whether every file produced facts.
fn run(cli: Cli) -> Result<bool> {
    let cwd = env::current_dir().context("failed to read the current directory")?;
    let tool_config = config::resolve(cli.config.as_deref(), &cwd)?;

    let mut rules = tool_config.rule_set();
    for rule in &cli.disable {
        rules.disable(*rule);
    }

    let color = cli.color.unwrap_or(tool_config.output.color);
    match color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    let format = cli.message_format.unwrap_or(tool_config.output.message_format);

    let command = cli.frontend.or(tool_config.frontend.command);
    let mut frontend = match command {
        Some(program) => Frontend::with_command(FrontendCommand {
            program,
            args: tool_config.frontend.args,
        }),
        None => Frontend::sidecar(),
    };
    if let Some(dir) = &cli.facts_dir {
        frontend = frontend.index_dir(dir)?;
    }

    let options = RunOptions {
        rules,
        dry_run: cli.dry_run,
    };
    let mut driver = Driver::new(frontend, options)
        .with_forwarded_args(cli.compiler_args)
        .with_cwd(&cwd);
    if let Some(build_path) = &cli.build_path {
        driver = driver.with_compdb(CompilationDatabase::load(build_path)?);
    }

    let mut reporter = StreamReporter::stderr(format, color.enabled());
    let summary = driver.run(&cli.files, &mut reporter);

    if cli.diff {
        for report in &summary.files {
            if report.buffer.is_modified() && report.status != FileStatus::Stale {
                display_diff(
                    report.buffer.path(),
                    &String::from_utf8_lossy(report.buffer.original()),
                    &report.buffer.render_lossy(),
                );
            }
        }
    }

    tracing::info!(
        files = summary.files.len(),
        failed = summary.failures.len(),
        edits = summary.edits(),
        "run finished"
    );

    Ok(summary.is_success())
}

fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (refactored)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", line);
    }
    println!();
}
