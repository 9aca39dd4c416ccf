use std::path::PathBuf;

use clap::Parser;

use scriptflow::{sflog, Config, Driver, TaskResult};

/// Scriptflow - directory-driven script tree scheduler
#[derive(Parser, Debug)]
#[command(name = "scriptflow")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    SCRIPTFLOW_DEBUG=1     Enable debug logging (alternative to --debug)"
)]
pub struct Cli {
    /// Root directory of the script tree (overrides the configured root)
    pub root: Option<PathBuf>,

    /// Path to the config file (default: ~/.scriptflow/scriptflow.toml)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Log statements instead of executing them
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Enable debug logging (writes to ~/.scriptflow/scriptflow.log)
    #[arg(long)]
    pub debug: bool,

    /// Script parameter as KEY=VALUE (repeatable)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Pool status logging interval in seconds
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Backend command that reads statements from stdin
    #[arg(long, value_name = "COMMAND")]
    pub backend: Option<String>,

    /// Script file suffix to include (default: .sql)
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// Print the task tree and exit without running
    #[arg(long)]
    pub tree: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_param(raw: &str) -> scriptflow::Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(scriptflow::Error::InvalidParam(raw.to_string())),
    }
}

/// Layer CLI flags over the loaded config file.
fn merge_config(mut config: Config, cli: &Cli) -> Config {
    if let Some(root) = &cli.root {
        config.root = Some(root.clone());
    }
    if cli.dry_run {
        config.dry_run = true;
    }
    if let Some(interval) = cli.interval {
        config.poll_interval_secs = interval;
    }
    if let Some(backend) = &cli.backend {
        config.backend_command = Some(backend.clone());
    }
    if let Some(suffix) = &cli.suffix {
        config.script_suffix = suffix.clone();
    }
    for (key, value) in &cli.params {
        config.params.insert(key.clone(), value.clone());
    }
    config
}

fn run(cli: Cli) -> scriptflow::Result<i32> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let config = merge_config(config, &cli);

    if cli.tree {
        let driver = Driver::with_backend(config, std::sync::Arc::new(NullBackend));
        print!("{}", driver.build_queue()?);
        return Ok(0);
    }

    let driver = Driver::from_config(config)?;
    let report = driver.run()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} in {:.1}s", report.result, report.duration_secs);
    }

    Ok(if report.result == TaskResult::Success {
        0
    } else {
        1
    })
}

/// Tree printing never executes anything.
struct NullBackend;

impl scriptflow::backend::ScriptBackend for NullBackend {
    fn run_statement(&self, _statement: &str) -> scriptflow::Result<()> {
        Err(scriptflow::Error::NoBackend)
    }
}

fn main() {
    let cli = Cli::parse();
    scriptflow::log::init_with_debug(cli.debug);
    sflog!("scriptflow starting");

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}
