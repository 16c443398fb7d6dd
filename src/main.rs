use std::io::{self, IsTerminal};

use anyhow::{anyhow, Result};
use clap::Parser;
use colored::*;
use tracing_subscriber::EnvFilter;

use edgefinder::cli::Cli;
use edgefinder::config::Config;
use edgefinder::dispatch::Dispatcher;
use edgefinder::error::EdgeError;
use edgefinder::interactive::Prompter;
use edgefinder::output::banner;
use edgefinder::tools::deps::{preflight, probes, ProbeStatus};
use edgefinder::tools::SystemInvoker;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.quiet)?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    if !cli.quiet {
        eprintln!("{}", banner());
    }

    if let Err(err) = execute(&cli).await {
        eprintln!("{} {}", "Error:".red().bold(), err);
        std::process::exit(err.exit_code());
    }

    Ok(())
}

fn init_tracing(quiet: bool) -> Result<()> {
    let default_level = if quiet { "edgefinder=warn" } else { "edgefinder=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))
}

async fn execute(cli: &Cli) -> Result<(), EdgeError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(secs) = cli.timeout {
        config.tool_timeout_secs = Some(secs);
    }

    let mut request = if cli.interactive {
        let stdin = io::stdin();
        Prompter::new(stdin.lock(), io::stdout()).collect()?
    } else {
        cli.to_request()?
    };
    request.show_progress = !cli.quiet && io::stderr().is_terminal();
    request.validate()?;

    let invoker = SystemInvoker::new();

    if !cli.skip_checks {
        let list = probes(&config.tools, request.needs());
        let missing: Vec<_> = preflight(&invoker, &list, config.preflight_timeout())
            .await
            .into_iter()
            .filter(|outcome| outcome.status == ProbeStatus::Missing)
            .map(|outcome| outcome.command)
            .collect();
        if !missing.is_empty() && !cli.quiet {
            eprintln!(
                "{} not found on PATH: {}. The run stops when it first needs one of them.",
                "Warning:".yellow().bold(),
                missing.join(", ")
            );
        }
    }

    let report = Dispatcher::new(&invoker, &config)
        .run(&request, &mut io::stdout())
        .await?;

    if !cli.quiet {
        eprintln!("\n{}", report.summary.render());
    }

    Ok(())
}
