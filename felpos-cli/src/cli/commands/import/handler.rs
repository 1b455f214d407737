//! Import command handler

use anyhow::{Context, Result};
use colored::*;
use indexmap::IndexMap;

use crate::config::Config;
use crate::import::{Importer, ImportReport, Severity, group, sheet};
use crate::ledger::RpcLedger;

use super::{ImportArgs, OutputFormat};

pub async fn handle_import_command(args: ImportArgs) -> Result<()> {
    if args.no_color {
        colored::control::set_override(false);
    }

    if !args.file.exists() {
        anyhow::bail!("File does not exist: {}", args.file.display());
    }

    let config = Config::load()?;

    if args.verbose {
        println!("Reading {}", args.file.display().to_string().cyan());
    }

    let rows = sheet::read_rows(&args.file)?;
    let groups = group::group_rows(rows)?;

    if args.verbose {
        println!(
            "Found {} transaction groups",
            groups.len().to_string().bright_green()
        );
    }

    if args.dry {
        return preview(&groups);
    }

    let (env_name, env) = config.environment(args.env.as_deref())?;
    let mut env = env.clone();
    if let Ok(key) = std::env::var("FELPOS_API_KEY") {
        env.api_key = key;
    }

    if args.verbose {
        println!("Using environment: {}", env_name.bright_green().bold());
    }

    let ledger = RpcLedger::connect(&env)
        .await
        .with_context(|| format!("Failed to connect to ledger environment: {env_name}"))?;

    let importer = Importer::new(&ledger, &config.import);
    let report = importer.run(&groups).await.context("Import aborted")?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_report(&report),
    }

    let notification = report.notification();
    let headline = format!("{}: {}", notification.title, notification.message);
    match notification.severity {
        Severity::Success => println!("{}", headline.bright_green().bold()),
        Severity::Warning => println!("{}", headline.yellow().bold()),
        Severity::Danger => {
            println!("{}", headline.red().bold());
            anyhow::bail!("{}", notification.message);
        }
    }

    Ok(())
}

/// Print the parsed transactions without touching any ledger.
fn preview(groups: &IndexMap<String, Vec<sheet::RawRow>>) -> Result<()> {
    for (reference, rows) in groups {
        match group::build_group(reference, rows) {
            Ok(Some(group)) => {
                let status = if group.is_certified() {
                    group.status_flag.bright_green()
                } else {
                    group.status_flag.yellow()
                };
                println!(
                    "{}  {}  {}  {} line(s)  {:>10.2}  {}",
                    group.reference.cyan(),
                    group.date,
                    group.customer_name,
                    group.lines.len(),
                    group.total(),
                    status,
                );
            }
            Ok(None) => {
                println!(
                    "{}  {}",
                    reference.cyan(),
                    "skipped (no resolvable lines)".dimmed()
                );
            }
            Err(error) => {
                println!("{}  {}", reference.cyan(), error.to_string().red());
            }
        }
    }
    Ok(())
}

fn print_report(report: &ImportReport) {
    println!(
        "{:>6} paid  {:>4} voided  {:>4} skipped  {:>4} failed",
        report.paid.len().to_string().bright_green(),
        report.voided.len(),
        report.skipped.len().to_string().dimmed(),
        report.failed.len().to_string().red(),
    );
    for failure in &report.failed {
        println!("  {}  {}", failure.reference.cyan(), failure.message.red());
    }
}
