//! The merge command: fetch, store, merge, print.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;
use dayweave_core::{
    gather_fetches, Config, ItemDb, JsonSnapshotSource, MergeReport, ProblemKind, TimelineMerger,
};

use super::items::describe;
use super::resolve_user;

#[derive(Args)]
pub struct MergeArgs {
    /// Directory holding tasks.json, messages.json and events.json
    #[arg(long, default_value = ".")]
    snapshot: PathBuf,
    /// Output as JSON
    #[arg(long)]
    json: bool,
    /// Reference instant in RFC 3339 (defaults to the current time)
    #[arg(long)]
    now: Option<String>,
}

fn parse_now(raw: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match raw {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .map_err(|e| format!("invalid --now '{s}': {e}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

pub fn run(args: MergeArgs, user: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let user = resolve_user(user, &config)?;
    let now = parse_now(args.now.as_deref())?;

    let source = JsonSnapshotSource::new(&args.snapshot);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let bundle = runtime.block_on(gather_fetches(&user, &source, &source, &source))?;
    tracing::info!(
        user = %user,
        items = bundle.len(),
        snapshot = %args.snapshot.display(),
        "fetched snapshot"
    );

    let db = ItemDb::open()?;
    db.upsert_fetched(&bundle.items().cloned().collect::<Vec<_>>())?;

    let ctx = config.merge_context(now, bundle.priority_mapping.clone());
    let report = TimelineMerger::from_config(&config.merge).merge_for_user(
        &db,
        &ctx,
        &user,
        bundle.into_items(),
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.is_partial() {
        return Err(format!(
            "merge incomplete: {} item(s) failed to persist; re-run to retry",
            report.failed_ids().len()
        )
        .into());
    }
    Ok(())
}

fn print_report(report: &MergeReport) {
    if report.groups.is_empty() {
        println!("Agenda is empty.");
    }
    for group in &report.groups {
        println!(
            "{}  {}  ({} min)",
            group.datetime_start.format("%Y-%m-%d %H:%M"),
            group.kind.as_str(),
            group.time_duration / 60
        );
        for item in &group.tasks {
            println!("  {}", describe(item));
        }
    }
    if !report.completed.is_empty() {
        println!("Completed: {}", report.completed.join(", "));
    }
    for problem in &report.problems {
        match &problem.kind {
            ProblemKind::WriteFailed(message) => {
                eprintln!("failed to persist {}: {message}", problem.item_id)
            }
            ProblemKind::RowNotFound => eprintln!("warning: no stored row for {}", problem.item_id),
        }
    }
}
