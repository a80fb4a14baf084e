//! concept-cli: 概念解释命令行工具
//!
//! Usage:
//!   concept-cli explain <topic> [--level <level>] [--force]   Explain a topic
//!   concept-cli regenerate <topic> [--level <level>]          Replace a cached explanation
//!   concept-cli stats                                          Cached counts per level
//!   concept-cli suggestions [--limit <n>]                      Recently cached topics
//!   concept-cli analytics                                      Popular topics and activity
//!   concept-cli health                                         Store health check

use anyhow::{bail, Context};
use concept_simplifier::client::core::DEFAULT_SUGGESTION_LIMIT;
use concept_simplifier::config::StoreConfig;
use concept_simplifier::{Broker, ExplanationStore, HealthStatus, RetryPolicy, SqliteStore};
use serde::Serialize;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "explain" => cmd_explain(&args[2..], false).await,
        "regenerate" => cmd_explain(&args[2..], true).await,
        "stats" => cmd_stats().await,
        "suggestions" => cmd_suggestions(&args[2..]).await,
        "analytics" => cmd_analytics().await,
        "health" => cmd_health().await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"concept-cli: 概念解释命令行工具

USAGE:
    concept-cli <COMMAND> [OPTIONS]

COMMANDS:
    explain <topic> [--level <level>] [--force]
                                Explain a topic (levels: eli5, student, graduate, advanced)
    regenerate <topic> [--level <level>]
                                Regenerate and overwrite a cached explanation
    stats                       Show cached explanation counts per level
    suggestions [--limit <n>]   List recently cached topics
    analytics                   Show popular topics, level distribution and recent activity
    health                      Check that the store is reachable
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    OPENROUTER_API_KEY          Upstream API key (required for explain/regenerate)
    CONCEPT_UPSTREAM_URL        Chat completions endpoint
    CONCEPT_MODEL               Model identifier
    CONCEPT_DATABASE_PATH       SQLite database file
    RUST_LOG                    Log filter (default: info)"#
    );
}

fn cmd_version() {
    println!("concept-cli {}", env!("CARGO_PKG_VERSION"));
}

/// Value following `flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Positional words, with flags and their values removed.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
            continue;
        }
        match arg.as_str() {
            "--level" | "-l" | "--limit" | "-n" => skip = true,
            "--force" | "-f" => {}
            other => out.push(other),
        }
    }
    out
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn broker() -> anyhow::Result<Broker> {
    Broker::builder()
        .from_env()
        .context("failed to configure broker")?
        .build()
        .context("failed to build broker")
}

/// Read-only commands need the store but not an upstream key.
fn store() -> anyhow::Result<SqliteStore> {
    let cfg = StoreConfig::from_env();
    SqliteStore::open(&cfg.database_path, cfg.timeout)
        .with_context(|| format!("failed to open {}", cfg.database_path.display()))
}

async fn cmd_explain(args: &[String], regenerate: bool) -> anyhow::Result<()> {
    let topic = positional(args).join(" ");
    if topic.trim().is_empty() {
        bail!("missing <topic>");
    }
    let level = flag_value(args, "--level")
        .or_else(|| flag_value(args, "-l"))
        .unwrap_or("student");
    let force = regenerate || args.iter().any(|a| a == "--force" || a == "-f");

    let broker = broker()?;
    let explanation = broker
        .explain_with_retry(&topic, level, force, &RetryPolicy::default())
        .await?;
    print_json(&explanation)
}

async fn cmd_stats() -> anyhow::Result<()> {
    print_json(&store()?.stats().await?)
}

async fn cmd_suggestions(args: &[String]) -> anyhow::Result<()> {
    let limit = match flag_value(args, "--limit").or_else(|| flag_value(args, "-n")) {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid --limit '{raw}'"))?,
        None => DEFAULT_SUGGESTION_LIMIT,
    };
    let topics = store()?.recent_topics(limit).await?;
    print_json(&serde_json::json!({ "suggestions": topics }))
}

async fn cmd_analytics() -> anyhow::Result<()> {
    print_json(&store()?.analytics(chrono::Utc::now()).await?)
}

async fn cmd_health() -> anyhow::Result<()> {
    store()?.ping().await?;
    print_json(&HealthStatus::healthy())
}
