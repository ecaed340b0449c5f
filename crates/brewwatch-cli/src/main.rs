//! brewwatch - watch Brew build tasks until they finish.
//!
//! ## Subcommands
//!
//! - `config`: print the effective configuration as JSON
//! - `simulate`: watch tasks on a scripted in-memory hub
//!
//! Ctrl-C interrupts every running watch; interrupted tasks are canceled on
//! the hub like any other unsuccessful task.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use brewwatch_core::app::{RetryingHub, TaskSnapshotStore, TaskWatcher, shutdown_channel};
use brewwatch_core::domain::{HubError, RemoteTaskState, TaskId};
use brewwatch_core::impls::InMemoryHub;
use brewwatch_core::ports::TracingSink;
use brewwatch_core::BrewwatchConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "brewwatch")]
#[command(about = "Watch Brew build tasks until they finish")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seconds between status polls
    #[arg(long, global = true, value_name = "SECS")]
    poll_secs: Option<f64>,

    /// Give up on unfinished tasks after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    deadline_secs: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration
    Config,

    /// Watch tasks on a scripted in-memory hub
    Simulate {
        /// TASK_ID=STATE[,STATE...], e.g. 101=OPEN,OPEN,CLOSED. `ERR` is a connection reset
        #[arg(value_name = "SCRIPT", required = true)]
        tasks: Vec<String>,

        /// Failure message reported for FAILED tasks
        #[arg(long, default_value = "BuildError: simulated failure")]
        failure: String,
    },
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "brewwatch failed");
        std::process::exit(1);
    }
}

fn init_logging() {
    let debug_enabled = env::var("BREWWATCH_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = load_config(&cli)?;
    match cli.command {
        Commands::Config => {
            let rendered = serde_json::to_string_pretty(&config).map_err(|e| e.to_string())?;
            println!("{rendered}");
            Ok(())
        }
        Commands::Simulate { tasks, failure } => simulate(config, &tasks, &failure).await,
    }
}

fn load_config(cli: &Cli) -> Result<BrewwatchConfig, String> {
    let mut config = match &cli.config {
        Some(path) => BrewwatchConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => BrewwatchConfig::default(),
    };
    if let Some(secs) = cli.poll_secs {
        config.watch.poll_interval = seconds(secs, "--poll-secs")?;
    }
    if let Some(secs) = cli.deadline_secs {
        config.watch.deadline = seconds(secs, "--deadline-secs")?;
    }
    tracing::debug!(hub_url = %config.hub_url, ?config.watch, "configuration loaded");
    Ok(config)
}

fn seconds(secs: f64, flag: &str) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{flag}: {e}"))
}

type Script = Vec<Result<RemoteTaskState, HubError>>;

/// Parse `101=OPEN,CLOSED`.
fn parse_script(raw: &str) -> Result<(TaskId, Script), String> {
    let (id, states) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TASK_ID=STATE[,STATE...], got {raw:?}"))?;
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|e| format!("bad task id {id:?}: {e}"))?;

    let script = states
        .split(',')
        .map(|state| parse_step(state.trim()))
        .collect::<Result<Script, String>>()?;
    Ok((TaskId::new(id), script))
}

fn parse_step(step: &str) -> Result<Result<RemoteTaskState, HubError>, String> {
    if step.eq_ignore_ascii_case("ERR") {
        return Ok(Err(HubError::Connection("Connection reset by peer".to_string())));
    }
    [
        RemoteTaskState::Free,
        RemoteTaskState::Open,
        RemoteTaskState::Closed,
        RemoteTaskState::Canceled,
        RemoteTaskState::Assigned,
        RemoteTaskState::Failed,
    ]
    .into_iter()
    .find(|state| state.name().eq_ignore_ascii_case(step))
    .map(Ok)
    .ok_or_else(|| format!("unknown task state {step:?}"))
}

async fn simulate(config: BrewwatchConfig, scripts: &[String], failure: &str) -> Result<(), String> {
    let hub = Arc::new(InMemoryHub::new());
    let mut task_ids = Vec::with_capacity(scripts.len());
    for raw in scripts {
        let (task_id, script) = parse_script(raw)?;
        hub.script_task(task_id, script);
        hub.set_task_failure(task_id, failure);
        task_ids.push(task_id);
    }

    let watcher = TaskWatcher::new(
        RetryingHub::new(Arc::clone(&hub), config.retry.clone()),
        Arc::new(TaskSnapshotStore::new()),
        config.watch.clone(),
        Arc::new(TracingSink),
    );

    tracing::info!(
        tasks = task_ids.len(),
        poll_secs = watcher.config().poll_interval.as_secs_f64(),
        deadline_secs = watcher.config().deadline.as_secs_f64(),
        "watching tasks"
    );

    let (trigger, mut shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping watchers");
            trigger.trigger();
        }
    });

    let details: BTreeMap<TaskId, Option<String>> = match task_ids.as_slice() {
        [task_id] => {
            let detail = watcher.watch_task_detail(*task_id, &mut shutdown).await;
            BTreeMap::from([(*task_id, detail)])
        }
        many => watcher.watch_tasks_details(many, &mut shutdown).await,
    };

    let counts = watcher.snapshots().counts_by_state();
    tracing::info!(
        tasks = details.len(),
        canceled = hub.cancellations().len(),
        ?counts,
        "watch finished"
    );
    let rendered = serde_json::to_string_pretty(&details).map_err(|e| e.to_string())?;
    println!("{rendered}");

    let failed = details.values().filter(|detail| detail.is_some()).count();
    if failed > 0 {
        return Err(format!("{failed} of {} tasks did not succeed", details.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_task_scripts() {
        let (task_id, script) = parse_script("101=open, ERR ,Closed").unwrap();
        assert_eq!(task_id, TaskId::new(101));
        assert_eq!(script.len(), 3);
        assert_eq!(script[0], Ok(RemoteTaskState::Open));
        assert!(script[1].as_ref().unwrap_err().is_transient());
        assert_eq!(script[2], Ok(RemoteTaskState::Closed));
    }

    #[test]
    fn rejects_malformed_scripts() {
        assert!(parse_script("101").is_err());
        assert!(parse_script("abc=OPEN").is_err());
        assert!(parse_script("101=RUNNING").is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from(["brewwatch", "--poll-secs", "1.5", "config"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.watch.poll_interval, Duration::from_millis(1500));
        assert_eq!(config.watch.deadline, Duration::from_secs(4 * 60 * 60));
    }
}
