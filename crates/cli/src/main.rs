use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use engine::{Command, EngineConfig, HeadlessMediaBackend, spawn_engine_bridge};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "canvas-cli", version)]
struct Cli {
    /// Script JSON: an array of `{"command": ...}` and `{"wait_ms": n}` steps.
    #[arg(long)]
    script: PathBuf,

    /// Engine config JSON. Missing fields fall back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Step {
    Command { command: Command },
    Wait { wait_ms: u64 },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let steps = load_script(&cli.script)?;
    run(steps, config)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    EngineConfig::from_json_str(&text).with_context(|| format!("load config '{}'", path.display()))
}

fn load_script(path: &Path) -> anyhow::Result<Vec<Step>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read script '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse script '{}'", path.display()))
}

fn run(steps: Vec<Step>, config: EngineConfig) -> anyhow::Result<()> {
    let (command_tx, event_rx) = spawn_engine_bridge(HeadlessMediaBackend::new(), config)?;

    let printer = thread::spawn(move || -> anyhow::Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for event in event_rx {
            let line = serde_json::to_string(&event).context("serialize event")?;
            writeln!(out, "{line}").context("write event")?;
        }
        out.flush().context("flush stdout")
    });

    for step in steps {
        match step {
            Step::Command { command } => {
                tracing::debug!(?command, "script command");
                command_tx
                    .send(command)
                    .context("engine thread stopped early")?;
            }
            Step::Wait { wait_ms } => thread::sleep(Duration::from_millis(wait_ms)),
        }
    }

    // The event stream ends once the engine has handled everything queued.
    drop(command_tx);
    printer
        .join()
        .map_err(|_| anyhow::anyhow!("event printer panicked"))?
}
