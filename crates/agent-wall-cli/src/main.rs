//! Command-line entry point for the Agent Wall proxy engine.
//!
//! Loads a [`agent_wall_core::PolicyConfig`] from JSON (or falls back to
//! the default, prompt-on-everything config), wires up an audit log and
//! an optional NDJSON event sink, spawns the given tool-server command
//! under [`agent_wall_core::ProxyEngine`], and exits with its status
//! code. A full YAML-schema-validating config loader is out of scope
//! here (see README); this binary is the minimal wiring the core's
//! public API needs to run standalone.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use agent_wall_core::proxy::{FileEventSink, NullEventSink};
use agent_wall_core::{AuditLog, Pipeline, PolicyConfig, ProxyEngine};

/// Proxy a JSON-RPC 2.0 tool server through Agent Wall's security pipeline.
#[derive(Parser, Debug)]
#[command(name = "agent-wall", version, about)]
struct Cli {
    /// Path to a JSON policy config. Defaults to a prompt-everything
    /// config with every security module on its own defaults.
    #[arg(long, env = "AGENT_WALL_CONFIG")]
    config: Option<PathBuf>,

    /// Path to append tamper-evident audit log entries to. Auditing is
    /// disabled if omitted.
    #[arg(long, env = "AGENT_WALL_AUDIT_LOG")]
    audit_log: Option<PathBuf>,

    /// Path to append raw NDJSON pipeline events to, in addition to the
    /// audit log. Omit to only audit-log.
    #[arg(long, env = "AGENT_WALL_EVENT_LOG")]
    event_log: Option<PathBuf>,

    /// The tool-server command to spawn and proxy.
    command: String,

    /// Arguments passed through to the tool-server command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn load_config(path: Option<&PathBuf>) -> Result<PolicyConfig> {
    let Some(path) = path else {
        return Ok(PolicyConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading policy config at {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing policy config at {}", path.display()))
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;

    let signing_key = if config.security.signing {
        config.security.signing_key.clone().map(String::into_bytes)
    } else {
        None
    };
    let audit = AuditLog::new(cli.audit_log.as_deref(), signing_key);

    let sinks: Vec<Arc<dyn agent_wall_core::proxy::EventSink>> = match &cli.event_log {
        Some(path) => {
            let sink = FileEventSink::new(path)
                .with_context(|| format!("opening event log at {}", path.display()))?;
            vec![Arc::new(sink)]
        }
        None => vec![Arc::new(NullEventSink)],
    };

    let pipeline = Pipeline::new(config, audit, sinks);
    let engine = ProxyEngine::spawn(&cli.command, &cli.args, pipeline)
        .with_context(|| format!("spawning tool server {:?}", cli.command))?;
    let code = engine.run().context("running proxy engine")?;
    Ok(code)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("agent-wall: fatal: {e:?}");
            std::process::exit(2);
        }
    }
}
