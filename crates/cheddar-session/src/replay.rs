//! `cheddar-replay`: feed a recorded host transcript through a session.
//!
//! Each non-blank transcript line is one JSON object, either a host event
//! `{"event": "update-response", "data": "..."}` or typed user input
//! `{"send": "text"}`. Lines starting with `#` are comments.

use std::sync::Arc;

use cheddar_api::{BridgeApi, CapabilityAdapter, MemorySettings};
use cheddar_bridge::loopback::LoopbackHost;
use cheddar_bridge::{ChannelBridge, HostTransport};
use cheddar_stream::Turn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::{load_config, Config};
use crate::logging::init_logging;
use crate::session::{AssistantSession, NullSessionObserver};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Args {
    pub config_file: String,
    pub log_level: String,
    pub log_format: String,
    pub no_animate: bool,
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TranscriptStep {
    Event {
        event: String,
        #[serde(default)]
        data: Value,
    },
    Send {
        send: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub turns: Vec<Turn>,
    pub active_index: Option<usize>,
    pub counter: String,
    pub status: String,
}

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    run_with_args(&args)
}

pub fn run_with_args(argv: &[String]) -> i32 {
    let parsed = match parse_args(argv) {
        Ok(args) => args,
        Err(err) => {
            eprint!("{err}");
            return 2;
        }
    };
    if parsed.transcript.is_empty() {
        eprint!("{}", usage(Some("transcript path is required")));
        return 2;
    }

    let (mut cfg, used_path) = match load_config(if parsed.config_file.is_empty() {
        None
    } else {
        Some(parsed.config_file.as_str())
    }) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("Error loading config: {err}");
            return 1;
        }
    };
    if !parsed.log_level.is_empty() {
        cfg.logging.level = parsed.log_level.clone();
    }
    if !parsed.log_format.is_empty() {
        cfg.logging.format = parsed.log_format.clone();
    }
    if parsed.no_animate {
        cfg.reveal.reduced_motion = true;
    }
    if let Err(err) = cfg.validate() {
        eprintln!("{err}");
        return 1;
    }
    init_logging(&cfg.logging);
    if let Some(path) = used_path {
        debug!(path = %path.display(), "config loaded");
    }

    let text = match std::fs::read_to_string(&parsed.transcript) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("failed to read transcript {}: {err}", parsed.transcript);
            return 1;
        }
    };
    let steps = match parse_transcript(&text) {
        Ok(steps) => steps,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            return 1;
        }
    };
    let summary = runtime.block_on(replay_transcript(&steps, cfg));

    match serde_json::to_string_pretty(&summary) {
        Ok(out) => {
            println!("{out}");
            0
        }
        Err(err) => {
            eprintln!("failed to encode turns: {err}");
            1
        }
    }
}

/// Parse a JSON-lines transcript. Errors name the offending line.
pub fn parse_transcript(text: &str) -> Result<Vec<TranscriptStep>, String> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line.trim())
                .map_err(|err| format!("transcript line {}: {err}", idx + 1))
        })
        .collect()
}

/// Run `steps` against a loopback host and report the resulting turns.
pub async fn replay_transcript(steps: &[TranscriptStep], config: Config) -> ReplaySummary {
    let host = Arc::new(LoopbackHost::new());
    host.handle("send-text-message", |_| Ok(json!({ "success": true })));
    let bridge = ChannelBridge::new(Arc::clone(&host) as Arc<dyn HostTransport>);
    let settings = Arc::new(MemorySettings::new());

    let adapter = Arc::new(CapabilityAdapter::new());
    adapter
        .bind(Arc::new(BridgeApi::new(bridge.clone(), settings.clone())))
        .await;
    let session = AssistantSession::attach(
        bridge,
        adapter,
        settings,
        config,
        Arc::new(NullSessionObserver),
    );

    for step in steps {
        match step {
            TranscriptStep::Event { event, data } => {
                let args = if data.is_null() {
                    Vec::new()
                } else {
                    vec![data.clone()]
                };
                let delivered = host.emit(event, args);
                debug!(event = %event, delivered, "event replayed");
            }
            TranscriptStep::Send { send } => {
                session.send_text(send).await;
            }
        }
    }

    let summary = ReplaySummary {
        turns: session.turns(),
        active_index: session.active_index(),
        counter: session.counter_label(),
        status: session.status(),
    };
    session.detach();
    info!(steps = steps.len(), turns = summary.turns.len(), "transcript replayed");
    summary
}

fn parse_args(argv: &[String]) -> Result<Args, String> {
    let mut out = Args::default();
    let mut idx = 0usize;

    while idx < argv.len() {
        let token = &argv[idx];
        if token == "--" {
            if let Some(path) = argv.get(idx + 1) {
                out.transcript = path.clone();
            }
            return Ok(out);
        }
        if !token.starts_with('-') {
            out.transcript = token.clone();
            idx += 1;
            continue;
        }

        let (key, inline) = if let Some((k, v)) = token.split_once('=') {
            (k.to_string(), Some(v.to_string()))
        } else {
            (token.to_string(), None)
        };

        match key.as_str() {
            "--config" => {
                out.config_file = take_value(argv, &mut idx, inline, "--config")?;
            }
            "--log-level" => {
                out.log_level = take_value(argv, &mut idx, inline, "--log-level")?;
            }
            "--log-format" => {
                out.log_format = take_value(argv, &mut idx, inline, "--log-format")?;
            }
            "--no-animate" => out.no_animate = true,
            "-h" | "--help" => return Err(usage(None)),
            other => return Err(usage_with_message(&format!("unknown flag: {other}"))),
        }
        idx += 1;
    }

    Ok(out)
}

fn take_value(
    argv: &[String],
    idx: &mut usize,
    inline: Option<String>,
    flag: &str,
) -> Result<String, String> {
    if let Some(value) = inline {
        return Ok(value);
    }
    *idx += 1;
    argv.get(*idx)
        .cloned()
        .ok_or_else(|| usage_with_message(&format!("missing value for {flag}")))
}

fn usage_with_message(message: &str) -> String {
    usage(Some(message))
}

fn usage(message: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(msg) = message {
        if !msg.trim().is_empty() {
            out.push_str(&format!("Error: {msg}\n\n"));
        }
    }
    out.push_str("Usage: cheddar-replay [options] TRANSCRIPT\n\n");
    out.push_str("Options:\n");
    out.push_str(
        "  --config string       config file (default is $HOME/.config/cheddar/config.yaml)\n",
    );
    out.push_str("  --log-level string    override logging level (debug, info, warn, error)\n");
    out.push_str("  --log-format string   override logging format (json, console)\n");
    out.push_str("  --no-animate          reveal every turn instantly\n");
    out
}
