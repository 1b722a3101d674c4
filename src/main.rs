//! `bard`: the status-bar daemon binary, plus a `msg` subcommand that is
//! the `bar-msg` companion CLI (spec §6 "CLI companion").
//!
//! Grounded loosely in the teacher's `main.rs` CLI/allocator/logging
//! conventions (mimalloc global allocator, `clap` derive, `env_logger`);
//! the teacher's own TUI/ratatui wiring has no counterpart here and isn't
//! reused.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use bard::aggregator::{Aggregator, ComposeSettings};
use bard::config::BarConfig;
use bard::ipc::dispatcher::{self, CommandSender};
use bard::ipc::framing::{self, message_type};
use bard::module::Module;
use bard::throttle::Throttler;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "bard", about = "Status bar daemon for tiling window managers")]
struct Cli {
    /// Path to a `config.json`; defaults to the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// `env_logger` filter string (e.g. `info`, `bard=debug`).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon (the default when no subcommand is given).
    Run,
    /// Send one IPC message to every running daemon (the `bar-msg`
    /// companion, spec §6).
    Msg {
        /// `action`, `cmd`, or `hook`.
        kind: String,
        /// The payload to send.
        payload: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.clone())).init();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let runtime = tokio::runtime::Runtime::new().context("building tokio runtime")?;
            runtime.block_on(run_daemon(cli.config.as_deref()))
        }
        Command::Msg { kind, payload } => run_msg(&kind, &payload),
    }
}

/// Build the module roster from `config.modules` (spec §4.8: "Owns
/// `map<Alignment, [Module]>`"). Only the `text` static module is wired
/// into actual content here; every other configured name is started as an
/// inert text module carrying its own name, since this binary has no
/// concrete adapters (ALSA/MPD/network) configured — wiring those in is
/// deployment-specific and outside this crate's scope.
fn build_modules(
    config: &BarConfig,
    update_tx: &tokio::sync::mpsc::UnboundedSender<String>,
) -> HashMap<bard::color::Alignment, Vec<Arc<Module>>> {
    let mut roster = HashMap::new();
    for alignment in bard::color::ALIGNMENTS {
        let names = config.modules.get(&alignment).cloned().unwrap_or_default();
        let mut modules = Vec::new();
        for name in names {
            let module = Module::new(name.clone());
            module.set_update_sink(bard::module::UpdateSink::new(name.clone(), update_tx.clone()));
            let handle = bard::module::text::start(module.clone(), String::new());
            tokio::spawn(async move {
                let _ = handle.await;
            });
            modules.push(module);
        }
        roster.insert(alignment, modules);
    }
    roster
}

async fn run_daemon(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = BarConfig::load(config_path)?;
    log::info!("loaded configuration");

    let pid = std::process::id();
    let socket_dir = config.socket_dir()?;
    dispatcher::cleanup_stale_sockets(&socket_dir);
    let socket_path = dispatcher::socket_path(&socket_dir, pid);

    let (commands_tx, mut commands_rx): (CommandSender, _) = tokio::sync::mpsc::unbounded_channel();
    let _socket_task = dispatcher::spawn_socket_server(socket_path.clone(), commands_tx.clone())?;

    let _fifo_task = if config.enable_legacy_fifo {
        let fifo_path = dispatcher::legacy_fifo_path(pid);
        Some(dispatcher::spawn_legacy_fifo(fifo_path, commands_tx)?)
    } else {
        None
    };

    let (update_tx, mut update_rx) = bard::aggregator::update_channel();
    let roster = build_modules(&config, &update_tx);
    let settings = ComposeSettings {
        separator: config.separator.clone(),
        padding_start: config.padding_start.clone(),
        padding_end: config.padding_end.clone(),
    };
    let throttler = Throttler::new(config.throttle_limit, Duration::from_millis(config.throttle_window_ms));
    let aggregator = Arc::new(Aggregator::new(roster, settings, throttler, Duration::from_millis(config.double_click_ms)));

    let agg_for_commands = aggregator.clone();
    let command_task = tokio::spawn(async move {
        while let Some(command) = commands_rx.recv().await {
            let result = agg_for_commands.handle_ipc(command.request).await;
            let _ = command.respond_to.send(result);
        }
    });

    log::info!("bard listening on {}", socket_path.display());

    // The aggregator recomposes whenever a module broadcasts through its
    // `UpdateSink` (spec §4.8 "On any module's `on_update`..."); a slow
    // fallback tick keeps the quit-command check and the double-click
    // debounce flush responsive even if no module has anything to say.
    let mut fallback = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            signal = update_rx.recv() => {
                if signal.is_none() {
                    break;
                }
                if let Some(composite) = aggregator.compose().await {
                    log::trace!("composed: {composite}");
                }
            }
            _ = fallback.tick() => {
                aggregator.flush_expired_pending_click().await;
            }
        }
        if let Some(command) = aggregator.last_command().await {
            if command == bard::aggregator::BarCommand::Quit {
                log::info!("quit command received, shutting down");
                break;
            }
        }
    }

    aggregator.shutdown().await;
    command_task.abort();
    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}

/// The `bar-msg` companion: discover every live daemon socket under the
/// runtime directory and send one message to each, exiting `0` iff at
/// least one delivery succeeded (spec §6).
fn run_msg(kind: &str, payload: &str) -> Result<()> {
    let msg_type = match kind {
        "cmd" => message_type::CMD,
        "action" | "hook" => message_type::ACTION,
        other => anyhow::bail!("unknown message kind '{other}' (expected action|cmd|hook)"),
    };

    let dir = dispatcher::runtime_dir()?;
    let sockets = discover_sockets(&dir)?;
    if sockets.is_empty() {
        eprintln!("no running bard daemons found under {}", dir.display());
        std::process::exit(1);
    }

    let mut delivered = false;
    for socket in sockets {
        match send_one(&socket, msg_type, payload.as_bytes()) {
            Ok(response) => {
                println!("{}: {response}", socket.display());
                delivered = true;
            }
            Err(err) => eprintln!("{}: {err}", socket.display()),
        }
    }

    if delivered {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

fn discover_sockets(dir: &std::path::Path) -> Result<Vec<PathBuf>> {
    let mut sockets = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else { return Ok(sockets) };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("sock") {
            sockets.push(path);
        }
    }
    Ok(sockets)
}

fn send_one(socket_path: &std::path::Path, msg_type: u8, payload: &[u8]) -> Result<String> {
    let mut stream = UnixStream::connect(socket_path).with_context(|| format!("connecting to {}", socket_path.display()))?;
    stream.write_all(&framing::encode(msg_type, payload))?;
    let mut buf = [0u8; 4096];
    let n = stream.read(&mut buf)?;
    let mut decoder = framing::Decoder::new();
    let messages = decoder.feed(&buf[..n])?;
    let message = messages.into_iter().next().context("no response from daemon")?;
    let text = String::from_utf8_lossy(&message.payload).into_owned();
    if message.msg_type == message_type::ERR {
        anyhow::bail!(text);
    }
    Ok(text)
}
