//! Socket server + legacy named-pipe fallback that routes decoded IPC
//! payloads to the aggregator (spec §4.9, §4.13, component table C12).
//!
//! Grounded in the teacher's `socket/server.rs` (accept loop, one task per
//! connection, stale-file cleanup before bind) and `hub/daemon.rs` (PID
//! liveness via `libc::kill(pid, 0)`, runtime-dir resolution, orphaned
//! socket sweep on startup).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};

use crate::ipc::framing::{self, message_type, Decoder};

/// One decoded request the aggregator must answer, addressed generically
/// so both the socket and the legacy FIFO funnel through the same channel
/// (spec §4.9: "ACTION payloads are treated as the same `#module.action.data`
/// form used by inline click tags").
#[derive(Debug)]
pub enum IpcRequest {
    /// A global bar command (`quit`, `restart`, `hide`, `show`, `toggle`).
    Cmd(String),
    /// An action reference, already split into its three parts.
    Action { module: String, action: String, data: Option<String> },
}

/// A request paired with the channel the caller is waiting on for a
/// human-readable outcome.
#[derive(Debug)]
pub struct IpcCommand {
    /// The decoded request.
    pub request: IpcRequest,
    /// Completed by the aggregator with `Ok(message)` or `Err(reason)`;
    /// the dispatcher encodes this back as `TYPE_OK`/`TYPE_ERR` (spec §4.9).
    pub respond_to: oneshot::Sender<Result<String, String>>,
}

/// Sending half handed to socket/FIFO connection tasks; cloned per task.
pub type CommandSender = mpsc::UnboundedSender<IpcCommand>;

/// Resolve the runtime directory IPC sockets are created under (spec §6
/// "IPC socket path"): `$XDG_RUNTIME_DIR/polybar` if set and creatable
/// with `0700`, else `/tmp/polybar-<uid>`.
pub fn runtime_dir() -> Result<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_RUNTIME_DIR") {
        let dir = PathBuf::from(xdg).join("polybar");
        if create_0700(&dir).is_ok() {
            return Ok(dir);
        }
    }
    let uid = unsafe { libc::getuid() };
    let dir = PathBuf::from(format!("/tmp/polybar-{uid}"));
    create_0700(&dir)?;
    Ok(dir)
}

fn create_0700(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("setting 0700 on {}", dir.display()))?;
    }
    Ok(())
}

/// The socket path for this process: `<runtime-dir>/ipc.<pid>.sock`.
pub fn socket_path(dir: &Path, pid: u32) -> PathBuf {
    dir.join(format!("ipc.{pid}.sock"))
}

/// Unlink any `ipc.<pid>.sock` entries in `dir` whose pid no longer maps
/// to a live process (spec §4.9: "stale sockets... are unlinked on
/// start"), mirroring the teacher's `cleanup_orphaned_sockets`.
pub fn cleanup_stale_sockets(dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let Some(pid_str) = name.strip_prefix("ipc.").and_then(|s| s.strip_suffix(".sock")) else { continue };
        let Ok(pid) = pid_str.parse::<libc::pid_t>() else { continue };
        let alive = unsafe { libc::kill(pid, 0) == 0 };
        if !alive {
            let _ = std::fs::remove_file(&path);
            log::debug!("removed stale ipc socket {}", path.display());
        }
    }
}

/// Split a `#module.action[.data]` action reference, reusing the action
/// router's parser (spec §4.4/§6 share the same grammar).
fn parse_action(payload: &str) -> Result<IpcRequest, String> {
    crate::action::router::parse_action_ref(payload)
        .map(|(module, action, data)| IpcRequest::Action {
            module: module.to_string(),
            action: action.to_string(),
            data: data.map(str::to_string),
        })
        .ok_or_else(|| format!("malformed action reference: {payload:?}"))
}

/// Bind the UNIX socket at `path` and spawn the accept loop. Returns the
/// join handle; dropping/aborting it stops accepting new connections (the
/// bound file itself must still be unlinked by the caller on shutdown).
pub fn spawn_socket_server(path: PathBuf, commands: CommandSender) -> Result<tokio::task::JoinHandle<()>> {
    if path.exists() {
        std::fs::remove_file(&path).with_context(|| format!("removing stale socket {}", path.display()))?;
    }
    let listener = UnixListener::bind(&path).with_context(|| format!("binding {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700))?;
    }
    log::info!("IPC socket listening on {}", path.display());
    Ok(tokio::spawn(accept_loop(listener, commands)))
}

async fn accept_loop(listener: UnixListener, commands: CommandSender) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let commands = commands.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, commands).await {
                        log::warn!("IPC connection error: {err}");
                    }
                });
            }
            Err(err) => {
                log::error!("IPC accept error: {err}");
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    }
}

/// One connection: decode exactly one message, dispatch it, respond, close
/// (spec §4.9: "the dispatcher closes the connection after one response").
async fn handle_connection(mut stream: UnixStream, commands: CommandSender) -> Result<()> {
    let mut decoder = Decoder::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let messages = match decoder.feed(&buf[..n]) {
            Ok(messages) => messages,
            Err(err) => {
                let response = framing::encode(message_type::ERR, err.to_string().as_bytes());
                let _ = stream.write_all(&response).await;
                return Ok(());
            }
        };
        if let Some(message) = messages.into_iter().next() {
            let request = match message.msg_type {
                message_type::CMD => Ok(IpcRequest::Cmd(String::from_utf8_lossy(&message.payload).into_owned())),
                message_type::ACTION => parse_action(&String::from_utf8_lossy(&message.payload)),
                other => Err(format!("unexpected message type {other}")),
            };
            let response = match request {
                Ok(request) => {
                    let (tx, rx) = oneshot::channel();
                    if commands.send(IpcCommand { request, respond_to: tx }).is_err() {
                        framing::encode(message_type::ERR, b"aggregator unavailable")
                    } else {
                        match rx.await {
                            Ok(Ok(msg)) => framing::encode(message_type::OK, msg.as_bytes()),
                            Ok(Err(reason)) => framing::encode(message_type::ERR, reason.as_bytes()),
                            Err(_) => framing::encode(message_type::ERR, b"aggregator dropped the request"),
                        }
                    }
                }
                Err(reason) => framing::encode(message_type::ERR, reason.as_bytes()),
            };
            stream.write_all(&response).await?;
            return Ok(());
        }
    }
}

/// Path of the legacy named FIFO (spec §4.9/§6): `/tmp/polybar_mqueue.<pid>`.
pub fn legacy_fifo_path(pid: u32) -> PathBuf {
    PathBuf::from(format!("/tmp/polybar_mqueue.{pid}"))
}

/// Create and serve the legacy named-pipe fallback, parsing
/// newline-delimited `cmd:`, `action:`, `hook:module-name<index>` messages
/// (spec §4.9, §6; gated by `BarConfig::enable_legacy_fifo` per
/// SPEC_FULL.md §D). Emits one deprecation warning on first use.
pub fn spawn_legacy_fifo(path: PathBuf, commands: CommandSender) -> Result<tokio::task::JoinHandle<()>> {
    if path.exists() {
        std::fs::remove_file(&path).ok();
    }
    #[cfg(unix)]
    {
        use std::ffi::CString;
        let c_path = CString::new(path.as_os_str().as_encoded_bytes()).context("fifo path contains NUL")?;
        // SAFETY: `c_path` is a valid NUL-terminated path and 0600 a plain mode bitmask.
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error()).context("mkfifo failed");
        }
    }
    Ok(tokio::spawn(fifo_loop(path, commands)))
}

async fn fifo_loop(path: PathBuf, commands: CommandSender) {
    let mut warned = false;
    loop {
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) => {
                log::error!("failed to open legacy fifo {}: {err}", path.display());
                return;
            }
        };
        let mut lines = BufReader::new(file).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if !warned {
                        log::warn!("legacy named-pipe IPC is deprecated; prefer the UNIX socket");
                        warned = true;
                    }
                    dispatch_legacy_line(&line, &commands).await;
                }
                Ok(None) => break, // writer closed; reopen for the next one
                Err(err) => {
                    log::warn!("legacy fifo read error: {err}");
                    break;
                }
            }
        }
    }
}

async fn dispatch_legacy_line(line: &str, commands: &CommandSender) {
    let request = if let Some(payload) = line.strip_prefix("cmd:") {
        Some(IpcRequest::Cmd(payload.to_string()))
    } else if let Some(payload) = line.strip_prefix("action:") {
        match parse_action(payload) {
            Ok(request) => Some(request),
            Err(reason) => {
                log::warn!("legacy fifo: {reason}");
                None
            }
        }
    } else if let Some(payload) = line.strip_prefix("hook:") {
        // `hook:module-name<index>` — routed as an action on the named
        // module's `hook` handler, `<index>` becoming the data payload.
        let module = payload.trim_end_matches(|c: char| c.is_ascii_digit());
        let index = &payload[module.len()..];
        Some(IpcRequest::Action {
            module: module.to_string(),
            action: "hook".to_string(),
            data: if index.is_empty() { None } else { Some(index.to_string()) },
        })
    } else {
        log::warn!("legacy fifo: unrecognized message {line:?}");
        None
    };
    if let Some(request) = request {
        let (tx, _rx) = oneshot::channel();
        let _ = commands.send(IpcCommand { request, respond_to: tx });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt as _;

    #[tokio::test]
    async fn socket_round_trip_cmd() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sock_path = tmp.path().join("test.sock");
        let (tx, mut rx) = mpsc::unbounded_channel::<IpcCommand>();
        let _server = spawn_socket_server(sock_path.clone(), tx).unwrap();

        let responder = tokio::spawn(async move {
            let command = rx.recv().await.unwrap();
            match command.request {
                IpcRequest::Cmd(c) => assert_eq!(c, "quit"),
                IpcRequest::Action { .. } => panic!("expected Cmd"),
            }
            let _ = command.respond_to.send(Ok("bye".to_string()));
        });

        let mut stream = UnixStream::connect(&sock_path).await.unwrap();
        stream.write_all(&framing::encode(message_type::CMD, b"quit")).await.unwrap();
        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        let mut decoder = Decoder::new();
        let messages = decoder.feed(&buf[..n]).unwrap();
        assert_eq!(messages[0].msg_type, message_type::OK);
        assert_eq!(messages[0].payload, b"bye");
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn socket_action_routes_module_and_data() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sock_path = tmp.path().join("test.sock");
        let (tx, mut rx) = mpsc::unbounded_channel::<IpcCommand>();
        let _server = spawn_socket_server(sock_path.clone(), tx).unwrap();

        let responder = tokio::spawn(async move {
            let command = rx.recv().await.unwrap();
            match command.request {
                IpcRequest::Action { module, action, data } => {
                    assert_eq!(module, "vol");
                    assert_eq!(action, "set");
                    assert_eq!(data.as_deref(), Some("42"));
                }
                IpcRequest::Cmd(_) => panic!("expected Action"),
            }
            let _ = command.respond_to.send(Ok(String::new()));
        });

        let mut stream = UnixStream::connect(&sock_path).await.unwrap();
        stream.write_all(&framing::encode(message_type::ACTION, b"#vol.set.42")).await.unwrap();
        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        let mut decoder = Decoder::new();
        let messages = decoder.feed(&buf[..n]).unwrap();
        assert_eq!(messages[0].msg_type, message_type::OK);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn malformed_action_reference_gets_type_err_without_reaching_aggregator() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sock_path = tmp.path().join("test.sock");
        let (tx, mut rx) = mpsc::unbounded_channel::<IpcCommand>();
        let _server = spawn_socket_server(sock_path.clone(), tx).unwrap();

        let mut stream = UnixStream::connect(&sock_path).await.unwrap();
        stream.write_all(&framing::encode(message_type::ACTION, b"not-a-reference")).await.unwrap();
        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        let mut decoder = Decoder::new();
        let messages = decoder.feed(&buf[..n]).unwrap();
        assert_eq!(messages[0].msg_type, message_type::ERR);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn bad_magic_closes_connection_with_type_err() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sock_path = tmp.path().join("test.sock");
        let (tx, _rx) = mpsc::unbounded_channel::<IpcCommand>();
        let _server = spawn_socket_server(sock_path.clone(), tx).unwrap();

        let mut stream = UnixStream::connect(&sock_path).await.unwrap();
        stream.write_all(&[0u8; framing::HEADER_SIZE]).await.unwrap();
        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        let mut decoder = Decoder::new();
        let messages = decoder.feed(&buf[..n]).unwrap();
        assert_eq!(messages[0].msg_type, message_type::ERR);
    }

    #[test]
    fn stale_socket_cleanup_removes_dead_pid_entries() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dead_pid_sock = tmp.path().join("ipc.999999999.sock");
        std::fs::write(&dead_pid_sock, b"").unwrap();
        let live_sock = socket_path(tmp.path(), std::process::id());
        std::fs::write(&live_sock, b"").unwrap();

        cleanup_stale_sockets(tmp.path());

        assert!(!dead_pid_sock.exists());
        assert!(live_sock.exists());
    }

    #[tokio::test]
    async fn legacy_fifo_cmd_line_reaches_aggregator() {
        let tmp = tempfile::TempDir::new().unwrap();
        let fifo_path = tmp.path().join("mqueue.test");
        let (tx, mut rx) = mpsc::unbounded_channel::<IpcCommand>();
        let _server = spawn_legacy_fifo(fifo_path.clone(), tx).unwrap();

        let writer_path = fifo_path.clone();
        let writer = tokio::task::spawn_blocking(move || {
            use std::io::Write as _;
            let mut f = std::fs::OpenOptions::new().write(true).open(&writer_path).unwrap();
            writeln!(f, "cmd:restart").unwrap();
        });
        writer.await.unwrap();

        let command = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        match command.request {
            IpcRequest::Cmd(c) => assert_eq!(c, "restart"),
            IpcRequest::Action { .. } => panic!("expected Cmd"),
        }
    }
}
