//! Control socket: server (during `favdl download`) and client (for `favdl cancel`).
//! Protocol: one line per command; only "cancel" is understood.

use anyhow::Result;
use favdl_core::orchestrator::DownloadOrchestrator;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Binds `path` and spawns a task that cancels `orchestrator` on a "cancel" line.
/// Other lines are ignored. A stale socket file at `path` is replaced.
pub fn spawn_control_listener(
    orchestrator: Arc<DownloadOrchestrator>,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let orchestrator = Arc::clone(&orchestrator);
                    tokio::spawn(async move {
                        let mut lines = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = lines.next_line().await {
                            if line.trim() == "cancel" {
                                tracing::info!("cancel received on control socket");
                                orchestrator.cancel();
                            }
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

/// Sends "cancel\n" to the control socket. Returns false when no download is
/// listening (missing socket or refused connection).
pub async fn send_cancel(socket_path: &Path) -> Result<bool> {
    if !socket_path.exists() {
        return Ok(false);
    }
    let mut stream = match UnixStream::connect(socket_path).await {
        Ok(s) => s,
        Err(e) if matches!(e.kind(), ErrorKind::ConnectionRefused | ErrorKind::NotFound) => {
            return Ok(false)
        }
        Err(e) => return Err(e.into()),
    };
    stream.write_all(b"cancel\n").await?;
    stream.shutdown().await?;
    Ok(true)
}
