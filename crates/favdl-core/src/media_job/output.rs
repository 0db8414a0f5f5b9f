//! Merge a child's stdout and stderr into one stream of lines.

use std::io;

use tokio::io::{AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::progress_line::LineReader;

const LINE_QUEUE: usize = 64;

/// Lines from both pipes, in arrival order. Ends when both pipes are closed.
pub(super) struct MergedOutput {
    rx: mpsc::Receiver<io::Result<String>>,
    readers: Vec<JoinHandle<()>>,
}

impl MergedOutput {
    /// Takes the child's piped stdout and stderr.
    pub(super) fn attach(child: &mut Child) -> io::Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stdout pipe missing"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stderr pipe missing"))?;

        let (tx, rx) = mpsc::channel(LINE_QUEUE);
        let readers = vec![
            tokio::spawn(forward_lines(stdout, tx.clone())),
            tokio::spawn(forward_lines(stderr, tx)),
        ];
        Ok(Self { rx, readers })
    }

    /// Output fed from a channel instead of pipes.
    #[cfg(test)]
    pub(super) fn from_channel(rx: mpsc::Receiver<io::Result<String>>) -> Self {
        Self {
            rx,
            readers: Vec::new(),
        }
    }

    /// Next line, a read error, or `None` once both pipes hit end-of-stream.
    pub(super) async fn next_line(&mut self) -> Option<io::Result<String>> {
        self.rx.recv().await
    }
}

impl Drop for MergedOutput {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}

async fn forward_lines<R>(pipe: R, tx: mpsc::Sender<io::Result<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = LineReader::new(BufReader::new(pipe));
    loop {
        match reader.next_line().await {
            Ok(Some(line)) => {
                if tx.send(Ok(line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }
}
