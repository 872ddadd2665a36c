//! Background capture of worker stdout/stderr.
//!
//! One task per stream, each the sole writer to its own channel. A task ends
//! cleanly when its stream hits end-of-file on process exit; nothing is
//! raised into the control flow.

use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::supervisor::process::{tail_chars, StreamTails};

/// Read lines from an async reader as a stream.
pub fn line_stream<R>(reader: R) -> impl futures_core::Stream<Item = std::io::Result<String>>
where
    R: AsyncRead + Unpin,
{
    let lines = BufReader::new(reader).lines();
    futures_util::stream::unfold(lines, |mut lines| async {
        match lines.next_line().await {
            Ok(Some(line)) => Some((Ok(line), lines)),
            Ok(None) => None,
            Err(e) => Some((Err(e), lines)),
        }
    })
}

/// Concurrent readers draining the worker's output streams.
#[derive(Debug)]
pub struct StreamCapture {
    cancel: CancellationToken,
    stdout_rx: mpsc::UnboundedReceiver<String>,
    stderr_rx: mpsc::UnboundedReceiver<String>,
    tasks: Vec<JoinHandle<()>>,
    stdout_log: Vec<String>,
    stderr_log: Vec<String>,
}

impl StreamCapture {
    /// Start capturing both streams.
    #[must_use]
    pub fn spawn(stdout: ChildStdout, stderr: ChildStderr) -> Self {
        let cancel = CancellationToken::new();
        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();

        let tasks = vec![
            tokio::spawn(read_lines("stdout", stdout, stdout_tx, cancel.clone())),
            tokio::spawn(read_lines("stderr", stderr, stderr_tx, cancel.clone())),
        ];

        Self {
            cancel,
            stdout_rx,
            stderr_rx,
            tasks,
            stdout_log: Vec::new(),
            stderr_log: Vec::new(),
        }
    }

    /// Move everything captured so far into the append-only logs.
    pub fn drain(&mut self) {
        while let Ok(line) = self.stdout_rx.try_recv() {
            self.stdout_log.push(line);
        }
        while let Ok(line) = self.stderr_rx.try_recv() {
            self.stderr_log.push(line);
        }
    }

    /// All stdout lines captured so far.
    pub fn stdout_lines(&mut self) -> &[String] {
        self.drain();
        &self.stdout_log
    }

    /// All stderr lines captured so far.
    pub fn stderr_lines(&mut self) -> &[String] {
        self.drain();
        &self.stderr_log
    }

    /// Bounded tails of both captured streams.
    pub fn tails(&mut self, limit: usize) -> StreamTails {
        self.drain();
        StreamTails {
            stdout: tail_chars(&self.stdout_log.join("\n"), limit),
            stderr: tail_chars(&self.stderr_log.join("\n"), limit),
        }
    }

    /// Stop the capture tasks and collect their remaining output.
    ///
    /// The tasks normally finish on their own once the worker exits and the
    /// streams close; they get a short grace to reach end-of-stream so no
    /// buffered line is lost. Cancellation covers streams that are still
    /// open.
    pub async fn stop(&mut self) {
        const STOP_GRACE: std::time::Duration = std::time::Duration::from_millis(250);

        for mut task in self.tasks.drain(..) {
            if tokio::time::timeout(STOP_GRACE, &mut task).await.is_err() {
                self.cancel.cancel();
                let _ = task.await;
            }
        }
        self.drain();
    }
}

async fn read_lines<R>(
    stream_name: &'static str,
    reader: R,
    tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = std::pin::pin!(line_stream(reader));
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,
            line = lines.next() => match line {
                Some(Ok(line)) => {
                    tracing::info!(stream = stream_name, line = %line, "worker output");
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!(stream = stream_name, error = %e, "Worker stream read failed");
                    break;
                }
                // End of stream: the worker exited and closed its pipe.
                None => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_line_stream_yields_lines() {
        let data: &[u8] = b"first\nsecond\nthird";
        let lines: Vec<String> = line_stream(data)
            .map(|line| line.unwrap())
            .collect()
            .await;
        assert_eq!(lines, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_line_stream_ends_cleanly_on_eof() {
        let data: &[u8] = b"";
        let lines: Vec<std::io::Result<String>> = line_stream(data).collect().await;
        assert!(lines.is_empty());
    }
}
