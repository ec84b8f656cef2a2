//! Session Handler
//!
//! ## Session Lifecycle
//!
//! ```text
//! 1. Session created
//!        │
//!        ▼
//! 2. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  [prompt] ─> read line       │
//!    │              │               │
//!    │              ▼               │
//!    │  blank? skip   QUIT? stop    │
//!    │              │               │
//!    │              ▼               │
//!    │  execute ─> write reply      │
//!    │              │               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 3. End of input / QUIT / I/O error
//! ```

use crate::commands::{CommandHandler, Reply};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace, warn};

/// Statistics for shell sessions
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Total commands executed
    pub commands_processed: AtomicU64,
    /// Commands that produced an error reply
    pub command_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command_processed(&self, failed: bool) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.command_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// One read-execute-reply loop over a line reader and a writer.
pub struct Session<R, W> {
    reader: R,
    writer: W,
    command_handler: CommandHandler,
    stats: Arc<SessionStats>,
    /// Written before each line when set
    prompt: Option<String>,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        reader: R,
        writer: W,
        command_handler: CommandHandler,
        stats: Arc<SessionStats>,
    ) -> Self {
        Self {
            reader,
            writer,
            command_handler,
            stats,
            prompt: None,
        }
    }

    /// Writes `prompt` before reading each line.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Runs until end of input, `QUIT`/`EXIT`, or an I/O error.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let prefix = self.command_handler.namespace().prefix().to_owned();
        info!(namespace = %prefix, "Session started");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(namespace = %prefix, "Session ended"),
            Err(e) => warn!(namespace = %prefix, error = %e, "Session error"),
        }

        result
    }

    async fn main_loop(&mut self) -> Result<(), SessionError> {
        let mut line = String::new();

        loop {
            if let Some(prompt) = &self.prompt {
                let prompt = prompt.clone();
                self.write_raw(prompt.as_bytes()).await?;
            }

            line.clear();
            let n = self.reader.read_line(&mut line).await?;
            if n == 0 {
                debug!("End of input");
                return Ok(());
            }
            self.stats.bytes_read(n);

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if is_quit(input) {
                debug!("Quit requested");
                return Ok(());
            }

            let reply = self.command_handler.execute_line(input);
            self.stats.command_processed(reply.is_error());
            trace!(command = input, "Executed command");

            self.send_reply(&reply).await?;
        }
    }

    async fn send_reply(&mut self, reply: &Reply) -> Result<(), SessionError> {
        let out = format!("{}\n", reply);
        self.write_raw(out.as_bytes()).await
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(bytes = bytes.len(), "Sent output");
        Ok(())
    }
}

fn is_quit(input: &str) -> bool {
    input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit")
}

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs a session without a prompt.
pub async fn run_session<R, W>(
    reader: R,
    writer: W,
    command_handler: CommandHandler,
    stats: Arc<SessionStats>,
) -> Result<(), SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    Session::new(reader, writer, command_handler, stats)
        .run()
        .await
}
