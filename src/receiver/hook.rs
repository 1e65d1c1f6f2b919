// ABOUTME: Hands decoded messages to the external hook program as JSON
// ABOUTME: A single writer task serializes every delivery so callers never block on the hook

use crate::assembler::DecodedMessage;
use crate::receiver::config::{Device, HookMode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Longest an event-mode hook process may run.
const EVENT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error)]
pub enum HookError {
    #[error("cannot start hook {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("hook I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot serialize message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("hook did not finish within {0:?}")]
    Timeout(Duration),

    #[error("hook exited with {0}")]
    Failed(std::process::ExitStatus),
}

/// The record written to the hook for every message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    pub smsc: String,
    pub system_id: String,
    pub system_type: String,
    pub owner: String,
    pub phone: String,
    pub extra: serde_json::Value,
    pub source: String,
    pub target: String,
    pub message: String,
    pub deliver_time: DateTime<Utc>,
}

impl Payload {
    pub fn new(device: &Device, message: DecodedMessage) -> Self {
        Payload {
            smsc: device.smsc.clone(),
            system_id: device.system_id.clone(),
            system_type: device.system_type.clone(),
            owner: device.owner.clone(),
            phone: device.phone.clone(),
            extra: device.extra.clone(),
            source: message.source,
            target: message.target,
            message: message.text,
            deliver_time: message.delivered_at,
        }
    }
}

/// Program and arguments run for every delivery.
#[derive(Debug, Clone)]
pub struct HookCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub mode: HookMode,
}

impl HookCommand {
    fn spawn(&self) -> Result<Child, HookError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HookError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

/// Cheap handle for queueing payloads to the hook writer task.
#[derive(Debug, Clone)]
pub struct HookSink {
    tx: mpsc::UnboundedSender<Payload>,
}

impl HookSink {
    /// Start the writer task. It ends once every `HookSink` clone is dropped
    /// and the queue is drained.
    pub fn spawn(command: HookCommand) -> (HookSink, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(write_loop(command, rx));
        (HookSink { tx }, task)
    }

    /// A sink whose payloads are read from the returned receiver.
    pub fn channel() -> (HookSink, mpsc::UnboundedReceiver<Payload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (HookSink { tx }, rx)
    }

    /// Queue a payload without waiting for the hook.
    pub fn emit(&self, payload: Payload) {
        if self.tx.send(payload).is_err() {
            warn!("hook writer has stopped, message dropped");
        }
    }
}

async fn write_loop(command: HookCommand, mut rx: mpsc::UnboundedReceiver<Payload>) {
    let mut stream = None;

    while let Some(payload) = rx.recv().await {
        let result = match command.mode {
            HookMode::Event => run_event(&command, &payload).await,
            HookMode::Ndjson => write_ndjson(&command, &mut stream, &payload).await,
        };
        if let Err(e) = result {
            error!(error = %e, source = %payload.source, "hook failed, message dropped");
        }
    }

    if let Some(mut stream) = stream {
        if let Err(e) = stream.finish().await {
            warn!(error = %e, "hook did not shut down cleanly");
        }
    }
}

async fn run_event(command: &HookCommand, payload: &Payload) -> Result<(), HookError> {
    let mut line = serde_json::to_vec(payload)?;
    line.push(b'\n');

    let mut child = command.spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        // A hook that ignores its input may close stdin early
        if let Err(e) = stdin.write_all(&line).await {
            debug!(error = %e, "hook closed stdin");
        }
    }

    let status = tokio::time::timeout(EVENT_TIMEOUT, child.wait())
        .await
        .map_err(|_| HookError::Timeout(EVENT_TIMEOUT))??;
    if !status.success() {
        return Err(HookError::Failed(status));
    }
    Ok(())
}

/// The long-running ndjson hook process.
struct Stream {
    child: Child,
    stdin: ChildStdin,
}

impl Stream {
    fn start(command: &HookCommand) -> Result<Stream, HookError> {
        let mut child = command.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HookError::Io(std::io::Error::other("hook stdin not captured")))?;
        Ok(Stream { child, stdin })
    }

    async fn write(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.stdin.write_all(line).await?;
        self.stdin.flush().await
    }

    async fn finish(mut self) -> Result<(), HookError> {
        drop(self.stdin);
        self.child.wait().await?;
        Ok(())
    }
}

async fn write_ndjson(
    command: &HookCommand,
    stream: &mut Option<Stream>,
    payload: &Payload,
) -> Result<(), HookError> {
    let mut line = serde_json::to_vec(payload)?;
    line.push(b'\n');

    if let Some(current) = stream.as_mut() {
        match current.write(&line).await {
            Ok(()) => return Ok(()),
            Err(e) => warn!(error = %e, "hook process went away, restarting it"),
        }
    }

    // Dropping the old child kills it
    *stream = None;
    let mut fresh = Stream::start(command)?;
    fresh.write(&line).await?;
    *stream = Some(fresh);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(message: &str) -> Payload {
        Payload {
            smsc: "10.0.0.1:2775".to_string(),
            system_id: "gw1".to_string(),
            system_type: String::new(),
            owner: "ops".to_string(),
            phone: "+15550100".to_string(),
            extra: json!({ "slot": 2 }),
            source: "447700900000".to_string(),
            target: "1234".to_string(),
            message: message.to_string(),
            deliver_time: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn payload_json_fields() {
        let value = serde_json::to_value(payload("hello")).unwrap();
        assert_eq!(
            value,
            json!({
                "smsc": "10.0.0.1:2775",
                "system_id": "gw1",
                "system_type": "",
                "owner": "ops",
                "phone": "+15550100",
                "extra": { "slot": 2 },
                "source": "447700900000",
                "target": "1234",
                "message": "hello",
                "deliver_time": "2024-05-01T12:00:00Z",
            })
        );
    }

    #[tokio::test]
    async fn channel_sink_receives_payloads() {
        let (sink, mut rx) = HookSink::channel();
        sink.emit(payload("one"));
        sink.emit(payload("two"));
        drop(sink);

        assert_eq!(rx.recv().await.unwrap().message, "one");
        assert_eq!(rx.recv().await.unwrap().message, "two");
        assert!(rx.recv().await.is_none());
    }

    #[cfg(unix)]
    async fn run_hook(mode: HookMode, messages: &[&str]) -> Vec<serde_json::Value> {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.ndjson");
        let command = HookCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec![
                "-c".to_string(),
                format!("cat >> '{}'", out.display()),
            ],
            mode,
        };

        let (sink, task) = HookSink::spawn(command);
        for message in messages {
            sink.emit(payload(message));
        }
        drop(sink);
        task.await.unwrap();

        std::fs::read_to_string(&out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn event_mode_runs_once_per_message() {
        let records = run_hook(HookMode::Event, &["first", "second"]).await;
        let messages: Vec<_> = records.iter().map(|r| r["message"].clone()).collect();
        assert_eq!(messages, vec![json!("first"), json!("second")]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ndjson_mode_streams_lines() {
        let records = run_hook(HookMode::Ndjson, &["a", "b", "c"]).await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[2]["message"], json!("c"));
        assert_eq!(records[0]["owner"], json!("ops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_hook_does_not_stop_writer() {
        let command = HookCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), "exit 3".to_string()],
            mode: HookMode::Event,
        };
        let (sink, task) = HookSink::spawn(command);
        sink.emit(payload("x"));
        sink.emit(payload("y"));
        drop(sink);
        task.await.unwrap();
    }
}
