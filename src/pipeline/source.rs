//! Input event sources.
//!
//! Every upstream channel (pose, route, ground-truth lights, camera) is
//! multiplexed onto one stream of [`InputEvent`]s. Sources: JSON lines on
//! stdin, a JSON-lines replay file, and an in-process mpsc channel.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::types::{Frame, Pose, TrafficLight, WaypointPath};

/// One upstream message.
///
/// Wire form is a JSON object tagged by `type`, e.g.
/// `{"type":"pose","position":{"x":1.0,"y":2.0},"orientation":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    Pose(Pose),
    Waypoints(WaypointPath),
    Lights { lights: Vec<TrafficLight> },
    Frame(Frame),
}

impl InputEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InputEvent::Pose(_) => "pose",
            InputEvent::Waypoints(_) => "waypoints",
            InputEvent::Lights { .. } => "lights",
            InputEvent::Frame(_) => "frame",
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Malformed event on line {line}: {source}")]
    Parse {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse one JSON line. Blank lines yield `Ok(None)`.
pub fn parse_line(line_no: u64, line: &str) -> Result<Option<InputEvent>, SourceError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|source| SourceError::Parse { line: line_no, source })
}

/// Events produced by a source.
#[derive(Debug)]
pub enum SourceEvent {
    Input(InputEvent),
    /// No more data (EOF for files/stdin, all senders dropped for channels).
    Eof,
}

/// Where input events come from.
///
/// The router calls [`next_event`](EventSource::next_event) in a select!
/// with cancellation.
#[async_trait]
pub trait EventSource: Send + 'static {
    /// Returns `Err` only on unrecoverable I/O errors; malformed lines are
    /// skipped with a warning.
    async fn next_event(&mut self) -> Result<SourceEvent>;

    /// Human-readable name for logging
    fn source_name(&self) -> &str;
}

// ============================================================================
// JSON lines (shared by stdin and file replay)
// ============================================================================

struct JsonLines<R> {
    reader: R,
    buffer: String,
    line_no: u64,
    malformed: u64,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::with_capacity(4096),
            line_no: 0,
            malformed: 0,
        }
    }

    async fn next(&mut self, source: &str) -> Result<Option<InputEvent>> {
        loop {
            self.buffer.clear();
            let bytes = self.reader.read_line(&mut self.buffer).await?;
            if bytes == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            match parse_line(self.line_no, &self.buffer) {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => continue,
                Err(e) => {
                    self.malformed += 1;
                    tracing::warn!(source, error = %e, "Skipping malformed input line");
                }
            }
        }
    }
}

// ============================================================================
// Stdin Source
// ============================================================================

/// Reads JSON input events from stdin, one per line.
///
/// Used with the simulator: `tl-sim | tl-detector --stdin`
pub struct StdinSource {
    lines: JsonLines<BufReader<tokio::io::Stdin>>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            lines: JsonLines::new(BufReader::new(tokio::io::stdin())),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSource for StdinSource {
    async fn next_event(&mut self) -> Result<SourceEvent> {
        Ok(match self.lines.next("stdin").await? {
            Some(event) => SourceEvent::Input(event),
            None => SourceEvent::Eof,
        })
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

// ============================================================================
// JSON-lines file replay
// ============================================================================

/// Replays a recorded JSON-lines file, pacing camera frames by
/// `frame_delay` so the frame slot is not overrun.
pub struct JsonlFileSource {
    lines: JsonLines<BufReader<tokio::fs::File>>,
    frame_delay: Duration,
    yielded_frame: bool,
}

impl JsonlFileSource {
    pub async fn open(path: &Path, frame_delay: Duration) -> Result<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("opening replay file {}", path.display()))?;
        Ok(Self {
            lines: JsonLines::new(BufReader::new(file)),
            frame_delay,
            yielded_frame: false,
        })
    }

    /// Lines skipped so far because they failed to parse.
    pub fn malformed_lines(&self) -> u64 {
        self.lines.malformed
    }
}

#[async_trait]
impl EventSource for JsonlFileSource {
    async fn next_event(&mut self) -> Result<SourceEvent> {
        let Some(event) = self.lines.next("replay").await? else {
            return Ok(SourceEvent::Eof);
        };
        if matches!(event, InputEvent::Frame(_)) {
            // No delay before the first frame
            if self.yielded_frame && !self.frame_delay.is_zero() {
                tokio::time::sleep(self.frame_delay).await;
            }
            self.yielded_frame = true;
        }
        Ok(SourceEvent::Input(event))
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}

// ============================================================================
// Channel Source
// ============================================================================

/// In-process source fed through an mpsc channel.
pub struct ChannelSource {
    rx: mpsc::Receiver<InputEvent>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<InputEvent>) -> Self {
        Self { rx }
    }

    /// Bounded channel plus the source reading from it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<InputEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next_event(&mut self) -> Result<SourceEvent> {
        Ok(match self.rx.recv().await {
            Some(event) => SourceEvent::Input(event),
            None => SourceEvent::Eof,
        })
    }

    fn source_name(&self) -> &str {
        "channel"
    }
}
