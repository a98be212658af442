//! Stop-waypoint output sinks.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::decision::StopWaypoint;

/// Output message, one per processed frame: `{"traffic_waypoint": N}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficWaypointMessage {
    pub traffic_waypoint: StopWaypoint,
}

/// A published decision tagged with the frame that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publication {
    pub frame_seq: u64,
    pub value: StopWaypoint,
}

#[async_trait]
pub trait StopWaypointSink: Send + 'static {
    /// Returns `Err` when the output is gone for good.
    async fn publish(&mut self, publication: Publication) -> Result<()>;

    fn sink_name(&self) -> &str;
}

/// Writes one JSON line per decision to stdout.
pub struct StdoutSink {
    out: tokio::io::Stdout,
    line: Vec<u8>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            out: tokio::io::stdout(),
            line: Vec::with_capacity(32),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StopWaypointSink for StdoutSink {
    async fn publish(&mut self, publication: Publication) -> Result<()> {
        self.line.clear();
        serde_json::to_writer(
            &mut self.line,
            &TrafficWaypointMessage { traffic_waypoint: publication.value },
        )?;
        self.line.push(b'\n');
        self.out.write_all(&self.line).await.context("writing to stdout")?;
        self.out.flush().await.context("flushing stdout")?;
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "stdout"
    }
}

/// Forwards decisions into an mpsc channel.
pub struct ChannelSink {
    tx: mpsc::Sender<Publication>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Publication>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Publication>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl StopWaypointSink for ChannelSink {
    async fn publish(&mut self, publication: Publication) -> Result<()> {
        self.tx
            .send(publication)
            .await
            .map_err(|_| anyhow::anyhow!("stop-waypoint receiver dropped"))
    }

    fn sink_name(&self) -> &str {
        "channel"
    }
}
