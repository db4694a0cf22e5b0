//! Button panel connection.
//!
//! The coordinator talks to the panel through two narrow traits:
//! - `HardwareSink` lights a pattern on the LEDs (best effort, no ack)
//! - `HardwareSource` yields inbound button presses and line noise
//!
//! `serial` implements both over a line-oriented byte stream; `NullSink`
//! and `ChannelSource` stand in when no panel is attached.

pub mod codec;
pub mod serial;

pub use serial::{open_device, LineSink, LineSource};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::game::Signal;

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Panel disconnected")]
    Disconnected,
}

/// One inbound event from the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareEvent {
    Button(Signal),
    /// Anything that is not a valid button frame.
    Noise(String),
}

#[async_trait]
pub trait HardwareSink: Send + Sync + 'static {
    async fn send(&self, pattern: &[Signal]) -> Result<(), HardwareError>;
}

#[async_trait]
pub trait HardwareSource: Send + 'static {
    /// Next event, or `None` once the stream has ended for good.
    async fn next_event(&mut self) -> Option<Result<HardwareEvent, HardwareError>>;
}

/// Sink for running without a panel: patterns are only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl HardwareSink for NullSink {
    async fn send(&self, pattern: &[Signal]) -> Result<(), HardwareError> {
        tracing::debug!("No panel attached, pattern {:?} not displayed", pattern);
        Ok(())
    }
}

/// Event source fed through an in-process channel.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<HardwareEvent>,
}

impl ChannelSource {
    pub fn new() -> (mpsc::UnboundedSender<HardwareEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl HardwareSource for ChannelSource {
    async fn next_event(&mut self) -> Option<Result<HardwareEvent, HardwareError>> {
        self.rx.recv().await.map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_source_yields_then_ends() {
        let (tx, mut source) = ChannelSource::new();
        tx.send(HardwareEvent::Button(Signal::new(4).unwrap())).unwrap();
        tx.send(HardwareEvent::Noise("boot".to_string())).unwrap();
        drop(tx);

        assert_eq!(
            source.next_event().await.unwrap().unwrap(),
            HardwareEvent::Button(Signal::new(4).unwrap())
        );
        assert_eq!(
            source.next_event().await.unwrap().unwrap(),
            HardwareEvent::Noise("boot".to_string())
        );
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn null_sink_accepts_everything() {
        let pattern = [Signal::new(1).unwrap(), Signal::new(5).unwrap()];
        assert!(NullSink.send(&pattern).await.is_ok());
    }
}
