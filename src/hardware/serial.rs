//! Line-oriented panel transport over any tokio byte stream.
//!
//! The serial device is expected to be configured already (baud rate, raw
//! mode); it is opened as a plain character device.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex as TokioMutex;

use super::codec::{decode_line, encode_pattern};
use super::{HardwareError, HardwareEvent, HardwareSink, HardwareSource};
use crate::game::Signal;

/// Writes pattern frames to the panel.
pub struct LineSink<W> {
    writer: TokioMutex<W>,
}

impl<W> LineSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: TokioMutex::new(writer),
        }
    }
}

#[async_trait]
impl<W> HardwareSink for LineSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, pattern: &[Signal]) -> Result<(), HardwareError> {
        let frame = encode_pattern(pattern);
        let mut writer = self.writer.lock().await;
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await?;
        tracing::debug!("Sent pattern frame {:?}", frame.trim_end());
        Ok(())
    }
}

/// Reads button frames from the panel, one line at a time.
pub struct LineSource<R> {
    lines: Lines<BufReader<R>>,
}

impl<R> LineSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }
}

#[async_trait]
impl<R> HardwareSource for LineSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn next_event(&mut self) -> Option<Result<HardwareEvent, HardwareError>> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(Ok(decode_line(&line))),
            Ok(None) => None,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                // Garbled bytes (not UTF-8) are line noise, not a dead link.
                Some(Ok(HardwareEvent::Noise(format!("undecodable line: {}", e))))
            }
            Err(e) => Some(Err(HardwareError::Io(e))),
        }
    }
}

/// Open the panel's serial device for both directions.
pub async fn open_device(
    path: impl AsRef<Path>,
) -> std::io::Result<(LineSink<File>, LineSource<File>)> {
    let path = path.as_ref();
    let file = OpenOptions::new().read(true).write(true).open(path).await?;
    let reader = file.try_clone().await?;
    tracing::info!("Opened panel device {:?}", path);
    Ok((LineSink::new(file), LineSource::new(reader)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn sig(v: i64) -> Signal {
        Signal::new(v).unwrap()
    }

    #[tokio::test]
    async fn sink_writes_frames() {
        let (client, mut server) = tokio::io::duplex(64);
        let sink = LineSink::new(client);

        sink.send(&[sig(2), sig(5)]).await.unwrap();
        sink.send(&[sig(1)]).await.unwrap();
        drop(sink);

        let mut written = String::new();
        server.read_to_string(&mut written).await.unwrap();
        assert_eq!(written, "P:2,5\nP:1\n");
    }

    #[tokio::test]
    async fn source_decodes_lines_until_eof() {
        let input: &[u8] = b"READY\nB:3\n1\r\nB:7\n";
        let mut source = LineSource::new(input);

        let mut events = Vec::new();
        while let Some(event) = source.next_event().await {
            events.push(event.unwrap());
        }

        assert_eq!(
            events,
            vec![
                HardwareEvent::Noise("READY".to_string()),
                HardwareEvent::Button(sig(3)),
                HardwareEvent::Button(sig(1)),
                HardwareEvent::Noise("B:7".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_noise() {
        let input: &[u8] = b"\xff\xfe\n";
        let mut source = LineSource::new(input);

        assert!(matches!(
            source.next_event().await,
            Some(Ok(HardwareEvent::Noise(_)))
        ));
    }

    #[tokio::test]
    async fn open_device_missing_path_fails() {
        assert!(open_device("/nonexistent/ttyPANEL0").await.is_err());
    }
}
