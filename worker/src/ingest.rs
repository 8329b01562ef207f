use std::future::Future;
use std::time::Instant;

use barcode_worker_common::config::FramePolicy;
use barcode_worker_common::event::OutputEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::debounce::DebounceFilter;
use crate::decoder::FrameDecoder;
use crate::recognizer::Recognizer;

/// Counters reported when the loop ends.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    pub skipped: u64,
    pub frames_decoded: u64,
    pub detections: u64,
    pub emitted: u64,
    pub suppressed: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read input stream: {0}")]
    Read(std::io::Error),
    #[error("failed to write output event: {0}")]
    Write(std::io::Error),
}

/// Drives decoder -> recognizer -> debounce for one line at a time.
///
/// Owns the only state that outlives a frame (the debounce record). Frames
/// are processed strictly in arrival order, one at a time, and each
/// contributes at most one event.
pub struct IngestLoop {
    decoder: FrameDecoder,
    recognizer: Recognizer,
    debounce: DebounceFilter,
    policy: FramePolicy,
    stats: IngestStats,
}

impl IngestLoop {
    pub fn new(
        decoder: FrameDecoder,
        recognizer: Recognizer,
        debounce: DebounceFilter,
        policy: FramePolicy,
    ) -> Self {
        Self {
            decoder,
            recognizer,
            debounce,
            policy,
            stats: IngestStats::default(),
        }
    }

    /// Handle one raw input line received at `now`.
    pub fn process_line(&mut self, line: &[u8], now: Instant) -> Option<OutputEvent> {
        self.stats.lines += 1;

        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }

        let grid = match self.decoder.decode(line) {
            Ok(grid) => grid,
            Err(skip) => {
                self.stats.skipped += 1;
                debug!(reason = %skip, bytes = line.len(), "skipping frame");
                return None;
            }
        };

        self.stats.frames_decoded += 1;
        if self.stats.frames_decoded % 100 == 0 {
            debug!(
                frames = self.stats.frames_decoded,
                skipped = self.stats.skipped,
                emitted = self.stats.emitted,
                "frames processed"
            );
        }

        let detections = self.recognizer.recognize(&grid);
        drop(grid);
        self.stats.detections += detections.len() as u64;

        for detection in detections {
            if self.debounce.accept(now, &detection.payload) {
                self.stats.emitted += 1;
                info!(
                    payload = detection.payload,
                    format = detection.symbology,
                    "barcode detected"
                );
                return Some(OutputEvent::barcode(detection.payload, detection.symbology));
            }
            self.stats.suppressed += 1;
            if self.policy == FramePolicy::FirstCandidate {
                break;
            }
        }
        None
    }

    /// Emit `ready`, then process lines until end of input or until
    /// `shutdown` resolves.
    pub async fn run<R, W, S>(
        mut self,
        mut reader: R,
        mut writer: W,
        shutdown: S,
    ) -> Result<IngestStats, IngestError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        emit(&mut writer, &OutputEvent::ready())
            .await
            .map_err(IngestError::Write)?;
        info!(
            backend = self.recognizer.backend_name(),
            debounce_ms = self.debounce.window().as_millis() as u64,
            policy = ?self.policy,
            "ready, waiting for frames"
        );

        tokio::pin!(shutdown);
        let mut line = Vec::with_capacity(64 * 1024);

        loop {
            line.clear();
            let read = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("termination signal received, stopping");
                    break;
                }
                read = reader.read_until(b'\n', &mut line) => read.map_err(IngestError::Read)?,
            };

            if read == 0 {
                info!("input stream closed");
                break;
            }

            if let Some(event) = self.process_line(&line, Instant::now()) {
                emit(&mut writer, &event)
                    .await
                    .map_err(IngestError::Write)?;
            }
        }

        info!(
            lines = self.stats.lines,
            skipped = self.stats.skipped,
            frames = self.stats.frames_decoded,
            detections = self.stats.detections,
            emitted = self.stats.emitted,
            suppressed = self.stats.suppressed,
            "ingest loop finished"
        );
        Ok(self.stats)
    }
}

/// Write one event line and flush it straight away.
pub async fn emit<W: AsyncWrite + Unpin>(
    writer: &mut W,
    event: &OutputEvent,
) -> std::io::Result<()> {
    writer.write_all(event.to_line().as_bytes()).await?;
    writer.flush().await
}
