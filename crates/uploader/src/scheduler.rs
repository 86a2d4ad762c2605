use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use zipgate_protocol::messages::HandshakeRequest;
use zipgate_transfer::{ChunkSource, DEFAULT_CHUNK_SIZE, chunk_len};

use crate::UploadError;
use crate::chunks::ChunkBoard;
use crate::fingerprint::file_fingerprint;
use crate::progress::SpeedEstimator;
use crate::transport::Transport;
use crate::types::{ChunkStatus, UploadEvent, UploadOutcome, UploadProgress};

/// Tunables for the upload scheduler.
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Chunk size; must match the server's fixed chunk size.
    pub chunk_size: usize,
    /// Maximum chunks in flight at once.
    pub max_concurrent: usize,
    /// Attempts per chunk before it is marked a terminal error.
    pub max_attempts: u32,
    /// Failed attempt `k` waits `2^k × backoff_base` before retrying.
    pub backoff_base: Duration,
    /// Progress snapshot interval.
    pub report_interval: Duration,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent: 3,
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            report_interval: Duration::from_millis(300),
        }
    }
}

/// Shared state of one running upload, cloned into every chunk task.
struct TaskContext {
    transport: Arc<dyn Transport>,
    source: Arc<ChunkSource>,
    board: Arc<ChunkBoard>,
    speed: Arc<SpeedEstimator>,
    events_tx: mpsc::Sender<UploadEvent>,
    upload_id: String,
    max_attempts: u32,
    backoff_base: Duration,
}

/// Drives one file's chunks to the server under a concurrency cap.
///
/// Events (progress snapshots, terminal chunk failures, completion) arrive
/// on the channel returned by [`take_events`](Uploader::take_events); the
/// channel is bounded and delivery is lossy under backpressure, since every
/// event is observational. Cancel via [`cancel_token`](Uploader::cancel_token):
/// no new chunks start, in-flight ones finish or fail.
pub struct Uploader {
    transport: Arc<dyn Transport>,
    config: UploaderConfig,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
}

impl Uploader {
    pub fn new(transport: Arc<dyn Transport>, config: UploaderConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            transport,
            config,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this upload.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads `path` to completion and finalizes.
    ///
    /// Resumes any prior partial upload of the same unmodified file, keeps
    /// at most `max_concurrent` chunks in flight, retries each chunk with
    /// exponential backoff, and calls finalize exactly once, only after
    /// every chunk reached `success`.
    pub async fn run(&self, path: &Path) -> Result<UploadOutcome, UploadError> {
        let source = ChunkSource::open(path, self.config.chunk_size)?;
        let total_chunks = source.chunk_count();
        let total_size = source.total_size();
        let chunk_size = source.chunk_size();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let file_hash = file_fingerprint(path)?;

        let resp = self
            .transport
            .handshake(HandshakeRequest {
                file_hash,
                filename,
                total_size,
                total_chunks,
            })
            .await?;
        let upload_id = resp.upload_id;

        let board = Arc::new(ChunkBoard::new(total_chunks));
        board.mark_resumed(&resp.uploaded_chunks);
        let resumed_bytes: i64 = resp
            .uploaded_chunks
            .iter()
            .map(|&index| chunk_len(index, total_size, chunk_size) as i64)
            .sum();
        info!(
            upload_id = %upload_id,
            total_chunks,
            resumed = resp.uploaded_chunks.len(),
            "handshake complete"
        );

        let speed = Arc::new(SpeedEstimator::new());
        let reporter_stop = CancellationToken::new();
        let reporter = self.spawn_reporter(
            upload_id.clone(),
            Arc::clone(&board),
            Arc::clone(&speed),
            total_size,
            resumed_bytes,
            reporter_stop.clone(),
        );

        let ctx = Arc::new(TaskContext {
            transport: Arc::clone(&self.transport),
            source: Arc::new(source),
            board: Arc::clone(&board),
            speed: Arc::clone(&speed),
            events_tx: self.events_tx.clone(),
            upload_id: upload_id.clone(),
            max_attempts: self.config.max_attempts.max(1),
            backoff_base: self.config.backoff_base,
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut tasks = JoinSet::new();
        for index in board.pending_indices() {
            // A new transmission starts only when a slot frees up; abort
            // stops scheduling but lets in-flight chunks finish.
            let permit = tokio::select! {
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move { send_chunk(ctx, index, permit).await });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "chunk task failed to join");
            }
        }

        reporter_stop.cancel();
        let _ = reporter.await;

        if !board.all_success() {
            if self.cancel.is_cancelled() {
                let _ = self.events_tx.try_send(UploadEvent::Failed {
                    error: "cancelled".into(),
                });
                return Err(UploadError::Cancelled);
            }
            let failed = board.total() - board.success_count();
            let _ = self.events_tx.try_send(UploadEvent::Failed {
                error: format!("{failed} chunks failed after retries"),
            });
            return Err(UploadError::ChunksFailed { failed });
        }

        // Every chunk is acknowledged; ask the server to verify.
        let fin = self.transport.finalize(&upload_id).await?;
        info!(upload_id = %upload_id, hash = %fin.hash, "upload finalized");
        let _ = self.events_tx.try_send(UploadEvent::Completed {
            hash: fin.hash.clone(),
            files_in_zip: fin.files_in_zip.clone(),
        });

        Ok(UploadOutcome {
            upload_id,
            hash: fin.hash,
            files_in_zip: fin.files_in_zip,
        })
    }

    fn spawn_reporter(
        &self,
        upload_id: String,
        board: Arc<ChunkBoard>,
        speed: Arc<SpeedEstimator>,
        total_size: i64,
        resumed_bytes: i64,
        stop: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let events_tx = self.events_tx.clone();
        let interval = self.config.report_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let snapshot =
                            progress_snapshot(&upload_id, &board, &speed, total_size, resumed_bytes);
                        let _ = events_tx.try_send(UploadEvent::Progress(snapshot));
                    }
                    _ = stop.cancelled() => {
                        // Final snapshot so consumers see the end state.
                        let snapshot =
                            progress_snapshot(&upload_id, &board, &speed, total_size, resumed_bytes);
                        let _ = events_tx.try_send(UploadEvent::Progress(snapshot));
                        break;
                    }
                }
            }
        })
    }
}

fn progress_snapshot(
    upload_id: &str,
    board: &ChunkBoard,
    speed: &SpeedEstimator,
    total_size: i64,
    resumed_bytes: i64,
) -> UploadProgress {
    let total = board.total();
    let succeeded = board.success_count();
    let percent = if total == 0 {
        100.0
    } else {
        succeeded as f64 / total as f64 * 100.0
    };
    let transferred = resumed_bytes + speed.bytes_transferred();
    UploadProgress {
        upload_id: upload_id.to_string(),
        total_chunks: total,
        succeeded_chunks: succeeded,
        percent,
        bytes_per_second: speed.bytes_per_second(),
        eta_seconds: speed.eta(total_size - transferred).map(|d| d.as_secs_f64()),
    }
}

async fn send_chunk(ctx: Arc<TaskContext>, index: u32, _permit: OwnedSemaphorePermit) {
    let bytes = {
        let source = Arc::clone(&ctx.source);
        let read = tokio::task::spawn_blocking(move || source.read_chunk(index)).await;
        match read {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                warn!(chunk = index, error = %e, "chunk read failed");
                ctx.board.set(index, ChunkStatus::Error);
                let _ = ctx.events_tx.try_send(UploadEvent::ChunkFailed { index });
                return;
            }
            Err(e) => {
                warn!(chunk = index, error = %e, "chunk read task failed");
                ctx.board.set(index, ChunkStatus::Error);
                let _ = ctx.events_tx.try_send(UploadEvent::ChunkFailed { index });
                return;
            }
        }
    };
    let len = bytes.len() as i64;

    let mut attempt: u32 = 0;
    loop {
        ctx.board.set(index, ChunkStatus::Uploading);
        match ctx
            .transport
            .upload_chunk(&ctx.upload_id, index, bytes.clone())
            .await
        {
            Ok(_ack) => {
                ctx.board.set(index, ChunkStatus::Success);
                ctx.speed.record(len);
                debug!(chunk = index, "chunk uploaded");
                return;
            }
            Err(e) => {
                attempt += 1;
                if attempt >= ctx.max_attempts {
                    warn!(chunk = index, attempts = attempt, error = %e, "chunk failed permanently");
                    ctx.board.set(index, ChunkStatus::Error);
                    let _ = ctx.events_tx.try_send(UploadEvent::ChunkFailed { index });
                    return;
                }
                let delay = ctx.backoff_base * 2u32.pow(attempt);
                debug!(chunk = index, attempt, ?delay, "retrying chunk");
                ctx.board.set(index, ChunkStatus::Retrying);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
