//! Paced background sender for queued parameter writes
//!
//! Frames are handed to a dedicated worker thread over a bounded flume
//! channel and sent in FIFO order, no closer together than the configured
//! minimum interval. The worker starts on the first enqueue.
//!
//! ```text
//! tweak_parameter → enqueue → flume → stomp-dispatch thread → Transport::send
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender, TrySendError};
use stomp_core::format_hex;

use crate::transport::Transport;
use crate::StompError;

/// How long the worker blocks waiting for work before re-checking the running flag
const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

enum DispatchMessage {
    Frame { frame: Vec<u8>, enqueued_at: Instant },
    /// Sent by `stop()` to cut the idle wait short
    Wake,
}

/// Dispatcher counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Frames the transport accepted
    pub sent: u64,
    /// Frames the transport rejected (logged and skipped)
    pub failed: u64,
    /// Frames still queued when the dispatcher stopped
    pub discarded: u64,
    /// Frames currently waiting in the queue
    pub queued: usize,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
}

struct Worker {
    handle: JoinHandle<()>,
    done_rx: Receiver<()>,
}

/// Rate-limited FIFO sender
pub struct RealtimeDispatcher {
    transport: Arc<dyn Transport>,
    queue_tx: Sender<DispatchMessage>,
    queue_rx: Receiver<DispatchMessage>,
    /// Cleared by `stop()`; the worker exits when it sees this false
    running: Arc<AtomicBool>,
    /// Set once by `stop()`
    stopped: AtomicBool,
    worker: Mutex<Option<Worker>>,
    counters: Arc<Counters>,
    min_interval: Duration,
    join_timeout: Duration,
}

impl RealtimeDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        min_interval: Duration,
        queue_capacity: usize,
        join_timeout: Duration,
    ) -> Self {
        let (queue_tx, queue_rx) = flume::bounded(queue_capacity.max(1));
        Self {
            transport,
            queue_tx,
            queue_rx,
            running: Arc::new(AtomicBool::new(true)),
            stopped: AtomicBool::new(false),
            worker: Mutex::new(None),
            counters: Arc::new(Counters::default()),
            min_interval,
            join_timeout,
        }
    }

    /// Queue a frame for paced delivery
    ///
    /// Returns once the frame is queued, not sent. Send failures on the
    /// worker are logged and counted, never reported back.
    pub fn enqueue(&self, frame: Vec<u8>) -> Result<(), StompError> {
        // Held until the frame is queued so `stop()` cannot drain in between
        let mut worker = self.lock_worker();
        self.ensure_running()?;
        if worker.is_none() {
            *worker = Some(self.spawn_worker()?);
        }

        let msg = DispatchMessage::Frame {
            frame,
            enqueued_at: Instant::now(),
        };
        match self.queue_tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                log::warn!("[STOMP OUT] Dispatch queue full, rejecting frame");
                Err(StompError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(StompError::TransportUnavailable(
                "dispatch queue closed".to_string(),
            )),
        }
    }

    /// Send a frame synchronously, bypassing the queue and pacing
    pub fn send_immediate(&self, frame: &[u8]) -> Result<(), StompError> {
        self.ensure_running()?;
        log::debug!("[STOMP OUT] immediate {}", format_hex(frame));
        self.transport.send(frame)?;
        self.counters.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Stop the worker and close the transport
    ///
    /// Waits up to the join timeout for the worker, then detaches it.
    /// Frames still queued are discarded. Safe to call more than once.
    pub fn stop(&self) {
        let worker = {
            let mut worker = self.lock_worker();
            if self.stopped.swap(true, Ordering::SeqCst) {
                return;
            }
            self.running.store(false, Ordering::SeqCst);
            worker.take()
        };
        let _ = self.queue_tx.try_send(DispatchMessage::Wake);

        if let Some(worker) = worker {
            match worker.done_rx.recv_timeout(self.join_timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if worker.handle.join().is_err() {
                        log::error!("STOMP: Dispatcher thread panicked");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "STOMP: Dispatcher did not stop within {:?}, detaching",
                        self.join_timeout
                    );
                }
            }
        }

        self.transport.close();

        let discarded = self
            .queue_rx
            .drain()
            .filter(|msg| matches!(msg, DispatchMessage::Frame { .. }))
            .count() as u64;
        if discarded > 0 {
            log::info!("STOMP: Discarded {} queued frame(s) on stop", discarded);
            self.counters.discarded.fetch_add(discarded, Ordering::Relaxed);
        }
        log::info!("STOMP: Dispatcher stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            queued: self.queue_rx.len(),
        }
    }

    fn ensure_running(&self) -> Result<(), StompError> {
        if self.is_stopped() {
            return Err(StompError::TransportUnavailable(
                "dispatcher stopped".to_string(),
            ));
        }
        Ok(())
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn_worker(&self) -> Result<Worker, StompError> {
        let (done_tx, done_rx) = flume::bounded(1);
        let transport = self.transport.clone();
        let queue_rx = self.queue_rx.clone();
        let running = self.running.clone();
        let counters = self.counters.clone();
        let min_interval = self.min_interval;

        let handle = thread::Builder::new()
            .name("stomp-dispatch".into())
            .spawn(move || {
                Self::run(transport, queue_rx, running, counters, min_interval);
                let _ = done_tx.send(());
            })
            .map_err(StompError::WorkerSpawn)?;

        Ok(Worker { handle, done_rx })
    }

    /// Worker loop running on the dispatcher thread
    fn run(
        transport: Arc<dyn Transport>,
        queue_rx: Receiver<DispatchMessage>,
        running: Arc<AtomicBool>,
        counters: Arc<Counters>,
        min_interval: Duration,
    ) {
        log::info!("STOMP: Dispatcher started (min interval {:?})", min_interval);
        let mut last_send: Option<Instant> = None;

        while running.load(Ordering::SeqCst) {
            let (frame, enqueued_at) = match queue_rx.recv_timeout(IDLE_TIMEOUT) {
                Ok(DispatchMessage::Frame { frame, enqueued_at }) => (frame, enqueued_at),
                Ok(DispatchMessage::Wake) => continue,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            if let Some(last) = last_send {
                let elapsed = last.elapsed();
                if elapsed < min_interval {
                    thread::sleep(min_interval - elapsed);
                }
            }
            if !running.load(Ordering::SeqCst) {
                counters.discarded.fetch_add(1, Ordering::Relaxed);
                break;
            }

            match transport.send(&frame) {
                Ok(()) => {
                    log::debug!("[STOMP OUT] {}", format_hex(&frame));
                    log::trace!("[STOMP OUT] queue latency {:?}", enqueued_at.elapsed());
                    counters.sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    log::warn!("[STOMP OUT] Send failed, skipping frame: {}", e);
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            last_send = Some(Instant::now());
        }

        log::info!("STOMP: Dispatcher thread exiting");
    }
}

impl Drop for RealtimeDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
