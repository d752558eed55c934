//! Background sensor adapters.
//!
//! Each modality runs one adapter: a background thread pumping reads from
//! its `SignalSource` into a bounded channel. A failing adapter poisons
//! only its own modality; the other streams keep flowing.

use crate::capture::events::SensorSignal;
use crate::error::{CoreError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Default per-adapter channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_000;

/// Pause between polls when the source has nothing to deliver.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// The hardware collaborator behind one modality.
///
/// `read` returns `Ok(None)` when no signal is currently available; the
/// adapter polls again after a short pause. A read error stops that
/// adapter's thread.
pub trait SignalSource: Send {
    fn open(&mut self) -> Result<()>;
    fn read(&mut self) -> Result<Option<SensorSignal>>;
    fn close(&mut self);
}

type SourceSlot = Arc<Mutex<Option<Box<dyn SignalSource>>>>;

/// Runs one `SignalSource` on a background thread.
///
/// Signals land on a bounded channel; when a slow consumer lets it fill,
/// the oldest signal is evicted so the channel always holds the most
/// recent window of data. The pump thread hands the source back when it
/// exits, so a stopped adapter can be started again.
pub struct SensorAdapter {
    modality: &'static str,
    source: SourceSlot,
    sender: Sender<SensorSignal>,
    receiver: Receiver<SensorSignal>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl SensorAdapter {
    pub fn new(modality: &'static str, source: Box<dyn SignalSource>) -> Self {
        Self::with_capacity(modality, source, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(
        modality: &'static str,
        source: Box<dyn SignalSource>,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            modality,
            source: Arc::new(Mutex::new(Some(source))),
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    pub fn modality(&self) -> &'static str {
        self.modality
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signals evicted from the channel under backpressure.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Open the source and start the pump thread.
    ///
    /// An open failure surfaces as `SensorUnavailable` for this modality
    /// and leaves the adapter stopped. Restarting a stopped adapter is
    /// supported; the previous pump thread returned the source on exit.
    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CoreError::AlreadyRunning(self.modality));
        }
        // Reap a self-stopped pump thread so it finishes returning the
        // source before we take the slot.
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(modality = self.modality, "adapter thread panicked");
            }
        }
        let mut source = take_slot(&self.source).ok_or(CoreError::SensorUnavailable {
            modality: self.modality,
            reason: "source was not returned by the previous run".to_string(),
        })?;

        if let Err(e) = source.open() {
            put_slot(&self.source, source);
            return Err(CoreError::SensorUnavailable {
                modality: self.modality,
                reason: e.to_string(),
            });
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let slot = Arc::clone(&self.source);
        let sender = self.sender.clone();
        let receiver = self.receiver.clone();
        let dropped = Arc::clone(&self.dropped);
        let modality = self.modality;

        self.handle = Some(std::thread::spawn(move || {
            tracing::info!(modality, "sensor adapter started");
            while running.load(Ordering::SeqCst) {
                match source.read() {
                    Ok(Some(signal)) => {
                        push_drop_oldest(&sender, &receiver, &dropped, signal);
                    }
                    Ok(None) => std::thread::sleep(IDLE_POLL),
                    Err(e) => {
                        tracing::warn!(modality, error = %e, "sensor read failed; adapter stopping");
                        running.store(false, Ordering::SeqCst);
                    }
                }
            }
            source.close();
            put_slot(&slot, source);
            tracing::info!(modality, "sensor adapter stopped");
        }));
        Ok(())
    }

    /// Stop the pump thread and close the source. Safe to call when never
    /// started, and safe to call twice.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(modality = self.modality, "adapter thread panicked");
            }
        }
    }

    pub fn receiver(&self) -> &Receiver<SensorSignal> {
        &self.receiver
    }

    /// Pull everything currently buffered on the channel.
    pub fn drain(&self) -> Vec<SensorSignal> {
        let mut out = Vec::new();
        while let Ok(signal) = self.receiver.try_recv() {
            out.push(signal);
        }
        out
    }
}

impl Drop for SensorAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn take_slot(slot: &SourceSlot) -> Option<Box<dyn SignalSource>> {
    slot.lock().unwrap_or_else(|e| e.into_inner()).take()
}

fn put_slot(slot: &SourceSlot, source: Box<dyn SignalSource>) {
    *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(source);
}

/// Send with drop-oldest backpressure: on a full channel, evict the head
/// and retry once.
fn push_drop_oldest(
    sender: &Sender<SensorSignal>,
    receiver: &Receiver<SensorSignal>,
    dropped: &AtomicU64,
    signal: SensorSignal,
) {
    match sender.try_send(signal) {
        Ok(()) => {}
        Err(TrySendError::Full(signal)) => {
            if receiver.try_recv().is_ok() {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
            if sender.try_send(signal).is_err() {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}
