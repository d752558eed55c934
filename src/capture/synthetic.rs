//! A scripted `SignalSource` for tests and headless runs.
//!
//! Plays back a fixed sequence of signals, then reports exhaustion as
//! `Ok(None)` forever. Build failure modes with `failing_open` and
//! `failing_read`.

use crate::capture::adapter::SignalSource;
use crate::capture::events::SensorSignal;
use crate::error::{CoreError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct SyntheticSource {
    script: VecDeque<SensorSignal>,
    repeat: Option<SensorSignal>,
    open_error: Option<String>,
    read_error: Option<String>,
    opened: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl SyntheticSource {
    /// Plays the given signals once, in order.
    pub fn new(script: Vec<SensorSignal>) -> Self {
        Self {
            script: script.into(),
            repeat: None,
            open_error: None,
            read_error: None,
            opened: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Repeats one signal forever.
    pub fn endless(signal: SensorSignal) -> Self {
        let mut source = Self::new(Vec::new());
        source.repeat = Some(signal);
        source
    }

    /// `open()` fails with the given reason.
    pub fn failing_open(reason: &str) -> Self {
        let mut source = Self::new(Vec::new());
        source.open_error = Some(reason.to_string());
        source
    }

    /// Plays the script, then fails the next read with the given reason.
    pub fn failing_read(script: Vec<SensorSignal>, reason: &str) -> Self {
        let mut source = Self::new(script);
        source.read_error = Some(reason.to_string());
        source
    }

    /// Shared flag set once `open()` succeeds.
    pub fn opened_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.opened)
    }

    /// Shared flag set once `close()` runs.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl SignalSource for SyntheticSource {
    fn open(&mut self) -> Result<()> {
        if let Some(reason) = &self.open_error {
            return Err(CoreError::SensorUnavailable {
                modality: "synthetic",
                reason: reason.clone(),
            });
        }
        self.opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read(&mut self) -> Result<Option<SensorSignal>> {
        if let Some(signal) = self.script.pop_front() {
            return Ok(Some(signal));
        }
        if let Some(signal) = &self.repeat {
            return Ok(Some(signal.clone()));
        }
        if let Some(reason) = self.read_error.take() {
            return Err(CoreError::SensorUnavailable {
                modality: "synthetic",
                reason,
            });
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
