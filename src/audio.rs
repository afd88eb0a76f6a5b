//! # Audio output backend
//!
//! External collaborator contract: `initialize(sampleRate,
//! channels)→bool`, `play(samples, sampleRate, channels, cancel)→Void`
//! (blocking), `stop()→Void`, `setDevice(name)→bool`,
//! `getDevices()→[String]`. Samples are clamped to `[-1,1]`; NaN/Inf
//! are treated as zero before write.
//!
//! The reference backend below writes nowhere — it exists so the crate
//! is fully runnable and testable without real audio hardware. A host
//! embedding this engine on real hardware (e.g. via `cpal`) would swap
//! in its own [`AudioBackend`] behind the same trait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation flag shared between a playback caller and
/// the worker thread actually writing samples.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub trait AudioBackend: Send {
    fn initialize(&mut self, sample_rate: u32, channels: u16) -> bool;
    /// Blocking write of an interleaved float stream. Returns once all
    /// samples are written or `cancel` is raised.
    fn play(&mut self, samples: &[f32], sample_rate: u32, channels: u16, cancel: &CancelHandle);
    fn stop(&mut self);
    fn set_device(&mut self, name: &str) -> bool;
    fn get_devices(&self) -> Vec<String>;
}

/// Clamps samples to `[-1, 1]`, treating NaN/Inf as zero.
pub fn sanitize_samples(samples: &[f32]) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 })
        .collect()
}

/// A backend that validates and "plays" into a null sink — useful for
/// headless evaluation, CI, and the REPL's default device.
pub struct NullBackend {
    initialized: bool,
    device: String,
}

impl Default for NullBackend {
    fn default() -> Self {
        Self { initialized: false, device: "null".to_string() }
    }
}

impl AudioBackend for NullBackend {
    fn initialize(&mut self, _sample_rate: u32, _channels: u16) -> bool {
        self.initialized = true;
        true
    }

    fn play(&mut self, samples: &[f32], _sample_rate: u32, _channels: u16, cancel: &CancelHandle) {
        let clean = sanitize_samples(samples);
        for _ in clean.iter() {
            if cancel.is_cancelled() {
                break;
            }
        }
    }

    fn stop(&mut self) {}

    fn set_device(&mut self, name: &str) -> bool {
        self.device = name.to_string();
        true
    }

    fn get_devices(&self) -> Vec<String> {
        vec!["null".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_nan_and_inf_with_zero() {
        let out = sanitize_samples(&[f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 0.5, 2.0, -2.0]);
        assert_eq!(out, vec![0.0, 0.0, 0.0, 0.5, 1.0, -1.0]);
    }

    #[test]
    fn cancel_handle_stops_playback_loop() {
        let backend = NullBackend::default();
        let cancel = CancelHandle::new();
        cancel.cancel();
        assert!(cancel.is_cancelled());
        let mut backend = backend;
        backend.play(&[0.0; 1000], 48_000, 1, &cancel);
    }

    #[test]
    fn null_backend_reports_itself() {
        let backend = NullBackend::default();
        assert_eq!(backend.get_devices(), vec!["null".to_string()]);
    }
}
