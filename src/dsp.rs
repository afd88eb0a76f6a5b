//! # DSP primitives
//!
//! External collaborator contract: pure buffer→buffer functions
//! (reverb/filter/compressor/delay). Minimal reference implementations
//! so the crate self-tests without audio hardware; a real synth/DSP
//! host would replace these with production-quality versions behind
//! the same signatures.

use crate::error::{CadenceError, Location};
use crate::value::AudioBuffer;

/// A pure, stateless audio transform. Every built-in effect implements
/// this so `render.rs` can chain them uniformly.
pub trait DspEffect {
    fn process(&self, input: &AudioBuffer) -> Result<AudioBuffer, CadenceError>;
}

/// Single-pole lowpass/highpass filter. `cutoff` must be below Nyquist
/// (`sample_rate / 2`).
pub struct Filter {
    pub cutoff: f64,
    pub lowpass: bool,
}

impl Filter {
    pub fn new(cutoff: f64, lowpass: bool, sample_rate: u32, location: Location) -> Result<Self, CadenceError> {
        if cutoff >= sample_rate as f64 / 2.0 {
            return Err(CadenceError::Range {
                location,
                message: "filter cutoff must be below the Nyquist frequency".into(),
            });
        }
        Ok(Self { cutoff, lowpass })
    }
}

impl DspEffect for Filter {
    fn process(&self, input: &AudioBuffer) -> Result<AudioBuffer, CadenceError> {
        let rc = 1.0 / (2.0 * std::f64::consts::PI * self.cutoff);
        let dt = 1.0 / input.sample_rate as f64;
        let alpha = dt / (rc + dt);
        let channels = input.channels as usize;
        let mut out = input.samples.clone();
        for ch in 0..channels {
            let mut prev_x = 0.0f64;
            let mut prev_y = 0.0f64;
            for frame in 0..input.frames {
                let idx = frame * channels + ch;
                let x = input.samples[idx] as f64;
                let y = if self.lowpass {
                    prev_y + alpha * (x - prev_y)
                } else {
                    alpha * (prev_y + x - prev_x)
                };
                prev_x = x;
                prev_y = y;
                out[idx] = sanitize(y) as f32;
            }
        }
        Ok(AudioBuffer { samples: out, ..*input_shape(input) })
    }
}

/// Feedback delay line. `feedback` must be `<= 1.0` to avoid runaway
/// gain.
pub struct Delay {
    pub delay_ms: f64,
    pub feedback: f64,
    pub mix: f64,
}

impl Delay {
    pub fn new(delay_ms: f64, feedback: f64, mix: f64, location: Location) -> Result<Self, CadenceError> {
        if feedback > 1.0 {
            return Err(CadenceError::Range {
                location,
                message: "delay feedback must not exceed 1.0".into(),
            });
        }
        Ok(Self { delay_ms, feedback, mix })
    }
}

impl DspEffect for Delay {
    fn process(&self, input: &AudioBuffer) -> Result<AudioBuffer, CadenceError> {
        let channels = input.channels as usize;
        let delay_frames = ((self.delay_ms / 1000.0) * input.sample_rate as f64) as usize;
        let mut out = input.samples.clone();
        for ch in 0..channels {
            for frame in 0..input.frames {
                if frame < delay_frames {
                    continue;
                }
                let src_idx = (frame - delay_frames) * channels + ch;
                let idx = frame * channels + ch;
                let delayed = out[src_idx] as f64 * self.feedback;
                out[idx] = sanitize(input.samples[idx] as f64 * (1.0 - self.mix) + delayed * self.mix) as f32;
            }
        }
        Ok(AudioBuffer { samples: out, ..*input_shape(input) })
    }
}

/// Simple feed-forward compressor. `ratio` must be `>= 1.0`.
pub struct Compressor {
    pub threshold: f64,
    pub ratio: f64,
}

impl Compressor {
    pub fn new(threshold: f64, ratio: f64, location: Location) -> Result<Self, CadenceError> {
        if ratio < 1.0 {
            return Err(CadenceError::Range {
                location,
                message: "compressor ratio must be >= 1.0".into(),
            });
        }
        Ok(Self { threshold, ratio })
    }
}

impl DspEffect for Compressor {
    fn process(&self, input: &AudioBuffer) -> Result<AudioBuffer, CadenceError> {
        let out: Vec<f32> = input
            .samples
            .iter()
            .map(|&s| {
                let mag = s.abs() as f64;
                if mag <= self.threshold {
                    s
                } else {
                    let over = mag - self.threshold;
                    let compressed = self.threshold + over / self.ratio;
                    sanitize(compressed * s.signum() as f64) as f32
                }
            })
            .collect();
        Ok(AudioBuffer { samples: out, ..*input_shape(input) })
    }
}

/// Algorithmic reverb stand-in: a short comb-filter tail. Production
/// hosts would substitute a convolution or Schroeder reverb behind the
/// same `DspEffect` contract.
pub struct Reverb {
    pub mix: f64,
    pub decay: f64,
}

impl DspEffect for Reverb {
    fn process(&self, input: &AudioBuffer) -> Result<AudioBuffer, CadenceError> {
        let delay = Delay { delay_ms: 29.0, feedback: self.decay.min(1.0), mix: self.mix };
        delay.process(input)
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_nan() || v.is_infinite() {
        0.0
    } else {
        v.clamp(-1.0, 1.0)
    }
}

/// Helper to copy the shape fields of a buffer while swapping samples.
fn input_shape(buf: &AudioBuffer) -> Box<AudioBuffer> {
    Box::new(AudioBuffer {
        samples: Vec::new(),
        frames: buf.frames,
        channels: buf.channels,
        sample_rate: buf.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(frames: usize) -> AudioBuffer {
        let mut samples = vec![0.0f32; frames];
        samples[0] = 1.0;
        AudioBuffer { samples, frames, channels: 1, sample_rate: 48_000 }
    }

    #[test]
    fn filter_rejects_cutoff_at_or_above_nyquist() {
        let err = Filter::new(24_000.0, true, 48_000, Location::default());
        assert!(err.is_err());
    }

    #[test]
    fn delay_rejects_feedback_over_one() {
        let err = Delay::new(50.0, 1.5, 0.5, Location::default());
        assert!(err.is_err());
    }

    #[test]
    fn compressor_rejects_ratio_below_one() {
        let err = Compressor::new(0.5, 0.5, Location::default());
        assert!(err.is_err());
    }

    #[test]
    fn filter_output_is_finite() {
        let filt = Filter::new(1_000.0, true, 48_000, Location::default()).unwrap();
        let out = filt.process(&impulse(256)).unwrap();
        assert!(out.samples.iter().all(|s| s.is_finite()));
    }

    fn dc(frames: usize) -> AudioBuffer {
        AudioBuffer { samples: vec![1.0f32; frames], frames, channels: 1, sample_rate: 48_000 }
    }

    #[test]
    fn lowpass_passes_dc_highpass_rejects_it() {
        let lowpass = Filter::new(1_000.0, true, 48_000, Location::default()).unwrap();
        let highpass = Filter::new(1_000.0, false, 48_000, Location::default()).unwrap();
        let steady = dc(2_000);
        let low_out = lowpass.process(&steady).unwrap();
        let high_out = highpass.process(&steady).unwrap();
        // A constant input is pure DC: a lowpass settles back to it, a
        // highpass settles to zero.
        assert!(low_out.samples.last().unwrap() > &0.9);
        assert!(high_out.samples.last().unwrap().abs() < 0.1);
    }
}
