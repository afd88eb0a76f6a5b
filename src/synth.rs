//! # Synthesizers
//!
//! External collaborator contract: `render(note, sampleRate,
//! durationBeats, bpm) → Buffer`. A silent rest produces a zero-buffer
//! of the required length.

use crate::value::{AudioBuffer, MusicalNoteData, OscillatorState};

pub trait Synthesizer {
    fn render(&self, note: &MusicalNoteData, sample_rate: u32, duration_beats: f64, bpm: f64) -> AudioBuffer;
}

fn duration_frames(duration_beats: f64, bpm: f64, sample_rate: u32) -> usize {
    let seconds = duration_beats * 60.0 / bpm;
    (seconds * sample_rate as f64).round().max(0.0) as usize
}

fn frequency_for(note: &MusicalNoteData) -> Option<f64> {
    let midi = note.midi_note()?;
    let cents = note.cent_offset;
    Some(440.0 * 2f64.powf((midi as f64 - 69.0 + cents / 100.0) / 12.0))
}

/// Single-oscillator synth with a fixed ADSR envelope, named by
/// waveform. Registered under the instrument names `"sine"`, `"saw"`,
/// `"square"`, `"triangle"`.
pub struct OscillatorSynth {
    pub waveform: Waveform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Saw,
    Square,
    Triangle,
}

impl Waveform {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sine" => Some(Waveform::Sine),
            "saw" => Some(Waveform::Saw),
            "square" => Some(Waveform::Square),
            "triangle" => Some(Waveform::Triangle),
            _ => None,
        }
    }

    fn sample(&self, phase: f64) -> f64 {
        let p = phase - phase.floor();
        match self {
            Waveform::Sine => (p * std::f64::consts::TAU).sin(),
            Waveform::Saw => 2.0 * p - 1.0,
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 4.0 * (p - 0.5).abs() - 1.0,
        }
    }
}

impl Synthesizer for OscillatorSynth {
    fn render(&self, note: &MusicalNoteData, sample_rate: u32, duration_beats: f64, bpm: f64) -> AudioBuffer {
        let frames = duration_frames(duration_beats, bpm, sample_rate);
        if note.is_rest {
            return AudioBuffer::silence(frames, 1, sample_rate);
        }
        let Some(freq) = frequency_for(note) else {
            return AudioBuffer::silence(frames, 1, sample_rate);
        };

        let mut osc = OscillatorState { phase: 0.0, frequency: freq };
        let attack = (0.01 * sample_rate as f64) as usize;
        let release = (0.03 * sample_rate as f64) as usize;
        let mut samples = Vec::with_capacity(frames);
        for i in 0..frames {
            let envelope = envelope_at(i, frames, attack, release);
            let sample = self.waveform.sample(osc.phase) * note.velocity * envelope;
            osc.phase += osc.frequency / sample_rate as f64;
            samples.push(sample as f32);
        }
        AudioBuffer { samples, frames, channels: 1, sample_rate }
    }
}

fn envelope_at(i: usize, frames: usize, attack: usize, release: usize) -> f64 {
    if i < attack && attack > 0 {
        i as f64 / attack as f64
    } else if frames > release && i >= frames - release && release > 0 {
        (frames - i) as f64 / release as f64
    } else {
        1.0
    }
}

/// Resolves an instrument name to a synthesizer; unknown names fall back
/// to a sine.
pub fn synth_for_instrument(name: &str) -> OscillatorSynth {
    OscillatorSynth {
        waveform: Waveform::from_name(name).unwrap_or(Waveform::Sine),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Articulation, DurationSuffix};

    fn note(is_rest: bool) -> MusicalNoteData {
        MusicalNoteData {
            name: 'A',
            octave: 4,
            alteration: 0,
            duration: Some(DurationSuffix::Quarter),
            is_rest,
            cent_offset: 0.0,
            is_tied: false,
            is_dotted: false,
            velocity: 0.8,
            articulation: Articulation::None,
        }
    }

    #[test]
    fn rest_produces_silence() {
        let synth = synth_for_instrument("sine");
        let buf = synth.render(&note(true), 48_000, 1.0, 120.0);
        assert!(buf.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sounding_note_has_expected_frame_count() {
        let synth = synth_for_instrument("sine");
        let buf = synth.render(&note(false), 48_000, 1.0, 120.0);
        assert_eq!(buf.frames, 24_000); // 1 beat at 120bpm = 0.5s
    }

    #[test]
    fn a4_frequency_is_440hz() {
        assert_eq!(frequency_for(&note(false)), Some(440.0));
    }
}
