//! # Song renderer
//!
//! External collaborator contract: walks sections, calls synths, mixes
//! voices, concatenates — producing the final [`AudioBuffer`]. Also
//! implements the editor's timeline contract (`TimelineEntry`/
//! `offsetAll`). Tied notes are folded into one sustained, single-retrigger
//! synth call rather than re-attacking at each tie boundary; the fold is
//! scoped to a single bar, matching the swing nudge's bar/beat scoping
//! below.

use std::collections::HashMap;

use crate::ast::DurationSuffix;
use crate::synth::synth_for_instrument;
use crate::value::{AudioBuffer, SectionData, SequenceData, SongData};

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub start_sec: f64,
    pub end_sec: f64,
    pub source_start: usize,
    pub source_length: usize,
    pub scope_name: String,
}

pub fn offset_all(entries: &mut [TimelineEntry], delta: f64) {
    for entry in entries {
        entry.start_sec += delta;
        entry.end_sec += delta;
    }
}

/// Renders a single sequence's bars, back to back, on one instrument, at
/// the given tempo. `swing` (0.0..=1.0, 0.5 = straight) nudges each
/// on-the-beat pair of plain eighth notes: the first gets `2*swing` of
/// the pair's duration and the second the remainder, per the timing-nudge
/// resolution in the design notes — the note-stream compiler itself
/// stays swing-free.
pub fn render_sequence(seq: &SequenceData, instrument: &str, sample_rate: u32, bpm: f64, swing: f64) -> (AudioBuffer, Vec<TimelineEntry>) {
    let synth = synth_for_instrument(instrument);
    let mut samples = Vec::new();
    let mut timeline = Vec::new();
    let mut cursor_sec = 0.0;

    for bar in &seq.bars {
        let denominator = bar.time_signature.denominator;
        let mut beat_cursor = 0.0_f64;
        let elements = &bar.elements;
        let mut i = 0;
        while i < elements.len() {
            let note = &elements[i];
            let plain_beats = note.duration.map(|d| d.as_beats(denominator)).unwrap_or(1.0);
            let base_beats = if note.is_dotted { plain_beats * 1.5 } else { plain_beats };

            if note.is_tied {
                // Fold this note and every immediately-following tied note
                // (within the bar) into one sustained, single-retrigger
                // note rather than re-attacking at each tie boundary.
                let mut total_beats = base_beats;
                let mut j = i + 1;
                let mut chain_continues = true;
                while chain_continues && j < elements.len() {
                    let next = &elements[j];
                    let next_plain = next.duration.map(|d| d.as_beats(denominator)).unwrap_or(1.0);
                    let next_beats = if next.is_dotted { next_plain * 1.5 } else { next_plain };
                    total_beats += next_beats;
                    chain_continues = next.is_tied;
                    j += 1;
                }
                cursor_sec = push_note(&synth, note, sample_rate, total_beats, bpm, cursor_sec, &mut samples, &mut timeline);
                beat_cursor += total_beats;
                i = j;
                continue;
            }

            let is_plain_eighth = note.duration == Some(DurationSuffix::Eighth) && !note.is_dotted;
            let on_beat = beat_cursor.fract().abs() < 1e-6;
            let next_is_plain_eighth = elements
                .get(i + 1)
                .map_or(false, |n| n.duration == Some(DurationSuffix::Eighth) && !n.is_dotted);

            if is_plain_eighth && on_beat && next_is_plain_eighth {
                let pair_beats = base_beats * 2.0;
                let long = pair_beats * swing;
                let short = pair_beats - long;
                cursor_sec = push_note(&synth, note, sample_rate, long, bpm, cursor_sec, &mut samples, &mut timeline);
                cursor_sec = push_note(&synth, &elements[i + 1], sample_rate, short, bpm, cursor_sec, &mut samples, &mut timeline);
                beat_cursor += pair_beats;
                i += 2;
            } else {
                cursor_sec = push_note(&synth, note, sample_rate, base_beats, bpm, cursor_sec, &mut samples, &mut timeline);
                beat_cursor += base_beats;
                i += 1;
            }
        }
    }

    let frames = samples.len();
    (AudioBuffer { samples, frames, channels: 1, sample_rate }, timeline)
}

#[allow(clippy::too_many_arguments)]
fn push_note(
    synth: &impl crate::synth::Synthesizer,
    note: &crate::value::MusicalNoteData,
    sample_rate: u32,
    duration_beats: f64,
    bpm: f64,
    cursor_sec: f64,
    samples: &mut Vec<f32>,
    timeline: &mut Vec<TimelineEntry>,
) -> f64 {
    let buf = synth.render(note, sample_rate, duration_beats, bpm);
    let note_seconds = buf.frames as f64 / sample_rate as f64;
    timeline.push(TimelineEntry {
        start_sec: cursor_sec,
        end_sec: cursor_sec + note_seconds,
        source_start: samples.len(),
        source_length: buf.samples.len(),
        scope_name: if note.is_rest { "rest".to_string() } else { format!("{}{}", note.name, note.octave) },
    });
    samples.extend(buf.samples);
    cursor_sec + note_seconds
}

/// Mixes multiple sequences playing concurrently (e.g. a section's
/// ordered mapping name→sequence) by summing samples sample-for-sample,
/// padding the shorter buffers with silence.
pub fn mix(buffers: &[AudioBuffer]) -> AudioBuffer {
    let Some(sample_rate) = buffers.first().map(|b| b.sample_rate) else {
        return AudioBuffer::silence(0, 1, 44_100);
    };
    let max_len = buffers.iter().map(|b| b.samples.len()).max().unwrap_or(0);
    let mut mixed = vec![0.0f32; max_len];
    for buf in buffers {
        for (i, s) in buf.samples.iter().enumerate() {
            mixed[i] += s;
        }
    }
    for s in &mut mixed {
        *s = s.clamp(-1.0, 1.0);
    }
    AudioBuffer { frames: mixed.len(), samples: mixed, channels: 1, sample_rate }
}

fn render_section(section: &SectionData, sample_rate: u32) -> AudioBuffer {
    let resolved = section.context.resolved();
    let buffers: Vec<AudioBuffer> = section
        .sequences
        .iter()
        .map(|(_, seq)| render_sequence(seq, "sine", sample_rate, resolved.tempo, resolved.swing).0)
        .collect();
    mix(&buffers)
}

/// Renders a [`SongData`] — an ordered arrangement of section
/// references with repeat counts — by concatenating each referenced
/// section's rendering `repeatCount` times.
pub fn render_song(song: &SongData, sections: &HashMap<String, SectionData>, sample_rate: u32) -> AudioBuffer {
    let mut samples = Vec::new();
    for (name, repeat_count) in &song.sections {
        let Some(section) = sections.get(name) else { continue };
        let rendered = render_section(section, sample_rate);
        for _ in 0..*repeat_count {
            samples.extend(rendered.samples.clone());
        }
    }
    let frames = samples.len();
    AudioBuffer { samples, frames, channels: 1, sample_rate }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Articulation, DurationSuffix};
    use crate::value::{BarData, MusicalNoteData, TimeSignatureData};

    fn two_beat_sequence() -> SequenceData {
        let note = MusicalNoteData {
            name: 'C',
            octave: 4,
            alteration: 0,
            duration: Some(DurationSuffix::Half),
            is_rest: false,
            cent_offset: 0.0,
            is_tied: false,
            is_dotted: false,
            velocity: 0.8,
            articulation: Articulation::None,
        };
        SequenceData {
            bars: vec![BarData { elements: vec![note], time_signature: TimeSignatureData { numerator: 4, denominator: 4 } }],
            total_beats: 2.0,
        }
    }

    #[test]
    fn render_sequence_produces_nonzero_frames() {
        let (buf, timeline) = render_sequence(&two_beat_sequence(), "sine", 48_000, 120.0, 0.5);
        assert!(buf.frames > 0);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn tied_quarter_pair_renders_as_one_retriggered_note_spanning_both() {
        let mut tied = MusicalNoteData {
            name: 'C',
            octave: 4,
            alteration: 0,
            duration: Some(DurationSuffix::Quarter),
            is_rest: false,
            cent_offset: 0.0,
            is_tied: true,
            is_dotted: false,
            velocity: 0.8,
            articulation: Articulation::None,
        };
        let mut tail = tied.clone();
        tail.is_tied = false;
        let seq = SequenceData {
            bars: vec![BarData {
                elements: vec![{ tied.is_tied = true; tied }, tail],
                time_signature: TimeSignatureData { numerator: 4, denominator: 4 },
            }],
            total_beats: 2.0,
        };
        let (tied_buf, tied_timeline) = render_sequence(&seq, "sine", 48_000, 120.0, 0.5);
        let (plain_buf, _) = render_sequence(&two_beat_sequence(), "sine", 48_000, 120.0, 0.5);
        // One tie-merged call covering both quarters, not two separate
        // retriggers, and the same total length as an equivalent half note.
        assert_eq!(tied_timeline.len(), 1);
        assert_eq!(tied_buf.frames, plain_buf.frames);
    }

    #[test]
    fn swung_eighth_pair_splits_unevenly() {
        let mut note = MusicalNoteData {
            name: 'C',
            octave: 4,
            alteration: 0,
            duration: Some(DurationSuffix::Eighth),
            is_rest: false,
            cent_offset: 0.0,
            is_tied: false,
            is_dotted: false,
            velocity: 0.8,
            articulation: Articulation::None,
        };
        let seq = SequenceData {
            bars: vec![BarData {
                elements: vec![note.clone(), { note.name = 'D'; note.clone() }],
                time_signature: TimeSignatureData { numerator: 4, denominator: 4 },
            }],
            total_beats: 1.0,
        };
        let (_, straight) = render_sequence(&seq, "sine", 48_000, 120.0, 0.5);
        let (_, swung) = render_sequence(&seq, "sine", 48_000, 120.0, 0.67);
        assert!((straight[0].end_sec - straight[0].start_sec - (straight[1].end_sec - straight[1].start_sec)).abs() < 1e-9);
        assert!(swung[0].end_sec - swung[0].start_sec > swung[1].end_sec - swung[1].start_sec);
    }

    #[test]
    fn offset_all_shifts_every_entry() {
        let mut entries = vec![TimelineEntry { start_sec: 1.0, end_sec: 2.0, source_start: 0, source_length: 10, scope_name: "a".into() }];
        offset_all(&mut entries, 0.5);
        assert_eq!(entries[0].start_sec, 1.5);
        assert_eq!(entries[0].end_sec, 2.5);
    }

    #[test]
    fn mix_sums_and_clamps() {
        let a = AudioBuffer { samples: vec![0.9, 0.9], frames: 2, channels: 1, sample_rate: 48_000 };
        let b = AudioBuffer { samples: vec![0.9, 0.9], frames: 2, channels: 1, sample_rate: 48_000 };
        let mixed = mix(&[a, b]);
        assert!(mixed.samples.iter().all(|&s| s <= 1.0));
    }

    #[test]
    fn song_duration_matches_section_and_repeat_arithmetic() {
        let mut sections = HashMap::new();
        sections.insert(
            "a".to_string(),
            SectionData {
                name: "a".into(),
                sequences: vec![("s".into(), two_beat_sequence())],
                context: crate::context::MusicalContext::default(),
                source_location: crate::error::Location::default(),
            },
        );
        let song = SongData { sections: vec![("a".to_string(), 3)] };
        let buf = render_song(&song, &sections, 48_000);
        let (single, _) = render_sequence(&two_beat_sequence(), "sine", 48_000, 120.0, 0.5);
        assert_eq!(buf.frames, single.frames * 3);
    }
}
