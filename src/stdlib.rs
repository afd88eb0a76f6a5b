//! # Standard library
//!
//! Built-in registrations: sequence transforms (transpose/invert/
//! retrograde/augment/diminish/repeat/concat/crescendo/humanize/trill/
//! tremolo/arpeggio/euclidean/resolveNumeral), plus core arithmetic and
//! array/string/number built-ins.

use std::rc::Rc;

use crate::ast::DurationSuffix;
use crate::chord::{parse_chord_symbol, resolve_numeral};
use crate::error::{CadenceError, Diagnostics, Location};
use crate::evaluator::EvalCtx;
use crate::registry::{BuiltinFn, Registry};
use crate::types::Type;
use crate::value::{BarData, ChordData, Data, MusicalNoteData, SequenceData, Value};

fn f(func: impl Fn(&mut EvalCtx, &[Value], Location) -> Result<Value, CadenceError> + 'static) -> BuiltinFn {
    Rc::new(func)
}

/// Registers the small set of built-ins that every program needs
/// regardless of `use "@std"` (arithmetic, printing, `len`, `str`) —
/// always available rather than gated behind an import.
pub fn register_core(reg: &mut Registry) {
    reg.register(
        "print",
        vec![Type::String],
        false,
        f(|ctx, args, loc| {
            println!("{}", args[0].as_str(loc)?);
            ctx.diagnostics.info(loc, "print");
            Ok(Value::void())
        }),
    );

    reg.register(
        "len",
        vec![Type::Array(Box::new(Type::Void))],
        false,
        f(|_ctx, args, loc| match &args[0].data {
            Data::Array(items) => Ok(Value::int(items.len() as i64)),
            _ => Err(CadenceError::TypeMismatch {
                location: loc,
                message: "len expects an Array".into(),
            }),
        }),
    );

    for (name, op) in [
        ("add", 0u8),
        ("sub", 1u8),
        ("mul", 2u8),
        ("div", 3u8),
    ] {
        reg.register(
            name,
            vec![Type::Int, Type::Int],
            false,
            f(move |_ctx, args, loc| {
                let a = args[0].as_int(loc)?;
                let b = args[1].as_int(loc)?;
                let result = match op {
                    0 => a + b,
                    1 => a - b,
                    2 => a * b,
                    _ => {
                        if b == 0 {
                            return Err(CadenceError::Runtime {
                                location: loc,
                                message: "division by zero".into(),
                            });
                        }
                        a / b
                    }
                };
                Ok(Value::int(result))
            }),
        );
    }

    for ty in [Type::Int, Type::Long, Type::Float, Type::Double, Type::Bool, Type::String] {
        reg.register(
            "str",
            vec![ty],
            false,
            f(move |_ctx, args, _loc| Ok(Value::string(args[0].to_string()))),
        );
    }
}

/// Registers the transform/transport library loaded by `use "@std"`.
pub fn register_stdlib(reg: &mut Registry) {
    reg.register(
        "transpose",
        vec![Type::Sequence, Type::Semitone],
        false,
        f(|ctx, args, loc| {
            let seq = args[0].as_sequence(loc)?.clone();
            let semitones = args[1].as_semitone(loc)?;
            Ok(Value::sequence(transpose_sequence(&seq, semitones, &mut ctx.diagnostics, loc)))
        }),
    );

    reg.register("invert", vec![Type::Sequence], false, f(|_ctx, args, loc| {
        let seq = args[0].as_sequence(loc)?.clone();
        Ok(Value::sequence(invert_sequence(&seq)))
    }));

    reg.register("retrograde", vec![Type::Sequence], false, f(|_ctx, args, loc| {
        let seq = args[0].as_sequence(loc)?.clone();
        Ok(Value::sequence(retrograde_sequence(&seq)))
    }));

    reg.register("augment", vec![Type::Sequence], false, f(|_ctx, args, loc| {
        let seq = args[0].as_sequence(loc)?.clone();
        Ok(Value::sequence(scale_duration_sequence(&seq, true)))
    }));

    reg.register("diminish", vec![Type::Sequence], false, f(|_ctx, args, loc| {
        let seq = args[0].as_sequence(loc)?.clone();
        Ok(Value::sequence(scale_duration_sequence(&seq, false)))
    }));

    reg.register(
        "repeat",
        vec![Type::Sequence, Type::Int],
        false,
        f(|_ctx, args, loc| {
            let seq = args[0].as_sequence(loc)?.clone();
            let n = args[1].as_int(loc)?.max(0) as usize;
            Ok(Value::sequence(repeat_sequence(&seq, n, 0)))
        }),
    );
    reg.register(
        "repeat",
        vec![Type::Sequence, Type::Int, Type::Semitone],
        false,
        f(|_ctx, args, loc| {
            let seq = args[0].as_sequence(loc)?.clone();
            let n = args[1].as_int(loc)?.max(0) as usize;
            let step = args[2].as_semitone(loc)?;
            Ok(Value::sequence(repeat_sequence(&seq, n, step)))
        }),
    );

    reg.register(
        "concat",
        vec![Type::Sequence, Type::Sequence],
        false,
        f(|_ctx, args, loc| {
            let a = args[0].as_sequence(loc)?.clone();
            let b = args[1].as_sequence(loc)?.clone();
            let mut bars = a.bars;
            bars.extend(b.bars);
            Ok(Value::sequence(SequenceData { total_beats: a.total_beats + b.total_beats, bars }))
        }),
    );

    for name in ["crescendo", "decrescendo", "swell"] {
        reg.register(
            name,
            vec![Type::Sequence, Type::Double, Type::Double],
            false,
            f(|_ctx, args, loc| {
                let seq = args[0].as_sequence(loc)?.clone();
                let from = args[1].as_double(loc)?;
                let to = args[2].as_double(loc)?;
                Ok(Value::sequence(ramp_velocity(&seq, from, to)))
            }),
        );
    }

    reg.register(
        "humanize",
        vec![Type::Sequence, Type::Double],
        false,
        f(|ctx, args, loc| {
            let seq = args[0].as_sequence(loc)?.clone();
            let amount = args[1].as_double(loc)?;
            Ok(Value::sequence(humanize_sequence(&seq, amount, &mut ctx.rng)))
        }),
    );

    reg.register(
        "trill",
        vec![Type::Sequence, Type::Semitone],
        false,
        f(|ctx, args, loc| {
            let seq = args[0].as_sequence(loc)?.clone();
            let semitones = args[1].as_semitone(loc)?;
            Ok(Value::sequence(trill_sequence(&seq, semitones, &mut ctx.diagnostics, loc)))
        }),
    );

    reg.register(
        "tremolo",
        vec![Type::Sequence, Type::Int],
        false,
        f(|_ctx, args, loc| {
            let seq = args[0].as_sequence(loc)?.clone();
            let subdivisions = args[1].as_int(loc)?.max(1) as usize;
            Ok(Value::sequence(tremolo_sequence(&seq, subdivisions)))
        }),
    );

    reg.register(
        "euclidean",
        vec![Type::Int, Type::Int, Type::Note],
        false,
        f(|_ctx, args, loc| {
            let pulses = args[0].as_int(loc)?.max(0) as usize;
            let steps = args[1].as_int(loc)?.max(1) as usize;
            let note = args[2].as_str(loc)?.to_string();
            Ok(Value::sequence(euclidean_rhythm(pulses, steps, &note)))
        }),
    );

    reg.register(
        "arpeggio",
        vec![Type::Chord, Type::String],
        false,
        f(|_ctx, args, loc| {
            let chord = args[0].as_chord(loc)?.clone();
            let direction = args[1].as_str(loc)?;
            Ok(Value::sequence(arpeggiate(&chord, direction)))
        }),
    );

    reg.register(
        "resolveNumeral",
        vec![Type::String, Type::String],
        false,
        f(|_ctx, args, loc| {
            let numeral = args[0].as_str(loc)?;
            let key = args[1].as_str(loc)?;
            match resolve_numeral(numeral, key) {
                Some(chord) => Ok(Value::chord(chord)),
                None => Err(CadenceError::Runtime {
                    location: loc,
                    message: format!("cannot resolve numeral '{numeral}' in key '{key}'"),
                }),
            }
        }),
    );

    reg.register(
        "parseChord",
        vec![Type::String],
        false,
        f(|_ctx, args, loc| {
            let symbol = args[0].as_str(loc)?;
            match parse_chord_symbol(symbol) {
                Some(chord) => Ok(Value::chord(chord)),
                None => Err(CadenceError::Runtime {
                    location: loc,
                    message: format!("invalid chord symbol '{symbol}'"),
                }),
            }
        }),
    );

    // `setDuration(chord, "q")` annotates a chord with its own duration,
    // independent of whatever duration the surrounding melody carries —
    // consumed by `arpeggio` and by named-chord stream elements that
    // reference the chord through a variable.
    reg.register(
        "setDuration",
        vec![Type::Chord, Type::String],
        false,
        f(|_ctx, args, loc| {
            let chord = args[0].as_chord(loc)?.clone();
            let suffix = args[1].as_str(loc)?;
            let duration = suffix
                .chars()
                .next()
                .and_then(DurationSuffix::from_suffix_char)
                .ok_or_else(|| CadenceError::Range {
                    location: loc,
                    message: format!("'{suffix}' is not a duration suffix (w/h/q/e/s/t)"),
                })?;
            Ok(Value::chord(ChordData { duration: Some(duration), ..chord }))
        }),
    );

    // `Song x = (song ["a" "b" "a"] [1 3 1])` — an ordered arrangement of
    // section-name references with parallel repeat counts.
    reg.register(
        "song",
        vec![Type::Array(Box::new(Type::String)), Type::Array(Box::new(Type::Int))],
        false,
        f(|ctx, args, loc| {
            let names = match &args[0].data {
                Data::Array(items) => items.iter().map(|v| v.as_str(loc).map(str::to_string)).collect::<Result<Vec<_>, _>>()?,
                _ => return Err(CadenceError::TypeMismatch { location: loc, message: "song expects an Array<String>".into() }),
            };
            let counts = match &args[1].data {
                Data::Array(items) => items.iter().map(|v| v.as_int(loc)).collect::<Result<Vec<_>, _>>()?,
                _ => return Err(CadenceError::TypeMismatch { location: loc, message: "song expects an Array<Int>".into() }),
            };
            if names.len() != counts.len() {
                return Err(CadenceError::Runtime {
                    location: loc,
                    message: format!("song section names ({}) and repeat counts ({}) must match in length", names.len(), counts.len()),
                });
            }
            let sections = names.into_iter().zip(counts.into_iter().map(|c| c.max(0) as u32)).collect();
            Ok(Value::song(ctx.build_song(sections)?))
        }),
    );
}

/// Registers the audio-facing built-ins loaded by `use "@audio"`:
/// thin wrappers over the [`crate::render`]/[`crate::audio`] collaborator
/// contracts.
pub fn register_audio(reg: &mut Registry) {
    reg.register(
        "setSeed",
        vec![Type::Int],
        false,
        f(|ctx, args, loc| {
            let seed = args[0].as_int(loc)?;
            ctx.rng.set_seed(seed as u64);
            Ok(Value::void())
        }),
    );
    reg.register(
        "resetGen",
        vec![],
        false,
        f(|ctx, _args, _loc| {
            ctx.rng.reset_gen();
            Ok(Value::void())
        }),
    );

    reg.register(
        "play",
        vec![Type::Sequence],
        false,
        f(|ctx, args, loc| {
            let seq = args[0].as_sequence(loc)?.clone();
            let resolved = ctx.stack.effective_context();
            let (buffer, _timeline) = crate::render::render_sequence(&seq, "sine", ctx.sample_rate, resolved.tempo, resolved.swing);
            let cancel = crate::audio::CancelHandle::new();
            ctx.audio.play(&buffer.samples, buffer.sample_rate, buffer.channels, &cancel);
            Ok(Value::void())
        }),
    );

    reg.register(
        "play",
        vec![Type::Song],
        false,
        f(|ctx, args, loc| {
            let song = args[0].as_song(loc)?.clone();
            let buffer = crate::render::render_song(&song, &ctx.sections, ctx.sample_rate);
            let cancel = crate::audio::CancelHandle::new();
            ctx.audio.play(&buffer.samples, buffer.sample_rate, buffer.channels, &cancel);
            Ok(Value::void())
        }),
    );

    reg.register(
        "stop",
        vec![],
        false,
        f(|ctx, _args, _loc| {
            ctx.audio.stop();
            Ok(Value::void())
        }),
    );

    reg.register(
        "setDevice",
        vec![Type::String],
        false,
        f(|ctx, args, loc| {
            let name = args[0].as_str(loc)?.to_string();
            Ok(Value::bool(ctx.audio.set_device(&name)))
        }),
    );

    reg.register(
        "getDevices",
        vec![],
        false,
        f(|ctx, _args, _loc| {
            let devices = ctx.audio.get_devices();
            Ok(Value::array(devices.into_iter().map(Value::string).collect(), Type::String))
        }),
    );
}

const MIDI_MIN: i32 = 16;
const MIDI_MAX: i32 = 136;

fn natural_for_pc(pc: i32) -> (char, f64) {
    match pc.rem_euclid(12) {
        0 => ('C', 0.0),
        1 => ('C', 100.0),
        2 => ('D', 0.0),
        3 => ('D', 100.0),
        4 => ('E', 0.0),
        5 => ('F', 0.0),
        6 => ('F', 100.0),
        7 => ('G', 0.0),
        8 => ('G', 100.0),
        9 => ('A', 0.0),
        10 => ('A', 100.0),
        _ => ('B', 0.0),
    }
}

fn midi_to_note(midi: i32) -> (char, u32, f64) {
    let pc = midi.rem_euclid(12);
    let octave = (midi.div_euclid(12) - 1).max(0) as u32;
    let (letter, cents) = natural_for_pc(pc);
    (letter, octave, cents)
}

fn map_notes(seq: &SequenceData, mut f: impl FnMut(&MusicalNoteData) -> MusicalNoteData) -> SequenceData {
    SequenceData {
        bars: seq
            .bars
            .iter()
            .map(|bar| BarData {
                elements: bar.elements.iter().map(&mut f).collect(),
                time_signature: bar.time_signature.clone(),
            })
            .collect(),
        total_beats: seq.total_beats,
    }
}

fn transpose_sequence(seq: &SequenceData, semitones: i32, diagnostics: &mut Diagnostics, location: Location) -> SequenceData {
    map_notes(seq, |n| {
        if n.is_rest {
            return n.clone();
        }
        let Some(midi) = n.midi_note() else { return n.clone() };
        let mut target = midi + semitones;
        if target < MIDI_MIN || target > MIDI_MAX {
            diagnostics.warn(location, "transpose clamped to instrument range");
            target = target.clamp(MIDI_MIN, MIDI_MAX);
        }
        let (name, octave, cents) = midi_to_note(target);
        MusicalNoteData {
            name,
            octave,
            alteration: 0,
            cent_offset: cents,
            ..n.clone()
        }
    })
}

fn invert_sequence(seq: &SequenceData) -> SequenceData {
    let axis = seq
        .bars
        .iter()
        .flat_map(|b| &b.elements)
        .find(|n| !n.is_rest)
        .and_then(|n| n.midi_note());
    let Some(axis) = axis else { return seq.clone() };
    map_notes(seq, |n| {
        if n.is_rest {
            return n.clone();
        }
        let Some(midi) = n.midi_note() else { return n.clone() };
        let mirrored = (2 * axis - midi).clamp(MIDI_MIN, MIDI_MAX);
        let (name, octave, cents) = midi_to_note(mirrored);
        MusicalNoteData {
            name,
            octave,
            alteration: 0,
            cent_offset: cents,
            ..n.clone()
        }
    })
}

fn retrograde_sequence(seq: &SequenceData) -> SequenceData {
    SequenceData {
        bars: seq
            .bars
            .iter()
            .map(|bar| BarData {
                elements: bar.elements.iter().rev().cloned().collect(),
                time_signature: bar.time_signature.clone(),
            })
            .collect(),
        total_beats: seq.total_beats,
    }
}

fn scale_duration_sequence(seq: &SequenceData, augment: bool) -> SequenceData {
    map_notes(seq, |n| {
        let Some(d) = n.duration else { return n.clone() };
        let beats = d.as_fraction();
        let scaled = if augment { beats * 2.0 } else { beats / 2.0 };
        let new_duration = closest_fraction(scaled);
        MusicalNoteData { duration: Some(new_duration), ..n.clone() }
    })
}

fn closest_fraction(fraction: f64) -> DurationSuffix {
    const CANDIDATES: [DurationSuffix; 6] = [
        DurationSuffix::Whole,
        DurationSuffix::Half,
        DurationSuffix::Quarter,
        DurationSuffix::Eighth,
        DurationSuffix::Sixteenth,
        DurationSuffix::ThirtySecond,
    ];
    CANDIDATES
        .iter()
        .copied()
        .min_by(|a, b| {
            (a.as_fraction() - fraction)
                .abs()
                .partial_cmp(&(b.as_fraction() - fraction).abs())
                .unwrap()
        })
        .unwrap_or(DurationSuffix::Quarter)
}

fn repeat_sequence(seq: &SequenceData, n: usize, step_semitones: i32) -> SequenceData {
    let mut bars = Vec::new();
    let mut total_beats = 0.0;
    let mut current = seq.clone();
    for i in 0..n {
        if i > 0 && step_semitones != 0 {
            let mut diagnostics = Diagnostics::new("repeat");
            current = transpose_sequence(&current, step_semitones, &mut diagnostics, Location::default());
        }
        bars.extend(current.bars.clone());
        total_beats += current.total_beats;
    }
    SequenceData { bars, total_beats }
}

fn ramp_velocity(seq: &SequenceData, from: f64, to: f64) -> SequenceData {
    let sounding_count = seq
        .bars
        .iter()
        .flat_map(|b| &b.elements)
        .filter(|n| !n.is_rest)
        .count();
    if sounding_count == 0 {
        return seq.clone();
    }
    let mut i = 0usize;
    map_notes(seq, |n| {
        if n.is_rest {
            return n.clone();
        }
        let t = if sounding_count > 1 { i as f64 / (sounding_count - 1) as f64 } else { 0.0 };
        i += 1;
        MusicalNoteData { velocity: from + (to - from) * t, ..n.clone() }
    })
}

fn humanize_sequence(seq: &SequenceData, amount: f64, rng: &mut crate::rng::RngPair) -> SequenceData {
    map_notes(seq, |n| {
        if n.is_rest {
            return n.clone();
        }
        let jitter = rng.humanize_offset(amount);
        MusicalNoteData {
            velocity: (n.velocity + jitter).clamp(0.0, 1.0),
            ..n.clone()
        }
    })
}

fn trill_sequence(seq: &SequenceData, semitones: i32, diagnostics: &mut Diagnostics, location: Location) -> SequenceData {
    SequenceData {
        bars: seq
            .bars
            .iter()
            .map(|bar| {
                let mut elements = Vec::new();
                for n in &bar.elements {
                    if n.is_rest {
                        elements.push(n.clone());
                        continue;
                    }
                    let Some(d) = n.duration else {
                        elements.push(n.clone());
                        continue;
                    }
                    let half = closest_fraction(d.as_fraction() / 2.0);
                    let Some(midi) = n.midi_note() else {
                        elements.push(n.clone());
                        continue;
                    };
                    let upper_midi = (midi + semitones).clamp(MIDI_MIN, MIDI_MAX);
                    if midi + semitones != upper_midi {
                        diagnostics.warn(location, "trill upper note clamped to instrument range");
                    }
                    let (name2, octave2, cents2) = midi_to_note(upper_midi);
                    elements.push(MusicalNoteData { duration: Some(half), ..n.clone() });
                    elements.push(MusicalNoteData {
                        name: name2,
                        octave: octave2,
                        alteration: 0,
                        cent_offset: cents2,
                        duration: Some(half),
                        ..n.clone()
                    });
                }
                BarData { elements, time_signature: bar.time_signature.clone() }
            })
            .collect(),
        total_beats: seq.total_beats,
    }
}

fn tremolo_sequence(seq: &SequenceData, subdivisions: usize) -> SequenceData {
    SequenceData {
        bars: seq
            .bars
            .iter()
            .map(|bar| {
                let mut elements = Vec::new();
                for n in &bar.elements {
                    if n.is_rest {
                        elements.push(n.clone());
                        continue;
                    }
                    let Some(d) = n.duration else {
                        elements.push(n.clone());
                        continue;
                    };
                    let sub_fraction = d.as_fraction() / subdivisions as f64;
                    let sub_duration = closest_fraction(sub_fraction);
                    for _ in 0..subdivisions {
                        elements.push(MusicalNoteData { duration: Some(sub_duration), ..n.clone() });
                    }
                }
                BarData { elements, time_signature: bar.time_signature.clone() }
            })
            .collect(),
        total_beats: seq.total_beats,
    }
}

fn euclidean_rhythm(pulses: usize, steps: usize, note: &str) -> SequenceData {
    let mut chars = note.chars();
    let letter = chars.next().unwrap_or('C');
    let octave: u32 = chars.collect::<String>().parse().unwrap_or(4);

    let mut pattern = vec![false; steps];
    if pulses > 0 {
        let mut bucket = 0usize;
        for slot in pattern.iter_mut() {
            bucket += pulses;
            if bucket >= steps {
                bucket -= steps;
                *slot = true;
            }
        }
    }

    let duration = closest_fraction(1.0 / steps as f64 * 4.0);
    let elements = pattern
        .into_iter()
        .map(|hit| {
            if hit {
                MusicalNoteData {
                    name: letter,
                    octave,
                    alteration: 0,
                    duration: Some(duration),
                    is_rest: false,
                    cent_offset: 0.0,
                    is_tied: false,
                    is_dotted: false,
                    velocity: 0.63,
                    articulation: crate::ast::Articulation::None,
                }
            } else {
                MusicalNoteData::rest(Some(duration), false)
            }
        })
        .collect::<Vec<_>>();

    SequenceData {
        total_beats: elements.len() as f64 * duration.as_fraction() * 4.0,
        bars: vec![BarData {
            elements,
            time_signature: crate::value::TimeSignatureData { numerator: steps as u32, denominator: 4 },
        }],
    }
}

fn arpeggiate(chord: &ChordData, direction: &str) -> SequenceData {
    let mut names = chord.note_names.clone();
    if direction == "down" {
        names.reverse();
    }
    let duration = chord.duration.unwrap_or(DurationSuffix::Quarter);
    let elements = names
        .iter()
        .filter_map(|n| {
            let (letter, octave, alteration, cent_offset) = crate::compiler::parse_pitch_name(n)?;
            Some(MusicalNoteData {
                name: letter,
                octave,
                alteration,
                duration: Some(duration),
                is_rest: false,
                cent_offset,
                is_tied: false,
                is_dotted: false,
                velocity: 0.63,
                articulation: crate::ast::Articulation::None,
            })
        })
        .collect::<Vec<_>>();
    let total_beats = elements.len() as f64 * duration.as_fraction() * 4.0;
    SequenceData {
        bars: vec![BarData {
            elements,
            time_signature: crate::value::TimeSignatureData { numerator: 4, denominator: 4 },
        }],
        total_beats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TimeSignatureData;

    fn one_bar(notes: Vec<MusicalNoteData>) -> SequenceData {
        SequenceData {
            total_beats: notes.len() as f64,
            bars: vec![BarData { elements: notes, time_signature: TimeSignatureData { numerator: 4, denominator: 4 } }],
        }
    }

    fn note(name: char, octave: u32) -> MusicalNoteData {
        MusicalNoteData {
            name,
            octave,
            alteration: 0,
            duration: Some(DurationSuffix::Quarter),
            is_rest: false,
            cent_offset: 0.0,
            is_tied: false,
            is_dotted: false,
            velocity: 0.63,
            articulation: crate::ast::Articulation::None,
        }
    }

    #[test]
    fn retrograde_is_involutive() {
        let seq = one_bar(vec![note('C', 4), note('D', 4), note('E', 4)]);
        let twice = retrograde_sequence(&retrograde_sequence(&seq));
        assert_eq!(twice, seq);
    }

    #[test]
    fn transpose_composes() {
        let seq = one_bar(vec![note('C', 4)]);
        let mut d1 = Diagnostics::new("t");
        let mut d2 = Diagnostics::new("t");
        let combined = transpose_sequence(&seq, 5, &mut d1, Location::default());
        let stepwise = transpose_sequence(&transpose_sequence(&seq, 2, &mut d2, Location::default()), 3, &mut d2, Location::default());
        assert_eq!(combined.bars[0].elements[0].midi_note(), stepwise.bars[0].elements[0].midi_note());
    }

    #[test]
    fn augment_then_diminish_is_identity_away_from_extremes() {
        let seq = one_bar(vec![note('C', 4)]);
        let roundtrip = scale_duration_sequence(&scale_duration_sequence(&seq, true), false);
        assert_eq!(roundtrip.bars[0].elements[0].duration, seq.bars[0].elements[0].duration);
    }

    #[test]
    fn repeat_zero_times_is_empty() {
        let seq = one_bar(vec![note('C', 4)]);
        let repeated = repeat_sequence(&seq, 0, 0);
        assert!(repeated.bars.is_empty());
    }

    #[test]
    fn arpeggio_respells_sharp_root_tones_correctly() {
        let chord = crate::chord::parse_chord_symbol("D").unwrap();
        let seq = arpeggiate(&chord, "up");
        let notes = &seq.bars[0].elements;
        assert_eq!(notes[1].name, 'F');
        assert_eq!(notes[1].cent_offset, 100.0);
    }

    #[test]
    fn arpeggio_uses_the_chords_own_annotated_duration() {
        let mut chord = crate::chord::parse_chord_symbol("C").unwrap();
        chord.duration = Some(DurationSuffix::Eighth);
        let seq = arpeggiate(&chord, "up");
        assert!(seq.bars[0].elements.iter().all(|n| n.duration == Some(DurationSuffix::Eighth)));
    }
}
