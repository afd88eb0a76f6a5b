//! # Note-stream compiler
//!
//! Turns a [`NoteStreamExpr`] + effective [`ResolvedContext`] (+ execution
//! stack, for variable references) into a [`SequenceData`]: auto-fits
//! missing durations to the bar, interpolates velocity ramps, and
//! expands chord/roman-numeral/random/variable elements into notes.

use crate::ast::{Articulation, Bar, DurationSuffix, NoteLit, NoteStreamExpr, RestLit, StreamElement};
use crate::chord::{parse_chord_symbol, resolve_numeral};
use crate::context::{ResolvedContext, Stack};
use crate::error::{Diagnostics, Location};
use crate::rng::RngPair;
use crate::value::{BarData, Data, MusicalNoteData, SequenceData, TimeSignatureData};

/// An element after random/variable resolution, immediately before
/// duration assignment. `pitches` has one entry per sounding note (empty
/// for a rest); more than one entry means a chord voicing.
struct Elaborated {
    pitches: Vec<(char, u32, i32, f64)>, // name, octave, alteration, cent_offset
    is_rest: bool,
    explicit_duration: Option<DurationSuffix>,
    dotted: bool,
    tied: bool,
    velocity_override: Option<f64>,
    articulation: Articulation,
    is_ghost: bool,
    is_grace: bool,
}

impl Elaborated {
    fn rest(duration: Option<DurationSuffix>, dotted: bool) -> Self {
        Self {
            pitches: Vec::new(),
            is_rest: true,
            explicit_duration: duration,
            dotted,
            tied: false,
            velocity_override: None,
            articulation: Articulation::None,
            is_ghost: false,
            is_grace: false,
        }
    }
}

pub fn compile_note_stream(
    stream: &NoteStreamExpr,
    context: &ResolvedContext,
    stack: &Stack,
    rng: &mut RngPair,
    diagnostics: &mut Diagnostics,
) -> SequenceData {
    let mut bars = Vec::new();
    let mut total_beats = 0.0;
    for bar in &stream.bars {
        let compiled = compile_bar(bar, context, stack, rng, diagnostics, stream.location);
        total_beats += compiled
            .elements
            .iter()
            .map(|n| element_beats(n, context.time_signature.1))
            .sum::<f64>();
        bars.push(compiled);
    }
    SequenceData { bars, total_beats }
}

fn element_beats(note: &MusicalNoteData, denominator: u32) -> f64 {
    let base = note.duration.unwrap_or(DurationSuffix::Quarter).as_beats(denominator);
    if note.is_dotted {
        base * 1.5
    } else {
        base
    }
}

/// Finds the closest standard note value to a raw beat count, also
/// considering each candidate's dotted (×1.5) form, so a bar like a
/// single note in 3/4 lands on an exact dotted half rather than the
/// nearest plain value.
fn fit_duration(beats: f64, denominator: u32) -> (DurationSuffix, bool) {
    const CANDIDATES: [DurationSuffix; 6] = [
        DurationSuffix::Whole,
        DurationSuffix::Half,
        DurationSuffix::Quarter,
        DurationSuffix::Eighth,
        DurationSuffix::Sixteenth,
        DurationSuffix::ThirtySecond,
    ];
    let mut best = (DurationSuffix::Quarter, false, f64::MAX);
    for d in CANDIDATES {
        let plain = d.as_beats(denominator);
        let dotted = plain * 1.5;
        if (plain - beats).abs() < best.2 {
            best = (d, false, (plain - beats).abs());
        }
        if (dotted - beats).abs() < best.2 {
            best = (d, true, (dotted - beats).abs());
        }
    }
    (best.0, best.1)
}

fn compile_bar(
    bar: &Bar,
    context: &ResolvedContext,
    stack: &Stack,
    rng: &mut RngPair,
    diagnostics: &mut Diagnostics,
    location: Location,
) -> BarData {
    let (numerator, denominator) = context.time_signature;
    let time_signature = TimeSignatureData { numerator, denominator };

    if bar.elements.is_empty() {
        return BarData {
            elements: vec![MusicalNoteData::rest(Some(DurationSuffix::Whole), false)],
            time_signature,
        };
    }

    // Pass 1: resolve random choices / variable references in source
    // order, and expand chord-ish elements into pitch lists.
    let elaborated: Vec<Elaborated> = bar
        .elements
        .iter()
        .map(|el| elaborate(el, context, stack, rng, diagnostics, location))
        .collect();

    // Pass 2: auto-fit duration for elements that didn't specify one.
    let explicit_beats: f64 = elaborated
        .iter()
        .filter_map(|e| e.explicit_duration.map(|d| {
            let b = d.as_beats(denominator);
            if e.dotted { b * 1.5 } else { b }
        }))
        .sum();
    let implicit_count = elaborated.iter().filter(|e| e.explicit_duration.is_none()).count();
    let remaining_beats = (numerator as f64 - explicit_beats).max(0.0);
    if numerator as f64 - explicit_beats < 0.0 {
        diagnostics.warn(location, "bar duration exceeds time signature; emitted as written");
    }
    let (auto_fit, auto_fit_dotted) = if implicit_count > 0 {
        let per = remaining_beats / implicit_count as f64;
        fit_duration(per, denominator)
    } else {
        (DurationSuffix::Quarter, false)
    };

    // Pass 3: emit MusicalNoteData, one (or more, for chords) per element.
    // `overrides` tracks each pushed note's pre-articulation-bias explicit
    // velocity (`None` for notes that never carried one), kept parallel to
    // `notes` so `interpolate_velocity` can gate on genuinely explicit
    // values rather than the post-bias velocity already baked into `notes`.
    let mut notes = Vec::new();
    let mut overrides: Vec<Option<f64>> = Vec::new();
    for el in &elaborated {
        let implicit = el.explicit_duration.is_none();
        let duration = el.explicit_duration.unwrap_or(auto_fit);
        let el_dotted_override = if implicit { auto_fit_dotted } else { el.dotted };
        if el.is_rest {
            notes.push(MusicalNoteData::rest(Some(duration), el_dotted_override));
            overrides.push(None);
            continue;
        }
        for (name, octave, alteration, cent_offset) in &el.pitches {
            let mut velocity = el
                .velocity_override
                .or(Some(context.velocity))
                .unwrap_or(0.63);
            velocity = match el.articulation {
                Articulation::None => velocity,
                Articulation::Accent => (velocity + 0.2).min(1.0),
                Articulation::Marcato => (velocity + 0.3).min(1.0),
                Articulation::Sforzando => 0.95,
            };
            if el.is_ghost {
                velocity = 0.15;
            }
            let (duration, dotted) = if el.is_grace {
                (DurationSuffix::ThirtySecond, false)
            } else {
                (duration, el_dotted_override)
            };
            let final_velocity = if el.is_grace { 0.5 } else { velocity };
            notes.push(MusicalNoteData {
                name: *name,
                octave: *octave,
                alteration: *alteration,
                duration: Some(duration),
                is_rest: false,
                cent_offset: *cent_offset,
                is_tied: el.tied,
                is_dotted: dotted,
                velocity: final_velocity,
                articulation: el.articulation,
            });
            overrides.push(el.velocity_override);
        }
    }

    interpolate_velocity(&mut notes, &overrides);

    BarData {
        elements: notes,
        time_signature,
    }
}

/// If elements carry at least two distinct *explicit* velocities
/// (`overrides[i].is_some()`, set before articulation bias is applied —
/// not the post-bias value already baked into `notes`), linearly
/// interpolates the velocities of intermediate (non-rest) notes between
/// the first and last explicitly-voiced ones. Plain notes and
/// articulation marks alone never trigger this pass.
fn interpolate_velocity(notes: &mut [MusicalNoteData], overrides: &[Option<f64>]) {
    let explicit: Vec<usize> = overrides
        .iter()
        .enumerate()
        .filter(|(i, v)| v.is_some() && !notes[*i].is_rest)
        .map(|(i, _)| i)
        .collect();
    if explicit.len() < 2 {
        return;
    }
    let distinct: std::collections::HashSet<i64> = explicit
        .iter()
        .map(|&i| (overrides[i].unwrap() * 1000.0) as i64)
        .collect();
    if distinct.len() < 2 {
        return;
    }
    let first = explicit[0];
    let last = *explicit.last().unwrap();
    let start_v = notes[first].velocity;
    let end_v = notes[last].velocity;
    let span = (last - first) as f64;
    for i in (first + 1)..last {
        if notes[i].is_rest {
            continue;
        }
        let t = (i - first) as f64 / span;
        notes[i].velocity = start_v + (end_v - start_v) * t;
    }
}

fn elaborate(
    el: &StreamElement,
    context: &ResolvedContext,
    stack: &Stack,
    rng: &mut RngPair,
    diagnostics: &mut Diagnostics,
    location: Location,
) -> Elaborated {
    match el {
        StreamElement::Note(n) => elaborate_note(n),
        StreamElement::Rest(r) => Elaborated::rest(r.duration, r.dotted),
        StreamElement::BracketedChord { notes, duration, dotted } => {
            let pitches = notes
                .iter()
                .map(|n| (n.name, n.octave.unwrap_or(4) as u32, n.octave_alteration, n.cent_offset.unwrap_or(0.0)))
                .collect();
            Elaborated {
                pitches,
                is_rest: false,
                explicit_duration: *duration,
                dotted: *dotted,
                tied: false,
                velocity_override: None,
                articulation: Articulation::None,
                is_ghost: false,
                is_grace: false,
            }
        }
        StreamElement::NamedChord { symbol, duration, dotted } => {
            match parse_chord_symbol(symbol) {
                Some(chord) => {
                    // An explicit stream-level duration suffix wins; absent
                    // one, fall back to whatever the chord itself carries
                    // (always `None` here, since a bare symbol has no prior
                    // annotation, but this keeps the two paths consistent
                    // with the `Variable` case below).
                    let chosen = duration.or(chord.duration);
                    chord_to_elaborated(&chord.note_names, chosen, *dotted)
                }
                None => {
                    diagnostics.warn(location, format!("invalid chord symbol '{symbol}'; emitted as rest"));
                    Elaborated::rest(*duration, *dotted)
                }
            }
        }
        StreamElement::RomanNumeral { numeral, duration, dotted } => {
            match context.key.as_deref().and_then(|key| resolve_numeral(numeral, key)) {
                Some(chord) => {
                    let chosen = duration.or(chord.duration);
                    chord_to_elaborated(&chord.note_names, chosen, *dotted)
                }
                None => {
                    diagnostics.warn(location, format!("roman numeral '{numeral}' unresolved (no key?); emitted as rest"));
                    Elaborated::rest(*duration, *dotted)
                }
            }
        }
        StreamElement::Random { choices, seeded } => {
            let weights: Vec<f64> = choices.iter().map(|(_, w)| w.unwrap_or(1.0)).collect();
            let total: f64 = weights.iter().sum();
            let idx = if total <= 0.0 {
                diagnostics.warn(location, "random-choice weights sum to zero; falling back to a uniform pick".to_string());
                rng.uniform_index(choices.len(), *seeded)
            } else {
                rng.weighted_choice(&weights, *seeded)
            };
            elaborate(&choices[idx].0, context, stack, rng, diagnostics, location)
        }
        StreamElement::Variable(name) => match stack.get(name) {
            Some(value) => match &value.data {
                Data::Note(note_str) => parse_note_string(note_str)
                    .unwrap_or_else(|| Elaborated::rest(None, false)),
                Data::MusicalNote(n) => Elaborated {
                    pitches: if n.is_rest {
                        Vec::new()
                    } else {
                        vec![(n.name, n.octave, n.alteration, n.cent_offset)]
                    },
                    is_rest: n.is_rest,
                    explicit_duration: n.duration,
                    dotted: n.is_dotted,
                    tied: n.is_tied,
                    velocity_override: Some(n.velocity),
                    articulation: n.articulation,
                    is_ghost: false,
                    is_grace: false,
                },
                // A chord referenced by variable has no stream-level
                // duration suffix to attach, so it plays at whatever
                // duration it was annotated with via `setDuration` (or
                // auto-fit, if never annotated).
                Data::Chord(chord) => chord_to_elaborated(&chord.note_names, chord.duration, false),
                _ => {
                    diagnostics.warn(location, format!("variable '{name}' is not a Note, MusicalNote, or Chord; emitted as rest"));
                    Elaborated::rest(None, false)
                }
            },
            None => {
                diagnostics.warn(location, format!("unresolved stream variable '{name}'; emitted as rest"));
                Elaborated::rest(None, false)
            }
        },
        StreamElement::Ghost(inner) => {
            let mut e = elaborate(inner, context, stack, rng, diagnostics, location);
            e.is_ghost = true;
            e
        }
        StreamElement::Grace(inner) => {
            let mut e = elaborate(inner, context, stack, rng, diagnostics, location);
            e.is_grace = true;
            e
        }
    }
}

fn elaborate_note(n: &NoteLit) -> Elaborated {
    Elaborated {
        pitches: vec![(n.name, n.octave.unwrap_or(4) as u32, n.octave_alteration, n.cent_offset.unwrap_or(0.0))],
        is_rest: false,
        explicit_duration: n.duration,
        dotted: n.dotted,
        tied: n.tied,
        velocity_override: n.velocity,
        articulation: n.articulation,
        is_ghost: false,
        is_grace: false,
    }
}

fn chord_to_elaborated(note_names: &[String], duration: Option<DurationSuffix>, dotted: bool) -> Elaborated {
    let pitches = note_names
        .iter()
        .filter_map(|n| parse_pitch_name(n))
        .collect();
    Elaborated {
        pitches,
        is_rest: false,
        explicit_duration: duration,
        dotted,
        tied: false,
        velocity_override: None,
        articulation: Articulation::None,
        is_ghost: false,
        is_grace: false,
    }
}

/// Parses a display-form pitch name like `"C#4"`/`"Bb3"` back into
/// `(letter, octave, alteration-in-semitones-folded-into-octave, cents)`.
/// Since [`MusicalNoteData`] only tracks whole-octave alteration, a
/// sharp/flat from chord expansion is approximated to the nearest
/// natural letter plus a 100-cent offset, keeping pitch-class intent
/// audible without inventing a new accidental field.
pub(crate) fn parse_pitch_name(name: &str) -> Option<(char, u32, i32, f64)> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    let rest: String = chars.collect();
    let (sharp, digits) = if let Some(stripped) = rest.strip_prefix('#') {
        (true, stripped)
    } else {
        (false, rest.as_str())
    };
    let octave: u32 = digits.parse().ok()?;
    let cents = if sharp { 100.0 } else { 0.0 };
    Some((letter, octave, 0, cents))
}

fn parse_note_string(s: &str) -> Option<Elaborated> {
    let mut chars = s.chars();
    let letter = chars.next()?;
    if !('A'..='G').contains(&letter) {
        return None;
    }
    let digits: String = chars.take_while(|c| c.is_ascii_digit()).collect();
    let octave: u32 = digits.parse().unwrap_or(4);
    Some(Elaborated {
        pitches: vec![(letter, octave, 0, 0.0)],
        is_rest: false,
        explicit_duration: None,
        dotted: false,
        tied: false,
        velocity_override: None,
        articulation: Articulation::None,
        is_ghost: false,
        is_grace: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NoteLit;

    fn note(name: char, octave: u32) -> StreamElement {
        StreamElement::Note(NoteLit {
            name,
            octave: Some(octave as u8),
            octave_alteration: 0,
            duration: None,
            dotted: false,
            tied: false,
            cent_offset: None,
            articulation: Articulation::None,
            velocity: None,
        })
    }

    fn ctx_4_4() -> ResolvedContext {
        ResolvedContext {
            time_signature: (4, 4),
            tempo: 120.0,
            swing: 0.5,
            key: None,
            velocity: 0.63,
            dynamics: None,
        }
    }

    #[test]
    fn auto_fit_four_quarters() {
        let bar = Bar {
            elements: vec![note('C', 4), note('D', 4), note('E', 4), note('F', 4)],
        };
        let stream = NoteStreamExpr { bars: vec![bar], location: Location::new(1, 1) };
        let stack = Stack::new();
        let mut rng = RngPair::new();
        let mut diags = Diagnostics::new("test");
        let seq = compile_note_stream(&stream, &ctx_4_4(), &stack, &mut rng, &mut diags);
        assert_eq!(seq.bars[0].elements.len(), 4);
        for n in &seq.bars[0].elements {
            assert_eq!(n.duration, Some(DurationSuffix::Quarter));
        }
    }

    fn accented(name: char, octave: u32, articulation: Articulation) -> StreamElement {
        StreamElement::Note(NoteLit {
            name,
            octave: Some(octave as u8),
            octave_alteration: 0,
            duration: None,
            dotted: false,
            tied: false,
            cent_offset: None,
            articulation,
            velocity: None,
        })
    }

    #[test]
    fn articulation_alone_never_triggers_velocity_interpolation() {
        // Accent, then a plain note, then Sforzando: two distinct
        // post-bias velocities appear, but neither note carries an
        // explicit velocity, so the plain note's velocity must be left
        // untouched rather than blended between the other two.
        let bar = Bar {
            elements: vec![
                accented('C', 4, Articulation::Accent),
                accented('D', 4, Articulation::None),
                accented('E', 4, Articulation::Sforzando),
            ],
        };
        let stream = NoteStreamExpr { bars: vec![bar], location: Location::new(1, 1) };
        let stack = Stack::new();
        let mut rng = RngPair::new();
        let mut diags = Diagnostics::new("test");
        let seq = compile_note_stream(&stream, &ctx_4_4(), &stack, &mut rng, &mut diags);
        let notes = &seq.bars[0].elements;
        assert_eq!(notes[1].velocity, ctx_4_4().velocity);
    }

    #[test]
    fn distinct_explicit_velocities_interpolate_across_intermediate_notes() {
        use crate::types::Type;
        use crate::value::Value;

        let mut low = MusicalNoteData::rest(None, false);
        low.is_rest = false;
        low.name = 'C';
        low.octave = 4;
        low.duration = Some(DurationSuffix::Quarter);
        low.velocity = 0.2;
        let mut high = low.clone();
        high.name = 'G';
        high.velocity = 0.8;

        let mut stack = Stack::new();
        stack.declare("lo", Value::new(Data::MusicalNote(Box::new(low)), Type::MusicalNote));
        stack.declare("hi", Value::new(Data::MusicalNote(Box::new(high)), Type::MusicalNote));

        let bar = Bar {
            elements: vec![
                StreamElement::Variable("lo".to_string()),
                note('D', 4),
                StreamElement::Variable("hi".to_string()),
            ],
        };
        let stream = NoteStreamExpr { bars: vec![bar], location: Location::new(1, 1) };
        let mut rng = RngPair::new();
        let mut diags = Diagnostics::new("test");
        let seq = compile_note_stream(&stream, &ctx_4_4(), &stack, &mut rng, &mut diags);
        let notes = &seq.bars[0].elements;
        assert_eq!(notes[0].velocity, 0.2);
        assert_eq!(notes[2].velocity, 0.8);
        assert!((notes[1].velocity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn all_zero_random_weights_fall_back_to_uniform_with_a_warning() {
        let choices = vec![
            (Box::new(note('C', 4)), Some(0.0)),
            (Box::new(note('D', 4)), Some(0.0)),
        ];
        let el = StreamElement::Random { choices, seeded: true };
        let stack = Stack::new();
        let mut rng = RngPair::new();
        let mut diags = Diagnostics::new("test");
        let elaborated = elaborate(&el, &ctx_4_4(), &stack, &mut rng, &mut diags, Location::new(1, 1));
        assert!(matches!(elaborated.pitches[0].0, 'C' | 'D'));
        assert!(diags.entries().iter().any(|d| d.message.contains("sum to zero")));
    }

    #[test]
    fn empty_bar_is_whole_rest() {
        let stream = NoteStreamExpr { bars: vec![Bar::default()], location: Location::new(1, 1) };
        let stack = Stack::new();
        let mut rng = RngPair::new();
        let mut diags = Diagnostics::new("test");
        let seq = compile_note_stream(&stream, &ctx_4_4(), &stack, &mut rng, &mut diags);
        assert_eq!(seq.bars[0].elements.len(), 1);
        assert!(seq.bars[0].elements[0].is_rest);
        assert_eq!(seq.bars[0].elements[0].duration, Some(DurationSuffix::Whole));
    }

    #[test]
    fn single_note_in_three_four_is_dotted_half() {
        let bar = Bar { elements: vec![note('C', 4)] };
        let stream = NoteStreamExpr { bars: vec![bar], location: Location::new(1, 1) };
        let stack = Stack::new();
        let mut rng = RngPair::new();
        let mut diags = Diagnostics::new("test");
        let mut ctx = ctx_4_4();
        ctx.time_signature = (3, 4);
        let seq = compile_note_stream(&stream, &ctx, &stack, &mut rng, &mut diags);
        assert_eq!(seq.bars[0].elements[0].duration, Some(DurationSuffix::Half));
    }

    #[test]
    fn chord_variable_expands_at_its_own_annotated_duration() {
        use crate::types::Type;
        use crate::value::{ChordData, Value};

        let chord = ChordData {
            root: "C".into(),
            quality: "maj".into(),
            octave: 4,
            note_names: vec!["C4".into(), "E4".into(), "G4".into()],
            duration: Some(DurationSuffix::Eighth),
        };
        let mut stack = Stack::new();
        stack.declare("c", Value::new(Data::Chord(Box::new(chord)), Type::Chord));

        let bar = Bar { elements: vec![StreamElement::Variable("c".to_string())] };
        let stream = NoteStreamExpr { bars: vec![bar], location: Location::new(1, 1) };
        let mut rng = RngPair::new();
        let mut diags = Diagnostics::new("test");
        let seq = compile_note_stream(&stream, &ctx_4_4(), &stack, &mut rng, &mut diags);
        let notes = &seq.bars[0].elements;
        assert_eq!(notes.len(), 3);
        assert!(notes.iter().all(|n| n.duration == Some(DurationSuffix::Eighth)));
    }
}
