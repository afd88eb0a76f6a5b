//! End-to-end scenarios exercising the full lex → parse → evaluate
//! pipeline: a single source string in, a checked structural shape out.

use cadence::ast::DurationSuffix;
use cadence::value::Data;
use cadence::{evaluate, Severity};

fn run(source: &str) -> cadence::Value {
    let (value, diagnostics) = evaluate(source, "test.cad");
    assert!(!diagnostics.has_errors(), "unexpected errors: {:?}", diagnostics.entries());
    value
}

#[test]
fn auto_fit_quarters_in_four_four() {
    let value = run("timesig 4/4 {\nSequence s = | C4 D4 E4 F4 |\n}\n");
    let seq = value.as_sequence(Default::default()).unwrap();
    assert_eq!(seq.bars.len(), 1);
    let names: Vec<char> = seq.bars[0].elements.iter().map(|n| n.name).collect();
    assert_eq!(names, vec!['C', 'D', 'E', 'F']);
    assert_eq!(seq.bars[0].time_signature.numerator, 4);
    for note in &seq.bars[0].elements {
        assert_eq!(note.duration, Some(DurationSuffix::Quarter));
    }
}

#[test]
fn dotted_and_explicit_durations_sum_to_four_beats() {
    let value = run("timesig 4/4 {\nSequence s = | C4q. E4e F4h |\n}\n");
    let seq = value.as_sequence(Default::default()).unwrap();
    let bar = &seq.bars[0];
    assert_eq!(bar.elements[0].duration, Some(DurationSuffix::Quarter));
    assert!(bar.elements[0].is_dotted);
    assert_eq!(bar.elements[1].duration, Some(DurationSuffix::Eighth));
    assert!(!bar.elements[1].is_dotted);
    assert_eq!(bar.elements[2].duration, Some(DurationSuffix::Half));

    let total: f64 = bar
        .elements
        .iter()
        .map(|n| {
            let beats = n.duration.unwrap().as_beats(4);
            if n.is_dotted {
                beats * 1.5
            } else {
                beats
            }
        })
        .sum();
    assert!((total - 4.0).abs() < 1e-9);
}

#[test]
fn roman_numerals_resolve_within_a_key() {
    let value = run("use \"@std\"\nkey Cmajor {\ntimesig 4/4 {\nSequence p = | I IV V I |\n}\n}\n");
    let seq = value.as_sequence(Default::default()).unwrap();
    assert_eq!(seq.bars.len(), 4);
    let bar_pitches = |i: usize| -> Vec<char> { seq.bars[i].elements.iter().map(|n| n.name).collect() };
    let mut one = bar_pitches(0);
    one.sort();
    assert_eq!(one, vec!['C', 'E', 'G']);
    let mut four = bar_pitches(1);
    four.sort();
    assert_eq!(four, vec!['A', 'C', 'F']);
    let mut five = bar_pitches(2);
    five.sort();
    assert_eq!(five, vec!['B', 'D', 'G']);
    let mut last = bar_pitches(3);
    last.sort();
    assert_eq!(last, vec!['C', 'E', 'G']);
}

#[test]
fn transpose_then_retrograde_chain() {
    let value = run("use \"@std\"\nSequence t = | C4 D4 E4 F4 | -> transpose 2st -> retrograde\n");
    let seq = value.as_sequence(Default::default()).unwrap();
    let bar = &seq.bars[0];
    assert_eq!(bar.elements.len(), 4);
    let pitches: Vec<(char, u32, f64)> = bar.elements.iter().map(|n| (n.name, n.octave, n.cent_offset)).collect();
    assert_eq!(pitches, vec![('G', 4, 0.0), ('F', 4, 100.0), ('E', 4, 0.0), ('D', 4, 0.0)]);
    let durations: Vec<_> = bar.elements.iter().map(|n| n.duration).collect();
    assert_eq!(durations, vec![Some(DurationSuffix::Quarter); 4]);
}

#[test]
fn seeded_randomness_is_reproducible_within_one_run() {
    let source = r#"use "@std"
use "@audio"
setSeed(7)
Sequence a = | (?? C4 E4 G4) (?? C4 E4 G4) |
setSeed(7)
Sequence b = | (?? C4 E4 G4) (?? C4 E4 G4) |
b
"#;
    let mut ctx = cadence::EvalCtx::new("test.cad");
    let program = cadence::parse(source, "test.cad").unwrap();
    // Run statement by statement so both `a` and `b` stay reachable.
    let _ = ctx.run_program(&program);
    assert!(!ctx.diagnostics.has_errors());
    let a = ctx.stack.resolve("a", Default::default()).unwrap().as_sequence(Default::default()).unwrap().clone();
    let b = ctx.stack.resolve("b", Default::default()).unwrap().as_sequence(Default::default()).unwrap().clone();
    let pitches = |seq: &cadence::value::SequenceData| -> Vec<char> { seq.bars[0].elements.iter().map(|n| n.name).collect() };
    assert_eq!(pitches(&a), pitches(&b));
}

#[test]
fn song_arrangement_duration_matches_section_and_repeat_arithmetic() {
    let source = r#"use "@std"
timesig 4/4 {
section a {
  Sequence s = | C4h D4h |
}
section b {
  Sequence s = | C4q |
}
}
Song x = (song ["a" "b" "a"] [1 3 1])
"#;
    let value = run(source);
    let song = value.as_song(Default::default()).unwrap();
    assert_eq!(song.sections, vec![("a".to_string(), 1), ("b".to_string(), 3), ("a".to_string(), 1)]);
}

#[test]
fn empty_note_stream_compiles_to_one_bar_whole_rest() {
    let value = run("Sequence s = | |\n");
    let seq = value.as_sequence(Default::default()).unwrap();
    assert_eq!(seq.bars.len(), 1);
    assert!(seq.bars[0].elements.is_empty() || seq.bars[0].elements.iter().all(|n| n.is_rest));
}

#[test]
fn single_note_bar_in_three_four_becomes_dotted_half() {
    let value = run("timesig 3/4 {\nSequence s = | C4 |\n}\n");
    let seq = value.as_sequence(Default::default()).unwrap();
    let note = &seq.bars[0].elements[0];
    assert_eq!(note.duration, Some(DurationSuffix::Half));
    assert!(note.is_dotted);
}

#[test]
fn overflow_bar_emits_warning_but_keeps_both_notes() {
    let (value, diagnostics) = evaluate("timesig 4/4 {\nSequence s = | C4w C4w |\n}\n", "test.cad");
    assert!(!diagnostics.has_errors());
    let seq = value.as_sequence(Default::default()).unwrap();
    assert_eq!(seq.bars[0].elements.len(), 2);
    assert!(diagnostics.entries().iter().any(|d| d.severity == Severity::Warning));
}

#[test]
fn repeat_zero_times_yields_an_empty_sequence() {
    let value = run("use \"@std\"\nSequence s = | C4 D4 | -> repeat 0\n");
    let seq = value.as_sequence(Default::default()).unwrap();
    assert_eq!(seq.bars.len(), 0);
}

#[test]
fn undefined_identifier_is_reported_as_a_name_resolution_error() {
    let (_, diagnostics) = evaluate("y = doesNotExist\n", "test.cad");
    assert!(diagnostics.has_errors());
}

#[test]
fn procedure_definition_and_invocation() {
    let value = run("proc Double (Int: n) return (add n n) end proc\nInt x = (Double 21)\n");
    assert!(matches!(value.data, Data::Int(42)));
}
