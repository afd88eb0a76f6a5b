//! # Chord & scale library
//!
//! Pure functions: parse a chord symbol into a [`ChordData`], resolve a
//! roman numeral against a key into the same shape.

use crate::value::ChordData;

/// Root letter index within an octave, `C=0 .. B=11`.
fn pitch_class(letter: char) -> Option<i32> {
    match letter {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

fn note_name_for_class(pc: i32) -> String {
    // Prefer sharps; this is display-only (noteNames), not a literal the
    // lexer needs to re-parse.
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    NAMES[pc.rem_euclid(12) as usize].to_string()
}

/// Semitone offsets from the root for a chord quality, in the order the
/// chord spells its tones.
fn quality_intervals(quality: &str) -> Option<&'static [i32]> {
    Some(match quality {
        "" | "maj" => &[0, 4, 7],
        "m" | "min" => &[0, 3, 7],
        "dim" => &[0, 3, 6],
        "aug" => &[0, 4, 8],
        "7" | "dom7" => &[0, 4, 7, 10],
        "maj7" => &[0, 4, 7, 11],
        "m7" | "min7" => &[0, 3, 7, 10],
        "dim7" => &[0, 3, 6, 9],
        "m7f5" => &[0, 3, 6, 10],
        "sus2" => &[0, 2, 7],
        "sus4" => &[0, 5, 7],
        "add9" => &[0, 4, 7, 14],
        "9" => &[0, 4, 7, 10, 14],
        "6" => &[0, 4, 7, 9],
        "m6" => &[0, 3, 7, 9],
        _ => return None,
    })
}

/// Parses a chord symbol per the grammar
/// `[A-G](s|f)?(maj|m|min|dim|aug|7|dom7|maj7|m7|min7|dim7|m7f5|sus2|sus4|add9|9|6|m6)?`.
/// Missing quality defaults to major. Returns `None` for an invalid symbol.
pub fn parse_chord_symbol(symbol: &str) -> Option<ChordData> {
    let mut chars = symbol.chars();
    let root_letter = chars.next()?;
    let mut root_pc = pitch_class(root_letter)?;

    let mut rest: String = chars.collect();
    if let Some(first) = rest.chars().next() {
        if first == 's' {
            root_pc += 1;
            rest.remove(0);
        } else if first == 'f' {
            root_pc -= 1;
            rest.remove(0);
        }
    }

    let intervals = quality_intervals(&rest)?;
    let quality = if rest.is_empty() {
        "maj".to_string()
    } else {
        rest
    };

    Some(expand_chord(root_pc, &quality, intervals, 4))
}

/// Expands a root pitch class + quality + interval table into sounding
/// note names at the given base octave, wrapping upward whenever an
/// interval crosses an octave boundary.
fn expand_chord(root_pc: i32, quality: &str, intervals: &[i32], base_octave: u32) -> ChordData {
    let note_names = intervals
        .iter()
        .map(|&iv| {
            let pc = root_pc + iv;
            let octave_shift = pc.div_euclid(12);
            let name = note_name_for_class(pc);
            format!("{name}{}", base_octave as i32 + octave_shift)
        })
        .collect();

    ChordData {
        root: note_name_for_class(root_pc),
        quality: quality.to_string(),
        octave: base_octave,
        note_names,
        duration: None,
    }
}

/// Major scale degree offsets (semitones from tonic).
const MAJOR_SCALE: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];
/// Natural minor scale degree offsets.
const MINOR_SCALE: [i32; 7] = [0, 2, 3, 5, 7, 8, 10];

fn parse_key(key: &str) -> Option<(i32, bool)> {
    let lower = key.to_ascii_lowercase();
    let minor = lower.ends_with("minor") || lower.ends_with("min");
    let tonic_part: String = key
        .chars()
        .take_while(|c| c.is_ascii_uppercase() || *c == 's' || *c == 'f')
        .collect();
    let mut chars = tonic_part.chars();
    let letter = chars.next()?;
    let mut pc = pitch_class(letter)?;
    for c in chars {
        match c {
            's' => pc += 1,
            'f' => pc -= 1,
            _ => {}
        }
    }
    Some((pc.rem_euclid(12), minor))
}

/// `(I|II|...|VII|i|ii|...|vii)` with an optional quality extension.
/// Upper-case base => major default quality; lower-case => minor default.
fn parse_roman_base(numeral: &str) -> Option<(usize, bool, &str)> {
    const UPPER: [&str; 7] = ["I", "II", "III", "IV", "V", "VI", "VII"];
    const LOWER: [&str; 7] = ["i", "ii", "iii", "iv", "v", "vi", "vii"];
    let upper_first = numeral.chars().next()?.is_uppercase();
    let bases: &[&str; 7] = if upper_first { &UPPER } else { &LOWER };
    // match the longest base first (e.g. "III" before "I") so extensions
    // aren't swallowed into the degree.
    let mut candidates: Vec<(usize, &str)> = bases.iter().enumerate().map(|(i, s)| (i, *s)).collect();
    candidates.sort_by_key(|(_, s)| std::cmp::Reverse(s.len()));
    for (degree, base) in candidates {
        if let Some(extension) = numeral.strip_prefix(base) {
            return Some((degree, upper_first, extension));
        }
    }
    None
}

/// Resolves a roman numeral against a key name (e.g. `"Cmajor"`,
/// `"Aminor"`) into a [`ChordData`]. Returns `None` if the key is unset,
/// unparseable, or the numeral doesn't match the grammar.
pub fn resolve_numeral(numeral: &str, key: &str) -> Option<ChordData> {
    let (tonic_pc, key_is_minor) = parse_key(key)?;
    let (degree, numeral_upper, extension) = parse_roman_base(numeral)?;

    let scale = if key_is_minor { &MINOR_SCALE } else { &MAJOR_SCALE };
    let root_pc = (tonic_pc + scale[degree]).rem_euclid(12);

    let quality = if extension.is_empty() {
        // Default triad quality follows the scale degree's natural
        // quality in the given key, approximated here by the case of the
        // numeral itself (the conventional notation already encodes it).
        if numeral_upper { "maj" } else { "m" }
    } else {
        extension
    };

    let intervals = quality_intervals(quality)?;
    Some(expand_chord(root_pc, quality, intervals, 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_triad_default_quality() {
        let c = parse_chord_symbol("C").unwrap();
        assert_eq!(c.note_names, vec!["C4", "E4", "G4"]);
        assert_eq!(c.quality, "maj");
    }

    #[test]
    fn minor_seventh() {
        let dm7 = parse_chord_symbol("Dmin7").unwrap();
        assert_eq!(dm7.note_names, vec!["D4", "F4", "A4", "C5"]);
    }

    #[test]
    fn accidental_root() {
        let fs = parse_chord_symbol("Fs").unwrap();
        assert_eq!(fs.root, "F#");
    }

    #[test]
    fn invalid_quality_rejected() {
        assert!(parse_chord_symbol("Cxyz").is_none());
    }

    #[test]
    fn roman_numeral_in_c_major() {
        let one = resolve_numeral("I", "Cmajor").unwrap();
        assert_eq!(one.note_names, vec!["C4", "E4", "G4"]);
        let five = resolve_numeral("V", "Cmajor").unwrap();
        assert_eq!(five.note_names, vec!["G4", "B4", "D5"]);
        let four = resolve_numeral("IV", "Cmajor").unwrap();
        assert_eq!(four.note_names, vec!["F4", "A4", "C5"]);
    }

    #[test]
    fn roman_numeral_requires_key() {
        assert!(resolve_numeral("I", "").is_none());
    }

    #[test]
    fn lowercase_numeral_defaults_minor() {
        let two = resolve_numeral("ii", "Cmajor").unwrap();
        assert_eq!(two.note_names, vec!["D4", "F4", "A4"]);
    }
}
