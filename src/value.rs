//! # Runtime values
//!
//! A tagged `Value { data, type }` carrying every domain type a program
//! can pass around: numbers, strings, sequences of notes, chords,
//! songs, procedures, and arrays of any of those.

use std::fmt;
use std::rc::Rc;

use crate::ast::{Articulation, DurationSuffix};
use crate::context::MusicalContext;
use crate::error::{CadenceError, Location};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct MusicalNoteData {
    /// `'A'..'G'` for a sounding note, `' '` for a rest.
    pub name: char,
    pub octave: u32,
    /// Octave-alteration in whole octaves, range -2..=2.
    pub alteration: i32,
    pub duration: Option<DurationSuffix>,
    pub is_rest: bool,
    pub cent_offset: f64,
    pub is_tied: bool,
    pub is_dotted: bool,
    /// 0.0..=1.0
    pub velocity: f64,
    pub articulation: Articulation,
}

impl MusicalNoteData {
    pub fn rest(duration: Option<DurationSuffix>, is_dotted: bool) -> Self {
        Self {
            name: ' ',
            octave: 0,
            alteration: 0,
            duration,
            is_rest: true,
            cent_offset: 0.0,
            is_tied: false,
            is_dotted,
            velocity: 0.0,
            articulation: Articulation::None,
        }
    }

    /// MIDI note number, ignoring `cent_offset` (sub-semitone detuning is
    /// carried separately for the synth to apply).
    pub fn midi_note(&self) -> Option<i32> {
        if self.is_rest {
            return None;
        }
        let pc = match self.name {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };
        Some(pc + (self.octave as i32 + self.alteration + 1) * 12)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSignatureData {
    pub numerator: u32,
    pub denominator: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarData {
    pub elements: Vec<MusicalNoteData>,
    pub time_signature: TimeSignatureData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceData {
    pub bars: Vec<BarData>,
    pub total_beats: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChordData {
    pub root: String,
    pub quality: String,
    pub octave: u32,
    pub note_names: Vec<String>,
    /// Annotated duration, independent of whatever duration the melody
    /// around it carries. `None` when the chord hasn't been given one
    /// (e.g. straight out of `parseChord`/`resolveNumeral`); consumers
    /// like `arpeggio` fall back to a default when unset.
    pub duration: Option<DurationSuffix>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionData {
    pub name: String,
    pub sequences: Vec<(String, SequenceData)>,
    pub context: MusicalContext,
    pub source_location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongData {
    pub sections: Vec<(String, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub frames: usize,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn silence(frames: usize, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; frames * channels as usize],
            frames,
            channels,
            sample_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub buffer: Rc<AudioBuffer>,
    pub offset_beats: f64,
    pub gain: f64,
    pub pan: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OscillatorState {
    pub phase: f64,
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub voices: Vec<Voice>,
}

/// A closure over a snapshot of its free variables, taken at
/// construction — no live back-pointer to the enclosing frame.
#[derive(Debug, Clone)]
pub struct Lambda {
    pub params: Vec<(String, Type)>,
    pub body: Rc<crate::ast::Expression>,
    pub captured: Vec<(String, Value)>,
}

impl PartialEq for Lambda {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body) && self.params == other.params
    }
}

/// A user `proc` definition: named, with typed parameters and a
/// statement-list body (as opposed to [`Lambda`]'s single-expression
/// body).
#[derive(Debug, Clone)]
pub struct Proc {
    pub name: String,
    pub params: Vec<(String, Type)>,
    pub body: Rc<Vec<crate::ast::Statement>>,
}

impl PartialEq for Proc {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Rc::ptr_eq(&self.body, &other.body)
    }
}

/// Either a user lambda, a user proc, or a registered built-in, all
/// callable through the same `Function` type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    Lambda(Lambda),
    Proc(Proc),
    Builtin(String),
}

/// Unevaluated expression plus the frame snapshot to evaluate it in,
/// forced on first read (used by `if`'s lazily-evaluated branches).
#[derive(Debug, Clone)]
pub struct Thunk {
    pub body: Rc<crate::ast::Expression>,
    pub captured: Vec<(String, Value)>,
}

impl PartialEq for Thunk {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Void,
    Int(i64),
    Long(i64),
    Float(f32),
    Double(f64),
    Number(String),
    Bool(bool),
    Str(String),
    Function(Callable),
    LazyValue(Box<Thunk>),
    Buffer(Rc<AudioBuffer>),
    Note(String),
    MusicalNote(Box<MusicalNoteData>),
    NoteValue(DurationSuffix),
    Semitone(i32),
    Cent(f64),
    Millisecond(f64),
    Second(f64),
    Decibel(f64),
    TimeSignature(TimeSignatureData),
    Beat(f64),
    Bar(Box<BarData>),
    Sequence(Box<SequenceData>),
    Chord(Box<ChordData>),
    Section(Box<SectionData>),
    Song(Box<SongData>),
    Voice(Box<Voice>),
    Envelope(Box<Envelope>),
    OscillatorState(Box<OscillatorState>),
    Track(Box<Track>),
    Array(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub data: Data,
    pub ty: Type,
}

impl Value {
    pub fn new(data: Data, ty: Type) -> Self {
        Self { data, ty }
    }

    pub fn void() -> Self {
        Value::new(Data::Void, Type::Void)
    }

    pub fn int(v: i64) -> Self {
        Value::new(Data::Int(v), Type::Int)
    }

    pub fn double(v: f64) -> Self {
        Value::new(Data::Double(v), Type::Double)
    }

    pub fn bool(v: bool) -> Self {
        Value::new(Data::Bool(v), Type::Bool)
    }

    pub fn string(v: impl Into<String>) -> Self {
        Value::new(Data::Str(v.into()), Type::String)
    }

    pub fn array(elements: Vec<Value>, element_type: Type) -> Self {
        Value::new(Data::Array(elements), Type::Array(Box::new(element_type)))
    }

    pub fn sequence(seq: SequenceData) -> Self {
        Value::new(Data::Sequence(Box::new(seq)), Type::Sequence)
    }

    pub fn chord(chord: ChordData) -> Self {
        Value::new(Data::Chord(Box::new(chord)), Type::Chord)
    }

    pub fn song(song: SongData) -> Self {
        Value::new(Data::Song(Box::new(song)), Type::Song)
    }

    /// Casts to a concrete Rust-side type, surfacing a `TypeMismatch`
    /// error at `location` if the tag doesn't match.
    pub fn as_int(&self, location: Location) -> Result<i64, CadenceError> {
        match &self.data {
            Data::Int(v) | Data::Long(v) => Ok(*v),
            _ => Err(Self::mismatch(location, "Int", &self.ty)),
        }
    }

    pub fn as_double(&self, location: Location) -> Result<f64, CadenceError> {
        match &self.data {
            Data::Double(v) => Ok(*v),
            Data::Float(v) => Ok(*v as f64),
            Data::Int(v) | Data::Long(v) => Ok(*v as f64),
            _ => Err(Self::mismatch(location, "Double", &self.ty)),
        }
    }

    pub fn as_bool(&self, location: Location) -> Result<bool, CadenceError> {
        match &self.data {
            Data::Bool(v) => Ok(*v),
            _ => Err(Self::mismatch(location, "Bool", &self.ty)),
        }
    }

    pub fn as_str(&self, location: Location) -> Result<&str, CadenceError> {
        match &self.data {
            Data::Str(v) => Ok(v.as_str()),
            Data::Note(v) => Ok(v.as_str()),
            _ => Err(Self::mismatch(location, "String", &self.ty)),
        }
    }

    pub fn as_sequence(&self, location: Location) -> Result<&SequenceData, CadenceError> {
        match &self.data {
            Data::Sequence(s) => Ok(s),
            _ => Err(Self::mismatch(location, "Sequence", &self.ty)),
        }
    }

    pub fn as_chord(&self, location: Location) -> Result<&ChordData, CadenceError> {
        match &self.data {
            Data::Chord(c) => Ok(c),
            _ => Err(Self::mismatch(location, "Chord", &self.ty)),
        }
    }

    pub fn as_song(&self, location: Location) -> Result<&SongData, CadenceError> {
        match &self.data {
            Data::Song(s) => Ok(s),
            _ => Err(Self::mismatch(location, "Song", &self.ty)),
        }
    }

    pub fn as_semitone(&self, location: Location) -> Result<i32, CadenceError> {
        match &self.data {
            Data::Semitone(v) => Ok(*v),
            _ => Err(Self::mismatch(location, "Semitone", &self.ty)),
        }
    }

    fn mismatch(location: Location, expected: &str, actual: &Type) -> CadenceError {
        CadenceError::TypeMismatch {
            location,
            message: format!("expected {expected}, found {actual}"),
        }
    }

    /// Strict equality: same type tag and equal content.
    pub fn eq_strict(&self, other: &Value) -> bool {
        self.ty == other.ty && self.data == other.data
    }

    /// Loose equality: additionally promotes numeric types to a common
    /// widest representation before comparing.
    pub fn eq_loose(&self, other: &Value, location: Location) -> Result<bool, CadenceError> {
        if self.eq_strict(other) {
            return Ok(true);
        }
        if self.ty.is_convertible(&Type::Number) || self.ty.is_convertible(&Type::Double) {
            if let (Ok(a), Ok(b)) = (self.as_double(location), other.as_double(location)) {
                return Ok((a - b).abs() < f64::EPSILON);
            }
        }
        Ok(false)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Data::Void => write!(f, "void"),
            Data::Int(v) | Data::Long(v) => write!(f, "{v}"),
            Data::Float(v) => write!(f, "{v}"),
            Data::Double(v) => write!(f, "{v}"),
            Data::Number(v) => write!(f, "{v}"),
            Data::Bool(v) => write!(f, "{v}"),
            Data::Str(v) => write!(f, "{v}"),
            Data::Function(_) => write!(f, "<function>"),
            Data::LazyValue(_) => write!(f, "<lazy>"),
            Data::Buffer(b) => write!(f, "<buffer {} frames>", b.frames),
            Data::Note(n) => write!(f, "{n}"),
            Data::MusicalNote(n) => write!(f, "{}{}", n.name, n.octave),
            Data::NoteValue(d) => write!(f, "{d:?}"),
            Data::Semitone(v) => write!(f, "{v}st"),
            Data::Cent(v) => write!(f, "{v}c"),
            Data::Millisecond(v) => write!(f, "{v}ms"),
            Data::Second(v) => write!(f, "{v}s"),
            Data::Decibel(v) => write!(f, "{v}dB"),
            Data::TimeSignature(t) => write!(f, "{}/{}", t.numerator, t.denominator),
            Data::Beat(v) => write!(f, "{v}beat"),
            Data::Bar(_) => write!(f, "<bar>"),
            Data::Sequence(s) => write!(f, "<sequence {} bars>", s.bars.len()),
            Data::Chord(c) => write!(f, "{}{}", c.root, c.quality),
            Data::Section(s) => write!(f, "<section {}>", s.name),
            Data::Song(_) => write!(f, "<song>"),
            Data::Voice(_) => write!(f, "<voice>"),
            Data::Envelope(_) => write!(f, "<envelope>"),
            Data::OscillatorState(_) => write!(f, "<oscillator>"),
            Data::Track(t) => write!(f, "<track {} voices>", t.voices.len()),
            Data::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
