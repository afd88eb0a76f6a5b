//! # Abstract Syntax Tree (AST) Types
//!
//! Two tagged-variant trees, per the language's grammar: [`Statement`] and
//! [`Expression`]. Every node carries a [`Location`] so the evaluator can
//! report errors at the offending source position. A note-stream
//! expression owns an ordered list of [`Bar`]s; each bar owns an ordered
//! list of [`StreamElement`]s.
//!
//! Small leaf enums (duration, articulation) follow the same
//! `#[derive(Copy, Clone)]` style used throughout this crate for closed,
//! cheap-to-pass value sets.

use crate::error::Location;

/// A full program: an ordered list of top-level statements.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum Statement {
    /// `TypeName Ident = Expr` — declares `Ident` with an explicit type
    /// annotation used only for a friendlier type-mismatch message; the
    /// evaluator still infers the real type from `value`.
    Declaration {
        type_name: Option<String>,
        name: String,
        value: Expression,
        location: Location,
    },
    /// `Ident = Expr` re-assigning an existing binding.
    Assignment {
        name: String,
        value: Expression,
        location: Location,
    },
    /// A bare expression evaluated for its side effects (e.g. `print(x)`).
    Expression(Expression),
    /// `return Expr` (or bare `return`).
    Return {
        value: Option<Expression>,
        location: Location,
    },
    /// `use "<path>"` — loads `@std`/`@audio` builtin modules or another
    /// source file's top-level statements.
    Use { path: String, location: Location },
    /// `proc Name (Type: param, ...) ... end proc`.
    ProcDef {
        name: String,
        params: Vec<(String, String)>,
        body: Vec<Statement>,
        location: Location,
    },
    /// `timesig N/M { ... }` | `tempo Expr { ... }` | `swing Expr { ... }` |
    /// `key Ident { ... }` — a scoped musical-context block.
    ContextBlock {
        context: ContextSet,
        body: Vec<Statement>,
        location: Location,
    },
    /// `section Ident { ... }` — a named bundle of sequences.
    Section {
        name: String,
        body: Vec<Statement>,
        location: Location,
    },
}

/// The partial musical-context update carried by one `ContextBlock`.
/// Only one field is ever set per block; nested blocks compose them.
#[derive(Debug, Clone)]
pub enum ContextSet {
    TimeSignature { numerator: u32, denominator: u32 },
    Tempo(Expression),
    Swing(Expression),
    Key(String),
    Velocity(Expression),
    Dynamics(String),
}

#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Literal, Location),
    Identifier(String, Location),
    /// `( Func arg... )` prefix call.
    Call {
        name: String,
        args: Vec<Expression>,
        location: Location,
    },
    /// `expr -> fn arg...`; desugars to `fn(expr, arg...)` at evaluation
    /// time but is kept as its own node so the flow operator's left-to-right
    /// chaining is visible in the tree.
    Pipeline {
        receiver: Box<Expression>,
        func: String,
        args: Vec<Expression>,
        location: Location,
    },
    ArrayLiteral {
        elements: Vec<Expression>,
        location: Location,
    },
    /// `fn T1 p1, T2 p2, ... => Expr`.
    Lambda {
        params: Vec<(String, String)>,
        body: Box<Expression>,
        location: Location,
    },
    NoteStream(NoteStreamExpr),
}

impl Expression {
    pub fn location(&self) -> Location {
        match self {
            Expression::Literal(_, loc) => *loc,
            Expression::Identifier(_, loc) => *loc,
            Expression::Call { location, .. } => *location,
            Expression::Pipeline { location, .. } => *location,
            Expression::ArrayLiteral { location, .. } => *location,
            Expression::Lambda { location, .. } => *location,
            Expression::NoteStream(ns) => ns.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Long(i64),
    Float(f32),
    Double(f64),
    Number(String), // arbitrary-precision integer, kept as decimal text
    Bool(bool),
    Str(String),
    Semitone(i32),
    Cent(f64),
    Millisecond(f64),
    Second(f64),
    Decibel(f64),
}

/// `| Elem* | Elem* | ... |`
#[derive(Debug, Clone)]
pub struct NoteStreamExpr {
    pub bars: Vec<Bar>,
    pub location: Location,
}

#[derive(Debug, Clone, Default)]
pub struct Bar {
    pub elements: Vec<StreamElement>,
}

#[derive(Debug, Clone)]
pub enum StreamElement {
    Note(NoteLit),
    Rest(RestLit),
    /// `[ Note Note ... ]` bracketed chord.
    BracketedChord {
        notes: Vec<NoteLit>,
        duration: Option<DurationSuffix>,
        dotted: bool,
    },
    /// `Cmaj7` named chord symbol.
    NamedChord {
        symbol: String,
        duration: Option<DurationSuffix>,
        dotted: bool,
    },
    /// `I`, `ii`, `V7`, ... resolved against the active key at compile
    /// time.
    RomanNumeral {
        numeral: String,
        duration: Option<DurationSuffix>,
        dotted: bool,
    },
    /// `( ? a b c )` or `( ?? a b c )`, with optional `a:weight` syntax.
    /// `seeded = true` for `??` (the reset-reproducible RNG stream).
    Random {
        choices: Vec<(Box<StreamElement>, Option<f64>)>,
        seeded: bool,
    },
    /// A bare identifier — looked up at note-stream compile time.
    Variable(String),
    /// `(Note)` — a ghost note (fixed low velocity).
    Ghost(Box<StreamElement>),
    /// `<Note>` — a grace note (fixed 32nd duration, fixed velocity).
    Grace(Box<StreamElement>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Articulation {
    None,
    Accent,
    Marcato,
    Sforzando,
}

#[derive(Debug, Clone)]
pub struct NoteLit {
    pub name: char, // 'A'..'G'
    pub octave: Option<u8>,
    /// Octave alteration suffix: `+`/`++`/`-`/`--` shifts by whole octaves
    /// beyond the written octave digit.
    pub octave_alteration: i32,
    pub duration: Option<DurationSuffix>,
    pub dotted: bool,
    pub tied: bool,
    pub cent_offset: Option<f64>,
    pub articulation: Articulation,
    pub velocity: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RestLit {
    pub duration: Option<DurationSuffix>,
    pub dotted: bool,
}

/// Explicit duration suffix `[whqest]`: whole, half, quarter, eighth,
/// sixteenth, thirty-second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationSuffix {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl DurationSuffix {
    /// Fraction of a whole note.
    pub fn as_fraction(self) -> f64 {
        match self {
            DurationSuffix::Whole => 1.0,
            DurationSuffix::Half => 0.5,
            DurationSuffix::Quarter => 0.25,
            DurationSuffix::Eighth => 0.125,
            DurationSuffix::Sixteenth => 0.0625,
            DurationSuffix::ThirtySecond => 0.03125,
        }
    }

    /// Beats in a time signature whose denominator gives one beat.
    pub fn as_beats(self, denominator: u32) -> f64 {
        self.as_fraction() * denominator as f64
    }

    pub fn from_suffix_char(c: char) -> Option<Self> {
        match c {
            'w' => Some(DurationSuffix::Whole),
            'h' => Some(DurationSuffix::Half),
            'q' => Some(DurationSuffix::Quarter),
            'e' => Some(DurationSuffix::Eighth),
            's' => Some(DurationSuffix::Sixteenth),
            't' => Some(DurationSuffix::ThirtySecond),
            _ => None,
        }
    }

    /// The closest standard note value to a raw beat count, by minimal
    /// absolute fraction distance (used by the note-stream compiler's
    /// auto-fit algorithm).
    pub fn closest(beats: f64, denominator: u32) -> DurationSuffix {
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
                let da = (a.as_beats(denominator) - beats).abs();
                let db = (b.as_beats(denominator) - beats).abs();
                da.partial_cmp(&db).unwrap()
            })
            .unwrap_or(DurationSuffix::Quarter)
    }
}
