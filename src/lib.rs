//! # Cadence
//!
//! A small interpreted language for describing musical composition —
//! pitches, chords, roman-numeral harmony, rhythmic note streams, and
//! transform pipelines — that renders to audio via pluggable
//! synthesizer and backend traits.
//!
//! ## Pipeline
//!
//! ```text
//! source → Lexer → Parser → Evaluator → (Value, Diagnostics)
//!                                 │
//!                     note-stream compiler, chord/scale library,
//!                     built-in registry, RNG pair, DSP effects,
//!                     synthesizer + audio backend, song renderer
//! ```
//!
//! 1. **Lexer** ([`lexer`]) — source text to a located token stream.
//! 2. **Parser** ([`parser`]) — tokens to a [`Program`](ast::Program).
//! 3. **Evaluator** ([`evaluator`]) — tree-walking execution, backed by
//!    [`context`] (frames/scoping), [`registry`] (overload-resolved
//!    built-ins), [`stdlib`] (the built-in implementations themselves),
//!    [`compiler`] (note-stream to [`value::SequenceData`]), [`chord`]
//!    (chord/scale theory), and [`rng`] (the free/seedable RNG pair).
//! 4. **Audio** — [`synth`] renders notes to samples, [`dsp`] provides
//!    filter/delay/compressor/reverb effects, [`render`] mixes
//!    sequences/sections/songs into a timeline, and [`audio`] is the
//!    pluggable output backend.
//!
//! ## Quick start
//!
//! ```rust
//! use cadence::evaluate;
//!
//! let source = "use \"@std\"\nSequence s = | C4 D4 E4 F4 |\n";
//! let (value, diagnostics) = evaluate(source, "example.cad");
//! assert!(!diagnostics.has_errors());
//! let _ = value;
//! ```

pub mod ast;
pub mod audio;
pub mod chord;
pub mod compiler;
pub mod context;
pub mod dsp;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod render;
pub mod rng;
pub mod stdlib;
pub mod synth;
pub mod types;
pub mod value;

pub use error::{CadenceError, CadenceResult, Diagnostic, Diagnostics, Location, Severity};
pub use evaluator::EvalCtx;
pub use value::Value;

/// Lexes and parses `source`, returning the top-level [`ast::Program`].
/// Used directly by tooling that only needs the AST (an editor's
/// outline view, a formatter); [`evaluate`] is the entry point for
/// running a program.
pub fn parse(source: &str, _file: &str) -> CadenceResult<ast::Program> {
    let tokens = lexer::Lexer::new(source).tokenize()?;
    parser::Parser::new(tokens).parse_program()
}

/// Parses and runs `source` to completion, in the spirit of the
/// evaluator's local-degradation philosophy: a lex/parse failure is the
/// only way this returns early (as a single `Error`-severity
/// diagnostic with a void result); once evaluation starts, every
/// top-level statement runs even if earlier ones failed, so the
/// returned [`Diagnostics`] collects the full picture of what went
/// wrong in one pass.
pub fn evaluate(source: &str, file: &str) -> (Value, Diagnostics) {
    let mut ctx = EvalCtx::new(file);
    let program = match lexer::Lexer::new(source).tokenize().and_then(|tokens| parser::Parser::new(tokens).parse_program()) {
        Ok(program) => program,
        Err(err) => {
            ctx.diagnostics.record_error(&err);
            return (Value::void(), ctx.diagnostics);
        }
    };
    let value = ctx.run_program(&program);
    (value, ctx.diagnostics)
}
