//! # Parser
//!
//! Recursive-descent, one-token lookahead over the lexer's flat token
//! list. Statements that start with an identifier are ambiguous between
//! a typed declaration, a re-assignment, and a bare expression until
//! enough tokens are seen, so those three forms are tried speculatively
//! via [`Parser::try_parse`], which rewinds on failure instead of
//! requiring unbounded lookahead.

use crate::ast::*;
use crate::error::{CadenceError, CadenceResult, Location};
use crate::lexer::{LocatedToken, Token};

pub struct Parser {
    tokens: Vec<LocatedToken>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<LocatedToken>) -> Self {
        Self { tokens, position: 0 }
    }

    pub fn parse_program(&mut self) -> CadenceResult<Program> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while self.current_token() != Token::Eof {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Program { statements })
    }

    // -- token-stream primitives --------------------------------------

    fn current_token(&self) -> Token {
        self.tokens.get(self.position).map(|t| t.token.clone()).unwrap_or(Token::Eof)
    }

    fn peek(&self, offset: usize) -> Token {
        self.tokens.get(self.position + offset).map(|t| t.token.clone()).unwrap_or(Token::Eof)
    }

    fn loc(&self) -> Location {
        self.tokens.get(self.position).map(|t| t.location).unwrap_or_else(|| {
            self.tokens.last().map(|t| t.location).unwrap_or_default()
        })
    }

    fn advance(&mut self) -> Token {
        let tok = self.current_token();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        tok
    }

    fn skip_newlines(&mut self) {
        while self.current_token() == Token::Newline {
            self.advance();
        }
    }

    fn expect(&mut self, expected: Token) -> CadenceResult<()> {
        if self.current_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err(self.loc(), format!("expected {expected:?}, found {:?}", self.current_token())))
        }
    }

    fn expect_identifier(&mut self) -> CadenceResult<String> {
        let location = self.loc();
        match self.advance() {
            Token::Identifier(s) => Ok(s),
            other => Err(self.err(location, format!("expected identifier, found {other:?}"))),
        }
    }

    fn expect_int(&mut self) -> CadenceResult<i64> {
        let location = self.loc();
        match self.advance() {
            Token::Int(v) => Ok(v),
            other => Err(self.err(location, format!("expected integer, found {other:?}"))),
        }
    }

    fn expect_string(&mut self) -> CadenceResult<String> {
        let location = self.loc();
        match self.advance() {
            Token::Str(v) => Ok(v),
            other => Err(self.err(location, format!("expected string, found {other:?}"))),
        }
    }

    fn expect_number(&mut self) -> CadenceResult<f64> {
        let location = self.loc();
        match self.advance() {
            Token::Int(v) => Ok(v as f64),
            Token::Float(v) => Ok(v),
            other => Err(self.err(location, format!("expected a number, found {other:?}"))),
        }
    }

    fn err(&self, location: Location, message: String) -> CadenceError {
        CadenceError::Parse { location, message }
    }

    /// Runs `f` against this parser; on failure, rewinds to the position
    /// before the attempt so the caller can try a different production.
    fn try_parse<T>(&mut self, f: impl FnOnce(&mut Self) -> CadenceResult<T>) -> Option<T> {
        let saved = self.position;
        match f(self) {
            Ok(v) => Some(v),
            Err(_) => {
                self.position = saved;
                None
            }
        }
    }

    // -- statements -----------------------------------------------------

    fn parse_statement(&mut self) -> CadenceResult<Statement> {
        match self.current_token() {
            Token::Keyword(kw) if kw == "use" => self.parse_use(),
            Token::Keyword(kw) if kw == "internal" || kw == "proc" => self.parse_proc_def(),
            Token::Keyword(kw) if kw == "return" => self.parse_return(),
            Token::Keyword(kw) if kw == "timesig" => self.parse_timesig_block(),
            Token::Keyword(kw) if kw == "tempo" => self.parse_expr_context_block(ContextSet::Tempo),
            Token::Keyword(kw) if kw == "swing" => self.parse_expr_context_block(ContextSet::Swing),
            Token::Keyword(kw) if kw == "key" => self.parse_key_block(),
            Token::Keyword(kw) if kw == "dynamics" => self.parse_dynamics_block(),
            Token::Keyword(kw) if kw == "section" => self.parse_section(),
            Token::Identifier(name) if name == "velocity" => {
                if let Some(stmt) = self.try_parse(Self::parse_velocity_block) {
                    return Ok(stmt);
                }
                self.parse_binding_or_expression()
            }
            _ => self.parse_binding_or_expression(),
        }
    }

    /// A statement starting with an identifier is a declaration, a
    /// re-assignment, or just an expression — which one only becomes
    /// clear after seeing the `=`, so each form is tried in turn.
    fn parse_binding_or_expression(&mut self) -> CadenceResult<Statement> {
        if let Some(decl) = self.try_parse(Self::parse_declaration) {
            return Ok(decl);
        }
        if let Some(assign) = self.try_parse(Self::parse_assignment) {
            return Ok(assign);
        }
        Ok(Statement::Expression(self.parse_expression()?))
    }

    fn parse_use(&mut self) -> CadenceResult<Statement> {
        let location = self.loc();
        self.advance(); // use
        let path = self.expect_string()?;
        Ok(Statement::Use { path, location })
    }

    fn parse_return(&mut self) -> CadenceResult<Statement> {
        let location = self.loc();
        self.advance(); // return
        if matches!(self.current_token(), Token::Newline | Token::Eof | Token::RBrace) {
            return Ok(Statement::Return { value: None, location });
        }
        let value = self.parse_expression()?;
        Ok(Statement::Return { value: Some(value), location })
    }

    fn parse_proc_def(&mut self) -> CadenceResult<Statement> {
        let location = self.loc();
        if self.current_token() == Token::Keyword("internal".to_string()) {
            self.advance();
        }
        self.expect(Token::Keyword("proc".to_string()))?;
        let name = self.expect_identifier()?;
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if self.current_token() != Token::RParen {
            loop {
                let type_name = self.parse_type_name()?;
                self.expect(Token::Colon)?;
                let param_name = self.expect_identifier()?;
                params.push((type_name, param_name));
                if self.current_token() == Token::Comma {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(Token::RParen)?;
        self.skip_newlines();
        let mut body = Vec::new();
        while self.current_token() != Token::Keyword("end".to_string()) {
            body.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.advance(); // end
        self.expect(Token::Keyword("proc".to_string()))?;
        Ok(Statement::ProcDef { name, params, body, location })
    }

    fn parse_brace_block(&mut self) -> CadenceResult<Vec<Statement>> {
        self.expect(Token::LBrace)?;
        self.skip_newlines();
        let mut body = Vec::new();
        while self.current_token() != Token::RBrace {
            body.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.expect(Token::RBrace)?;
        Ok(body)
    }

    fn parse_timesig_block(&mut self) -> CadenceResult<Statement> {
        let location = self.loc();
        self.advance(); // timesig
        let numerator = self.expect_int()? as u32;
        self.expect(Token::Slash)?;
        let denominator = self.expect_int()? as u32;
        let body = self.parse_brace_block()?;
        Ok(Statement::ContextBlock { context: ContextSet::TimeSignature { numerator, denominator }, body, location })
    }

    fn parse_expr_context_block(&mut self, make: impl FnOnce(Expression) -> ContextSet) -> CadenceResult<Statement> {
        let location = self.loc();
        self.advance(); // tempo | swing
        let expr = self.parse_expression()?;
        let body = self.parse_brace_block()?;
        Ok(Statement::ContextBlock { context: make(expr), body, location })
    }

    fn parse_key_block(&mut self) -> CadenceResult<Statement> {
        let location = self.loc();
        self.advance(); // key
        let key_name = self.expect_identifier()?;
        let body = self.parse_brace_block()?;
        Ok(Statement::ContextBlock { context: ContextSet::Key(key_name), body, location })
    }

    fn parse_dynamics_block(&mut self) -> CadenceResult<Statement> {
        let location = self.loc();
        self.advance(); // dynamics
        let name = self.expect_identifier()?;
        let body = self.parse_brace_block()?;
        Ok(Statement::ContextBlock { context: ContextSet::Dynamics(name), body, location })
    }

    /// `velocity` is not a reserved word (unlike the other context-block
    /// headers) so ordinary variables may still be named `velocity`;
    /// this production is only ever attempted speculatively.
    fn parse_velocity_block(&mut self) -> CadenceResult<Statement> {
        let location = self.loc();
        match self.advance() {
            Token::Identifier(name) if name == "velocity" => {}
            other => return Err(self.err(location, format!("expected 'velocity', found {other:?}"))),
        }
        let expr = self.parse_expression()?;
        let body = self.parse_brace_block()?;
        Ok(Statement::ContextBlock { context: ContextSet::Velocity(expr), body, location })
    }

    fn parse_section(&mut self) -> CadenceResult<Statement> {
        let location = self.loc();
        self.advance(); // section
        let name = self.expect_identifier()?;
        let body = self.parse_brace_block()?;
        Ok(Statement::Section { name, body, location })
    }

    fn parse_declaration(&mut self) -> CadenceResult<Statement> {
        let location = self.loc();
        let type_name = self.parse_type_name()?;
        let name = self.expect_identifier()?;
        self.expect(Token::Equals)?;
        let value = self.parse_expression()?;
        Ok(Statement::Declaration { type_name: Some(type_name), name, value, location })
    }

    fn parse_assignment(&mut self) -> CadenceResult<Statement> {
        let location = self.loc();
        let name = self.expect_identifier()?;
        self.expect(Token::Equals)?;
        let value = self.parse_expression()?;
        Ok(Statement::Assignment { name, value, location })
    }

    /// `Ident` or `Ident<Ident>` (one level of generic nesting is enough
    /// for `Array<T>`/`Lazy<T>`, but the recursion handles deeper nesting
    /// for free).
    fn parse_type_name(&mut self) -> CadenceResult<String> {
        let base = self.expect_identifier()?;
        if self.current_token() == Token::LAngle {
            self.advance();
            let inner = self.parse_type_name()?;
            self.expect(Token::RAngle)?;
            Ok(format!("{base}<{inner}>"))
        } else {
            Ok(base)
        }
    }

    // -- expressions ------------------------------------------------------

    pub fn parse_expression(&mut self) -> CadenceResult<Expression> {
        let mut expr = self.parse_atom()?;
        while self.current_token() == Token::Arrow {
            let location = self.loc();
            self.advance(); // ->
            let func = self.expect_identifier()?;
            let mut args = Vec::new();
            while self.at_atom_start() {
                args.push(self.parse_atom()?);
            }
            expr = Expression::Pipeline { receiver: Box::new(expr), func, args, location };
        }
        Ok(expr)
    }

    fn at_atom_start(&self) -> bool {
        match self.current_token() {
            Token::Int(_) | Token::Float(_) | Token::Bool(_) | Token::Str(_) | Token::Semitone(_)
            | Token::Cent(_) | Token::Millisecond(_) | Token::Second(_) | Token::Decibel(_)
            | Token::Identifier(_) | Token::LParen | Token::LBracket | Token::Pipe => true,
            Token::Keyword(kw) => kw == "fn" || kw == "true" || kw == "false",
            _ => false,
        }
    }

    /// A non-pipeline expression: the unit call arguments and array
    /// elements are built from (prefix calls, array/lambda/note-stream
    /// literals don't themselves chain further without parentheses).
    fn parse_atom(&mut self) -> CadenceResult<Expression> {
        let location = self.loc();
        match self.current_token() {
            Token::Int(v) => {
                self.advance();
                Ok(Expression::Literal(Literal::Int(v), location))
            }
            Token::Float(v) => {
                self.advance();
                Ok(Expression::Literal(Literal::Double(v), location))
            }
            Token::Bool(v) => {
                self.advance();
                Ok(Expression::Literal(Literal::Bool(v), location))
            }
            Token::Str(v) => {
                self.advance();
                Ok(Expression::Literal(Literal::Str(v), location))
            }
            Token::Semitone(v) => {
                self.advance();
                Ok(Expression::Literal(Literal::Semitone(v), location))
            }
            Token::Cent(v) => {
                self.advance();
                Ok(Expression::Literal(Literal::Cent(v), location))
            }
            Token::Millisecond(v) => {
                self.advance();
                Ok(Expression::Literal(Literal::Millisecond(v), location))
            }
            Token::Second(v) => {
                self.advance();
                Ok(Expression::Literal(Literal::Second(v), location))
            }
            Token::Decibel(v) => {
                self.advance();
                Ok(Expression::Literal(Literal::Decibel(v), location))
            }
            Token::Keyword(kw) if kw == "true" => {
                self.advance();
                Ok(Expression::Literal(Literal::Bool(true), location))
            }
            Token::Keyword(kw) if kw == "false" => {
                self.advance();
                Ok(Expression::Literal(Literal::Bool(false), location))
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(Expression::Identifier(name, location))
            }
            Token::LParen => self.parse_call(),
            Token::LBracket => self.parse_array_literal(),
            Token::Keyword(kw) if kw == "fn" => self.parse_lambda(),
            Token::Pipe => Ok(Expression::NoteStream(self.parse_note_stream()?)),
            other => Err(self.err(location, format!("unexpected token {other:?} in expression"))),
        }
    }

    /// `( Func arg... )`.
    fn parse_call(&mut self) -> CadenceResult<Expression> {
        let location = self.loc();
        self.advance(); // (
        let name = self.expect_identifier()?;
        let mut args = Vec::new();
        while self.current_token() != Token::RParen {
            args.push(self.parse_atom()?);
        }
        self.expect(Token::RParen)?;
        Ok(Expression::Call { name, args, location })
    }

    fn parse_array_literal(&mut self) -> CadenceResult<Expression> {
        let location = self.loc();
        self.advance(); // [
        let mut elements = Vec::new();
        while self.current_token() != Token::RBracket {
            elements.push(self.parse_atom()?);
        }
        self.expect(Token::RBracket)?;
        Ok(Expression::ArrayLiteral { elements, location })
    }

    /// `fn T1 p1, T2 p2, ... => Expr`.
    fn parse_lambda(&mut self) -> CadenceResult<Expression> {
        let location = self.loc();
        self.advance(); // fn
        let mut params = Vec::new();
        if self.current_token() != Token::FatArrow {
            loop {
                let type_name = self.parse_type_name()?;
                let param_name = self.expect_identifier()?;
                params.push((type_name, param_name));
                if self.current_token() == Token::Comma {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(Token::FatArrow)?;
        let body = self.parse_expression()?;
        Ok(Expression::Lambda { params, body: Box::new(body), location })
    }

    // -- note streams -----------------------------------------------------

    fn at_stream_element_start(&self) -> bool {
        matches!(
            self.current_token(),
            Token::NoteLiteral { .. }
                | Token::Underscore
                | Token::LBracket
                | Token::ChordLiteral(_)
                | Token::RomanNumeral(_)
                | Token::LParen
                | Token::LAngle
                | Token::Identifier(_)
        )
    }

    /// `| Elem* | Elem* | ... |`. N+1 pipes delimit N bars; the stream
    /// ends at whichever pipe isn't followed by another element.
    pub fn parse_note_stream(&mut self) -> CadenceResult<NoteStreamExpr> {
        let location = self.loc();
        self.expect(Token::Pipe)?;
        let mut bars = Vec::new();
        loop {
            let mut bar = Bar::default();
            while self.current_token() != Token::Pipe {
                if self.current_token() == Token::Eof {
                    return Err(self.err(self.loc(), "unterminated note stream".to_string()));
                }
                bar.elements.push(self.parse_stream_element()?);
            }
            bars.push(bar);
            self.expect(Token::Pipe)?;
            if !self.at_stream_element_start() {
                break;
            }
        }
        Ok(NoteStreamExpr { bars, location })
    }

    fn parse_stream_element(&mut self) -> CadenceResult<StreamElement> {
        let location = self.loc();
        match self.current_token() {
            Token::NoteLiteral { .. } => Ok(StreamElement::Note(self.parse_note()?)),
            Token::Underscore => Ok(StreamElement::Rest(self.parse_rest()?)),
            Token::LBracket => self.parse_bracketed_chord(),
            Token::ChordLiteral(symbol) => {
                self.advance();
                let (duration, dotted) = self.parse_duration_and_dot();
                Ok(StreamElement::NamedChord { symbol, duration, dotted })
            }
            Token::RomanNumeral(numeral) => {
                self.advance();
                let (duration, dotted) = self.parse_duration_and_dot();
                Ok(StreamElement::RomanNumeral { numeral, duration, dotted })
            }
            Token::LParen => {
                if matches!(self.peek(1), Token::Question | Token::DoubleQuestion) {
                    self.parse_random()
                } else {
                    self.parse_ghost()
                }
            }
            Token::LAngle => self.parse_grace(),
            Token::Identifier(name) => {
                self.advance();
                Ok(StreamElement::Variable(name))
            }
            other => Err(self.err(location, format!("expected a note-stream element, found {other:?}"))),
        }
    }

    fn parse_duration_and_dot(&mut self) -> (Option<DurationSuffix>, bool) {
        let mut duration = None;
        if let Token::DurationSuffix(c) = self.current_token() {
            duration = DurationSuffix::from_suffix_char(c);
            self.advance();
        }
        let mut dotted = false;
        if self.current_token() == Token::Dot {
            dotted = true;
            self.advance();
        }
        (duration, dotted)
    }

    fn parse_note(&mut self) -> CadenceResult<NoteLit> {
        let location = self.loc();
        let (name, octave, alteration, cent_offset) = match self.advance() {
            Token::NoteLiteral { name, octave, alteration, cent_offset } => (name, octave, alteration, cent_offset),
            other => return Err(self.err(location, format!("expected note literal, found {other:?}"))),
        };
        let (duration, dotted) = self.parse_duration_and_dot();
        let tied = if self.current_token() == Token::Tilde {
            self.advance();
            true
        } else {
            false
        };
        let articulation = match self.current_token() {
            Token::Bang => {
                self.advance();
                Articulation::Accent
            }
            Token::BangBang => {
                self.advance();
                Articulation::Marcato
            }
            Token::BangBangBang => {
                self.advance();
                Articulation::Sforzando
            }
            _ => Articulation::None,
        };
        Ok(NoteLit {
            name,
            octave: octave.map(|o| o as u8),
            octave_alteration: alteration,
            duration,
            dotted,
            tied,
            cent_offset,
            articulation,
            velocity: None,
        })
    }

    fn parse_rest(&mut self) -> CadenceResult<RestLit> {
        let location = self.loc();
        match self.advance() {
            Token::Underscore => {}
            other => return Err(self.err(location, format!("expected rest, found {other:?}"))),
        }
        let (duration, dotted) = self.parse_duration_and_dot();
        Ok(RestLit { duration, dotted })
    }

    fn parse_bracketed_chord(&mut self) -> CadenceResult<StreamElement> {
        self.advance(); // [
        let mut notes = Vec::new();
        while self.current_token() != Token::RBracket {
            let location = self.loc();
            match self.advance() {
                Token::NoteLiteral { name, octave, alteration, cent_offset } => {
                    notes.push(NoteLit {
                        name,
                        octave: octave.map(|o| o as u8),
                        octave_alteration: alteration,
                        duration: None,
                        dotted: false,
                        tied: false,
                        cent_offset,
                        articulation: Articulation::None,
                        velocity: None,
                    });
                }
                other => return Err(self.err(location, format!("expected note inside chord bracket, found {other:?}"))),
            }
        }
        self.expect(Token::RBracket)?;
        let (duration, dotted) = self.parse_duration_and_dot();
        Ok(StreamElement::BracketedChord { notes, duration, dotted })
    }

    /// `( ? a b c )` / `( ?? a b c )`, choices optionally weighted with
    /// `choice:weight`.
    fn parse_random(&mut self) -> CadenceResult<StreamElement> {
        let location = self.loc();
        self.advance(); // (
        let seeded = match self.advance() {
            Token::Question => false,
            Token::DoubleQuestion => true,
            other => return Err(self.err(location, format!("expected ? or ??, found {other:?}"))),
        };
        let mut choices = Vec::new();
        while self.current_token() != Token::RParen {
            let elem = self.parse_stream_element()?;
            let weight = if self.current_token() == Token::Colon {
                self.advance();
                Some(self.expect_number()?)
            } else {
                None
            };
            choices.push((Box::new(elem), weight));
        }
        self.expect(Token::RParen)?;
        Ok(StreamElement::Random { choices, seeded })
    }

    fn parse_ghost(&mut self) -> CadenceResult<StreamElement> {
        self.advance(); // (
        let elem = self.parse_stream_element()?;
        self.expect(Token::RParen)?;
        Ok(StreamElement::Ghost(Box::new(elem)))
    }

    fn parse_grace(&mut self) -> CadenceResult<StreamElement> {
        self.advance(); // <
        let elem = self.parse_stream_element()?;
        self.expect(Token::RAngle)?;
        Ok(StreamElement::Grace(Box::new(elem)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> Program {
        let tokens = Lexer::new(src).tokenize().expect("lex");
        Parser::new(tokens).parse_program().expect("parse")
    }

    #[test]
    fn declaration_with_type_name() {
        let program = parse("Int x = 4\n");
        match &program.statements[0] {
            Statement::Declaration { type_name, name, .. } => {
                assert_eq!(type_name.as_deref(), Some("Int"));
                assert_eq!(name, "x");
            }
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn plain_assignment() {
        let program = parse("x = 4\n");
        assert!(matches!(&program.statements[0], Statement::Assignment { name, .. } if name == "x"));
    }

    #[test]
    fn generic_type_declaration() {
        let program = parse("Array<Int> xs = [1 2 3]\n");
        match &program.statements[0] {
            Statement::Declaration { type_name, value, .. } => {
                assert_eq!(type_name.as_deref(), Some("Array<Int>"));
                assert!(matches!(value, Expression::ArrayLiteral { elements, .. } if elements.len() == 3));
            }
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn prefix_call_and_pipeline() {
        let program = parse("y = x -> transpose 2st\n");
        match &program.statements[0] {
            Statement::Assignment { value: Expression::Pipeline { func, args, .. }, .. } => {
                assert_eq!(func, "transpose");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected pipeline assignment, got {other:?}"),
        }
    }

    #[test]
    fn note_stream_two_bars() {
        let program = parse("s = | C4 D4 E4 F4 | G4 A4 B4 C5 |\n");
        match &program.statements[0] {
            Statement::Assignment { value: Expression::NoteStream(ns), .. } => {
                assert_eq!(ns.bars.len(), 2);
                assert_eq!(ns.bars[0].elements.len(), 4);
            }
            other => panic!("expected note-stream assignment, got {other:?}"),
        }
    }

    #[test]
    fn proc_def_with_params_and_return() {
        let program = parse("proc Double (Int: n) return n end proc\n");
        match &program.statements[0] {
            Statement::ProcDef { name, params, body, .. } => {
                assert_eq!(name, "Double");
                assert_eq!(params, &vec![("Int".to_string(), "n".to_string())]);
                assert!(matches!(body[0], Statement::Return { .. }));
            }
            other => panic!("expected proc def, got {other:?}"),
        }
    }

    #[test]
    fn context_block_and_section() {
        let program = parse("timesig 3/4 {\n  x = 1\n}\nsection Verse {\n  y = 2\n}\n");
        assert!(matches!(
            &program.statements[0],
            Statement::ContextBlock { context: ContextSet::TimeSignature { numerator: 3, denominator: 4 }, .. }
        ));
        assert!(matches!(&program.statements[1], Statement::Section { name, .. } if name == "Verse"));
    }

    #[test]
    fn lambda_literal() {
        let program = parse("f = fn Int n => n\n");
        match &program.statements[0] {
            Statement::Assignment { value: Expression::Lambda { params, .. }, .. } => {
                assert_eq!(params, &vec![("Int".to_string(), "n".to_string())]);
            }
            other => panic!("expected lambda assignment, got {other:?}"),
        }
    }

    #[test]
    fn random_choice_with_weights() {
        let program = parse("s = | ( ? C4 D4:2 ) |\n");
        match &program.statements[0] {
            Statement::Assignment { value: Expression::NoteStream(ns), .. } => {
                match &ns.bars[0].elements[0] {
                    StreamElement::Random { choices, seeded } => {
                        assert!(!seeded);
                        assert_eq!(choices.len(), 2);
                        assert_eq!(choices[1].1, Some(2.0));
                    }
                    other => panic!("expected random element, got {other:?}"),
                }
            }
            other => panic!("expected note-stream assignment, got {other:?}"),
        }
    }

    #[test]
    fn ghost_and_grace_notes() {
        let program = parse("s = | (C4) <D4> |\n");
        match &program.statements[0] {
            Statement::Assignment { value: Expression::NoteStream(ns), .. } => {
                assert!(matches!(ns.bars[0].elements[0], StreamElement::Ghost(_)));
                assert!(matches!(ns.bars[0].elements[1], StreamElement::Grace(_)));
            }
            other => panic!("expected note-stream assignment, got {other:?}"),
        }
    }
}
