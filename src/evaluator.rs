//! # Evaluator
//!
//! Tree-walking, single-threaded: statements run in order against a
//! frame stack, expressions fold to a [`Value`], and control flow
//! (blocks, contexts, procedures, lambdas) is ordinary recursion.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{ContextSet, Expression, Literal, Program, Statement};
use crate::audio::{AudioBackend, NullBackend};
use crate::compiler::compile_note_stream;
use crate::context::{Frame, MusicalContext, Stack};
use crate::error::{CadenceError, CadenceResult, Diagnostics, Location};
use crate::registry::Registry;
use crate::rng::RngPair;
use crate::stdlib;
use crate::types::Type;
use crate::value::{Callable, Data, Lambda, Proc, SectionData, SongData, Thunk, Value};

/// Mutable evaluation state threaded through every statement/expression,
/// and into built-in implementations via [`crate::registry::BuiltinFn`].
pub struct EvalCtx {
    pub stack: Stack,
    pub rng: RngPair,
    pub diagnostics: Diagnostics,
    pub registry: Rc<Registry>,
    pub sections: HashMap<String, SectionData>,
    pub audio: Box<dyn AudioBackend>,
    pub sample_rate: u32,
    pub file: String,
}

enum Flow {
    Normal(Value),
    Return(Value),
}

impl EvalCtx {
    pub fn new(file: impl Into<String>) -> Self {
        let file = file.into();
        let mut registry = Registry::new();
        stdlib::register_core(&mut registry);
        Self {
            stack: Stack::new(),
            rng: RngPair::new(),
            diagnostics: Diagnostics::new(file.clone()),
            registry: Rc::new(registry),
            sections: HashMap::new(),
            audio: Box::new(NullBackend::default()),
            sample_rate: 44_100,
            file,
        }
    }

    /// Runs every top-level statement, continuing past recoverable
    /// statement-level errors so later statements still get a chance to
    /// run and contribute diagnostics.
    pub fn run_program(&mut self, program: &Program) -> Value {
        let mut last = Value::void();
        for stmt in &program.statements {
            match self.exec_statement(stmt) {
                Ok(Flow::Normal(v)) => last = v,
                Ok(Flow::Return(v)) => last = v,
                Err(err) => self.diagnostics.record_error(&err),
            }
        }
        last
    }

    fn exec_block(&mut self, body: &[Statement]) -> CadenceResult<Flow> {
        let mut last = Value::void();
        for stmt in body {
            match self.exec_statement(stmt)? {
                Flow::Normal(v) => last = v,
                Flow::Return(v) => return Ok(Flow::Return(v)),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn exec_statement(&mut self, stmt: &Statement) -> CadenceResult<Flow> {
        match stmt {
            Statement::Declaration { type_name, name, value, location } => {
                let v = self.eval(value)?;
                if let Some(tn) = type_name {
                    if let Some(expected) = Type::from_name(tn) {
                        if !v.ty.is_convertible(&expected) {
                            return Err(CadenceError::TypeMismatch {
                                location: *location,
                                message: format!("cannot assign {} to declared type {tn}", v.ty),
                            });
                        }
                    }
                }
                self.stack.declare(name.clone(), v.clone());
                Ok(Flow::Normal(v))
            }
            Statement::Assignment { name, value, location } => {
                let v = self.eval(value)?;
                self.stack.assign(name, v.clone(), *location)?;
                Ok(Flow::Normal(v))
            }
            Statement::Expression(expr) => Ok(Flow::Normal(self.eval(expr)?)),
            Statement::Return { value, .. } => {
                let v = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::void(),
                };
                Ok(Flow::Return(v))
            }
            Statement::Use { path, location } => {
                self.exec_use(path, *location)?;
                Ok(Flow::Normal(Value::void()))
            }
            Statement::ProcDef { name, params, body, .. } => {
                let typed_params = params
                    .iter()
                    .map(|(t, n)| (n.clone(), Type::from_name(t).unwrap_or(Type::Void)))
                    .collect();
                let proc = Proc {
                    name: name.clone(),
                    params: typed_params,
                    body: Rc::new(body.clone()),
                };
                self.stack.declare(
                    name.clone(),
                    Value::new(Data::Function(Callable::Proc(proc)), Type::Function),
                );
                Ok(Flow::Normal(Value::void()))
            }
            Statement::ContextBlock { context, body, location } => {
                let set = self.eval_context_set(context, *location)?;
                self.stack.push(Frame::with_context(set));
                let result = self.exec_block(body);
                self.stack.pop();
                result
            }
            Statement::Section { name, body, location } => {
                let snapshot = self.stack.effective_context();
                let context = MusicalContext {
                    time_signature: Some(snapshot.time_signature),
                    tempo: Some(snapshot.tempo),
                    swing: Some(snapshot.swing),
                    key: snapshot.key.clone(),
                    velocity: Some(snapshot.velocity),
                    dynamics: snapshot.dynamics.clone(),
                };
                self.stack.push(Frame::new());
                let mut sequences = Vec::new();
                for stmt in body {
                    if let Statement::Declaration { name: var_name, value, .. } = stmt {
                        let v = self.eval(value)?;
                        if let Data::Sequence(seq) = &v.data {
                            sequences.push((var_name.clone(), (**seq).clone()));
                        }
                        self.stack.declare(var_name.clone(), v);
                    } else {
                        self.exec_statement(stmt)?;
                    }
                }
                self.stack.pop();
                let section = SectionData {
                    name: name.clone(),
                    sequences,
                    context,
                    source_location: *location,
                };
                self.sections.insert(name.clone(), section.clone());
                Ok(Flow::Normal(Value::new(Data::Section(Box::new(section)), Type::Section)))
            }
        }
    }

    fn eval_context_set(&mut self, set: &ContextSet, location: Location) -> CadenceResult<MusicalContext> {
        Ok(match set {
            ContextSet::TimeSignature { numerator, denominator } => {
                if *numerator == 0 || !denominator.is_power_of_two() {
                    return Err(CadenceError::Range {
                        location,
                        message: format!("invalid time signature {numerator}/{denominator}: denominator must be a power of two"),
                    });
                }
                MusicalContext { time_signature: Some((*numerator, *denominator)), ..Default::default() }
            }
            ContextSet::Tempo(expr) => {
                let tempo = self.eval(expr)?.as_double(location)?;
                if tempo <= 0.0 {
                    return Err(CadenceError::Range { location, message: format!("tempo must be > 0, got {tempo}") });
                }
                MusicalContext { tempo: Some(tempo), ..Default::default() }
            }
            ContextSet::Swing(expr) => {
                let swing = self.eval(expr)?.as_double(location)?;
                if !(0.0..=1.0).contains(&swing) {
                    return Err(CadenceError::Range { location, message: format!("swing must be in [0,1], got {swing}") });
                }
                MusicalContext { swing: Some(swing), ..Default::default() }
            }
            ContextSet::Key(key) => MusicalContext {
                key: Some(key.clone()),
                ..Default::default()
            },
            ContextSet::Velocity(expr) => MusicalContext {
                velocity: Some(self.eval(expr)?.as_double(location)?),
                ..Default::default()
            },
            ContextSet::Dynamics(d) => MusicalContext {
                dynamics: Some(d.clone()),
                ..Default::default()
            },
        })
    }

    fn exec_use(&mut self, path: &str, location: Location) -> CadenceResult<()> {
        match path {
            "@std" => {
                stdlib::register_stdlib(Rc::make_mut(&mut self.registry));
                Ok(())
            }
            "@audio" => {
                stdlib::register_audio(Rc::make_mut(&mut self.registry));
                Ok(())
            }
            file_path => {
                let source = std::fs::read_to_string(file_path).map_err(|e| CadenceError::Runtime {
                    location,
                    message: format!("cannot read '{file_path}': {e}"),
                })?;
                let tokens = crate::lexer::Lexer::new(&source).tokenize()?;
                let program = crate::parser::Parser::new(tokens).parse_program()?;
                for stmt in &program.statements {
                    self.exec_statement(stmt)?;
                }
                Ok(())
            }
        }
    }

    pub fn eval(&mut self, expr: &Expression) -> CadenceResult<Value> {
        match expr {
            Expression::Literal(lit, _loc) => Ok(literal_value(lit)),
            Expression::Identifier(name, location) => self.stack.resolve(name, *location).cloned(),
            Expression::Call { name, args, location } => self.eval_call(name, args, *location),
            Expression::Pipeline { receiver, func, args, location } => {
                let mut all_args = vec![(**receiver).clone()];
                all_args.extend(args.iter().cloned());
                self.eval_call(func, &all_args, *location)
            }
            Expression::ArrayLiteral { elements, location } => {
                let mut values = Vec::with_capacity(elements.len());
                for e in elements {
                    values.push(self.eval(e)?);
                }
                let element_type = common_element_type(&values);
                let _ = location;
                Ok(Value::array(values, element_type))
            }
            Expression::Lambda { params, body, .. } => {
                let typed_params = params
                    .iter()
                    .map(|(t, n)| (n.clone(), Type::from_name(t).unwrap_or(Type::Void)))
                    .collect();
                Ok(Value::new(
                    Data::Function(Callable::Lambda(Lambda {
                        params: typed_params,
                        body: Rc::new((**body).clone()),
                        captured: self.stack.snapshot(),
                    })),
                    Type::Function,
                ))
            }
            Expression::NoteStream(ns) => {
                let context = self.stack.effective_context();
                let seq = compile_note_stream(ns, &context, &self.stack, &mut self.rng, &mut self.diagnostics);
                Ok(Value::sequence(seq))
            }
        }
    }

    fn eval_call(&mut self, name: &str, args: &[Expression], location: Location) -> CadenceResult<Value> {
        // `if` is handled directly: its Bool argument is strict, its
        // branches are lazy (only the taken branch is evaluated).
        if name == "if" {
            if args.len() != 3 {
                return Err(CadenceError::TypeMismatch {
                    location,
                    message: "if expects (Bool, Lazy<T>, Lazy<T>)".into(),
                });
            }
            let cond = self.eval(&args[0])?.as_bool(location)?;
            return if cond { self.eval(&args[1]) } else { self.eval(&args[2]) };
        }

        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(self.eval(a)?);
        }

        if let Some(bound) = self.stack.get(name).cloned() {
            if let Data::Function(callable) = bound.data {
                return self.invoke(callable, values, location);
            }
        }

        let arg_types: Vec<Type> = values.iter().map(|v| v.ty.clone()).collect();
        let registry = self.registry.clone();
        let sig = registry.resolve(name, &arg_types, location)?;
        (sig.implementation.clone())(self, &values, location)
    }

    fn invoke(&mut self, callable: Callable, args: Vec<Value>, location: Location) -> CadenceResult<Value> {
        match callable {
            Callable::Lambda(lambda) => {
                self.stack.push_snapshot(lambda.captured.clone());
                self.stack.push(frame_with_params(&lambda.params, &args));
                let result = self.eval(&lambda.body);
                self.stack.pop();
                self.stack.pop();
                result
            }
            Callable::Proc(proc) => {
                self.stack.push(frame_with_params(&proc.params, &args));
                let result = self.exec_block(&proc.body)?;
                self.stack.pop();
                Ok(match result {
                    Flow::Normal(v) => v,
                    Flow::Return(v) => v,
                })
            }
            Callable::Builtin(name) => {
                let arg_types: Vec<Type> = args.iter().map(|v| v.ty.clone()).collect();
                let registry = self.registry.clone();
                let sig = registry.resolve(&name, &arg_types, location)?;
                (sig.implementation.clone())(self, &args, location)
            }
        }
    }

    pub fn force(&mut self, thunk: &Thunk) -> CadenceResult<Value> {
        self.stack.push_snapshot(thunk.captured.clone());
        let result = self.eval(&thunk.body);
        self.stack.pop();
        result
    }

    pub fn build_song(&self, sections: Vec<(String, u32)>) -> CadenceResult<SongData> {
        for (name, _) in &sections {
            if !self.sections.contains_key(name) {
                return Err(CadenceError::NameResolution {
                    location: Location::default(),
                    name: name.clone(),
                });
            }
        }
        Ok(SongData { sections })
    }
}

fn frame_with_params(params: &[(String, Type)], args: &[Value]) -> Frame {
    let mut frame = Frame::new();
    for (i, (param_name, _)) in params.iter().enumerate() {
        if let Some(arg) = args.get(i) {
            frame.declare_into(param_name.clone(), arg.clone());
        }
    }
    frame
}

fn common_element_type(values: &[Value]) -> Type {
    match values.first() {
        None => Type::Void,
        Some(first) => {
            if values.iter().all(|v| v.ty == first.ty) {
                first.ty.clone()
            } else {
                Type::Void
            }
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(v) => Value::new(Data::Int(*v), Type::Int),
        Literal::Long(v) => Value::new(Data::Long(*v), Type::Long),
        Literal::Float(v) => Value::new(Data::Float(*v), Type::Float),
        Literal::Double(v) => Value::new(Data::Double(*v), Type::Double),
        Literal::Number(v) => Value::new(Data::Number(v.clone()), Type::Number),
        Literal::Bool(v) => Value::new(Data::Bool(*v), Type::Bool),
        Literal::Str(v) => Value::new(Data::Str(v.clone()), Type::String),
        Literal::Semitone(v) => Value::new(Data::Semitone(*v), Type::Semitone),
        Literal::Cent(v) => Value::new(Data::Cent(*v), Type::Cent),
        Literal::Millisecond(v) => Value::new(Data::Millisecond(*v), Type::Millisecond),
        Literal::Second(v) => Value::new(Data::Second(*v), Type::Second),
        Literal::Decibel(v) => Value::new(Data::Decibel(*v), Type::Decibel),
    }
}
