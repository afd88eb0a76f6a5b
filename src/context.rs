//! # Execution context
//!
//! A stack of lexical frames, each holding variable bindings and an
//! optional musical-context layer. Resolving the effective context is a
//! top-down short-circuiting walk: stop at the first frame that set a
//! given field, else fall back to the default.

use std::collections::HashMap;

use crate::error::{CadenceError, Location};
use crate::value::Value;

/// A scoped, partial musical-context update. `None` fields are
/// unset and inherit from enclosing scopes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MusicalContext {
    pub time_signature: Option<(u32, u32)>,
    pub tempo: Option<f64>,
    pub swing: Option<f64>,
    pub key: Option<String>,
    pub velocity: Option<f64>,
    pub dynamics: Option<String>,
}

impl MusicalContext {
    /// Defaults used once a stack walk exhausts every frame with a field
    /// still unset: 4/4, 120 BPM, swing 0.5, no key, velocity 0.63.
    pub fn defaults() -> ResolvedContext {
        ResolvedContext {
            time_signature: (4, 4),
            tempo: 120.0,
            swing: 0.5,
            key: None,
            velocity: 0.63,
            dynamics: None,
        }
    }

    /// This context layered over the global [`MusicalContext::defaults`].
    pub fn resolved(&self) -> ResolvedContext {
        let mut base = MusicalContext::defaults();
        self.merge_over(&mut base);
        base
    }

    pub fn merge_over(&self, base: &mut ResolvedContext) {
        if let Some(ts) = self.time_signature {
            base.time_signature = ts;
        }
        if let Some(t) = self.tempo {
            base.tempo = t;
        }
        if let Some(s) = self.swing {
            base.swing = s;
        }
        if let Some(k) = &self.key {
            base.key = Some(k.clone());
        }
        if let Some(v) = self.velocity {
            base.velocity = v;
        }
        if let Some(d) = &self.dynamics {
            base.dynamics = Some(d.clone());
        }
    }
}

/// A fully resolved musical context: every field has a concrete value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContext {
    pub time_signature: (u32, u32),
    pub tempo: f64,
    pub swing: f64,
    pub key: Option<String>,
    pub velocity: f64,
    pub dynamics: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Frame {
    variables: HashMap<String, Value>,
    pub context: Option<MusicalContext>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(context: MusicalContext) -> Self {
        Self {
            variables: HashMap::new(),
            context: Some(context),
        }
    }

    /// Declares directly into this (not-yet-pushed) frame, used to build
    /// a call frame for a lambda/proc invocation before pushing it.
    pub fn declare_into(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }
}

/// The execution stack. The topmost frame (last in `frames`) is the
/// innermost scope.
#[derive(Debug, Clone)]
pub struct Stack {
    frames: Vec<Frame>,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new()],
        }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Walks from top to bottom; first hit wins.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|f| f.variables.get(name))
    }

    /// Places the binding in the current (topmost) frame.
    pub fn declare(&mut self, name: impl Into<String>, value: Value) {
        self.frames
            .last_mut()
            .expect("stack always has at least one frame")
            .variables
            .insert(name.into(), value);
    }

    /// Updates the frame owning the binding, walking top to bottom.
    /// Errors with location if the name is unresolved.
    pub fn assign(
        &mut self,
        name: &str,
        value: Value,
        location: Location,
    ) -> Result<(), CadenceError> {
        for frame in self.frames.iter_mut().rev() {
            if frame.variables.contains_key(name) {
                frame.variables.insert(name.to_string(), value);
                return Ok(());
            }
        }
        Err(CadenceError::NameResolution {
            location,
            name: name.to_string(),
        })
    }

    pub fn resolve(&self, name: &str, location: Location) -> Result<&Value, CadenceError> {
        self.get(name).ok_or_else(|| CadenceError::NameResolution {
            location,
            name: name.to_string(),
        })
    }

    /// A flattened, top-wins snapshot of every variable currently in
    /// scope — used as a lambda's captured-environment snapshot (no
    /// live back-pointer to the enclosing frame). Conservative: captures
    /// everything reachable rather than just the lambda body's free
    /// variables, which is simpler and behaviorally equivalent since
    /// captured bindings are immutable snapshots either way.
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        let mut seen = HashMap::new();
        for frame in &self.frames {
            for (k, v) in &frame.variables {
                seen.insert(k.clone(), v.clone());
            }
        }
        seen.into_iter().collect()
    }

    /// Pushes a frame pre-populated from a lambda/thunk's captured
    /// snapshot.
    pub fn push_snapshot(&mut self, captured: Vec<(String, Value)>) {
        let mut frame = Frame::new();
        for (k, v) in captured {
            frame.declare_into(k, v);
        }
        self.push(frame);
    }

    /// Composes the effective musical context by walking frames top-down,
    /// adopting the first non-nil value seen for each field, short-
    /// circuiting once every field is resolved, then filling any
    /// remaining nils from the global defaults.
    pub fn effective_context(&self) -> ResolvedContext {
        let mut resolved = MusicalContext::defaults();
        let mut seen = MusicalContext::default();
        for frame in self.frames.iter().rev() {
            let Some(ctx) = &frame.context else { continue };
            if seen.time_signature.is_none() {
                if let Some(ts) = ctx.time_signature {
                    seen.time_signature = Some(ts);
                    resolved.time_signature = ts;
                }
            }
            if seen.tempo.is_none() {
                if let Some(t) = ctx.tempo {
                    seen.tempo = Some(t);
                    resolved.tempo = t;
                }
            }
            if seen.swing.is_none() {
                if let Some(s) = ctx.swing {
                    seen.swing = Some(s);
                    resolved.swing = s;
                }
            }
            if seen.key.is_none() {
                if let Some(k) = &ctx.key {
                    seen.key = Some(k.clone());
                    resolved.key = Some(k.clone());
                }
            }
            if seen.velocity.is_none() {
                if let Some(v) = ctx.velocity {
                    seen.velocity = Some(v);
                    resolved.velocity = v;
                }
            }
            if seen.dynamics.is_none() {
                if let Some(d) = &ctx.dynamics {
                    seen.dynamics = Some(d.clone());
                    resolved.dynamics = Some(d.clone());
                }
            }
            let all_set = seen.time_signature.is_some()
                && seen.tempo.is_some()
                && seen.swing.is_some()
                && seen.key.is_some()
                && seen.velocity.is_some()
                && seen.dynamics.is_some();
            if all_set {
                break;
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_lookup_walks_top_down() {
        let mut stack = Stack::new();
        stack.declare("x", Value::int(1));
        stack.push(Frame::new());
        stack.declare("x", Value::int(2));
        assert_eq!(stack.get("x"), Some(&Value::int(2)));
        stack.pop();
        assert_eq!(stack.get("x"), Some(&Value::int(1)));
    }

    #[test]
    fn context_inherits_unset_fields() {
        let mut stack = Stack::new();
        stack.push(Frame::with_context(MusicalContext {
            time_signature: Some((3, 4)),
            ..Default::default()
        }));
        stack.push(Frame::with_context(MusicalContext {
            tempo: Some(90.0),
            ..Default::default()
        }));
        let ctx = stack.effective_context();
        assert_eq!(ctx.time_signature, (3, 4));
        assert_eq!(ctx.tempo, 90.0);
        assert_eq!(ctx.swing, 0.5);
    }

    #[test]
    fn assign_errors_when_unresolved() {
        let mut stack = Stack::new();
        let err = stack
            .assign("missing", Value::int(1), Location::new(1, 1))
            .unwrap_err();
        assert!(matches!(err, CadenceError::NameResolution { .. }));
    }
}
