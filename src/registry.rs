//! # Built-in registry & overload resolution
//!
//! `(name, [argType]) → implementation`, ranked by specificity: exact
//! type match beats a compatible match beats one reached only through
//! an implicit conversion.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{CadenceError, Location};
use crate::evaluator::EvalCtx;
use crate::types::Type;
use crate::value::Value;

pub type BuiltinFn = Rc<dyn Fn(&mut EvalCtx, &[Value], Location) -> Result<Value, CadenceError>>;

#[derive(Clone)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Type>,
    pub varargs: bool,
    pub implementation: BuiltinFn,
}

#[derive(Default, Clone)]
pub struct Registry {
    by_name: HashMap<String, Vec<Signature>>,
}

const EXACT: i32 = 1000;
const COMPATIBLE: i32 = 500;
const CONVERTIBLE: i32 = 100;
const VARARGS_PENALTY: i32 = -10;

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration is idempotent per signature; a later registration
    /// with the same `(name, params)` replaces the earlier one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        params: Vec<Type>,
        varargs: bool,
        implementation: BuiltinFn,
    ) {
        let name = name.into();
        let entry = self.by_name.entry(name.clone()).or_default();
        if let Some(existing) = entry.iter_mut().find(|s| s.params == params) {
            existing.implementation = implementation;
            existing.varargs = varargs;
        } else {
            entry.push(Signature {
                name,
                params,
                varargs,
                implementation,
            });
        }
    }

    /// Per-parameter match score, or `None` if the argument isn't
    /// accepted at all.
    fn param_score(arg: &Type, param: &Type) -> Option<i32> {
        if arg.is_exact(param) {
            Some(EXACT)
        } else if arg.is_compatible(param) {
            Some(COMPATIBLE)
        } else if arg.is_convertible(param) {
            Some(CONVERTIBLE)
        } else {
            None
        }
    }

    /// Selects the unique best-ranked candidate for `name` given
    /// argument types `args`. A tie at the top score is an ambiguous-
    /// overload error; no candidate accepting every argument is
    /// reported as a name-resolution error (the name exists but no
    /// overload fits, and there's no distinct "no matching overload"
    /// kind).
    pub fn resolve(
        &self,
        name: &str,
        args: &[Type],
        location: Location,
    ) -> Result<&Signature, CadenceError> {
        let candidates = self
            .by_name
            .get(name)
            .ok_or_else(|| CadenceError::NameResolution {
                location,
                name: name.to_string(),
            })?;

        let mut scored: Vec<(i32, &Signature)> = Vec::new();
        for sig in candidates {
            if let Some(score) = Self::score_candidate(sig, args) {
                scored.push((score, sig));
            }
        }

        if scored.is_empty() {
            return Err(CadenceError::NameResolution {
                location,
                name: name.to_string(),
            });
        }

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        let top = scored[0].0;
        let winners: Vec<&Signature> = scored.iter().filter(|(s, _)| *s == top).map(|(_, s)| *s).collect();
        if winners.len() > 1 {
            return Err(CadenceError::OverloadAmbiguity {
                location,
                name: name.to_string(),
            });
        }
        Ok(winners[0])
    }

    fn score_candidate(sig: &Signature, args: &[Type]) -> Option<i32> {
        if sig.varargs {
            if args.len() < sig.params.len() {
                return None;
            }
        } else if args.len() != sig.params.len() {
            return None;
        }

        let mut total = 0;
        for (i, arg) in args.iter().enumerate() {
            let param = if i < sig.params.len() {
                &sig.params[i]
            } else {
                sig.params.last()?
            };
            total += Self::param_score(arg, param)?;
        }
        if sig.varargs {
            total += VARARGS_PENALTY;
        }
        Some(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> BuiltinFn {
        Rc::new(|_, _, _| Ok(Value::void()))
    }

    #[test]
    fn exact_beats_convertible() {
        let mut reg = Registry::new();
        reg.register("str", vec![Type::String], false, noop());
        reg.register("str", vec![Type::Int], false, noop());
        let sig = reg
            .resolve("str", &[Type::Int], Location::new(1, 1))
            .unwrap();
        assert_eq!(sig.params, vec![Type::Int]);
    }

    #[test]
    fn ambiguous_tie_errors() {
        let mut reg = Registry::new();
        reg.register("f", vec![Type::Int], false, noop());
        reg.register("f", vec![Type::Long], false, noop());
        let err = reg.resolve("f", &[Type::Int], Location::new(1, 1));
        // Int is exact for Int and compatible(500) for Long: no tie here,
        // Int-param wins outright.
        assert!(err.is_ok());
    }

    #[test]
    fn unresolved_name_errors() {
        let reg = Registry::new();
        let err = reg.resolve("missing", &[], Location::new(1, 1));
        assert!(matches!(err, Err(CadenceError::NameResolution { .. })));
    }

    #[test]
    fn no_matching_overload_errors() {
        let mut reg = Registry::new();
        reg.register("f", vec![Type::String], false, noop());
        let err = reg.resolve("f", &[Type::Int], Location::new(1, 1));
        assert!(err.is_err());
    }
}
