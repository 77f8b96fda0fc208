use std::collections::{BTreeMap, BTreeSet, HashMap};

use miette::SourceSpan;

use crate::{
    Parser,
    error::{Cause, EvaluationError, NonBooleanError, UnboundVariableError, named_source},
    parse::Expr,
    value::{Context, Value},
};

/// Outcome of resolving a variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Bool(bool),
    /// The name is bound, but to a value of the given kind.
    Other(&'static str),
    Unbound,
}

/// Source of variable values for evaluation. Names match exactly.
pub trait Bindings {
    fn lookup(&self, name: &str) -> Lookup;

    /// Bound names, used to suggest a fix for an unbound variable.
    fn names(&self) -> Vec<&str>;
}

impl Bindings for HashMap<String, bool> {
    fn lookup(&self, name: &str) -> Lookup {
        self.get(name).map_or(Lookup::Unbound, |value| Lookup::Bool(*value))
    }

    fn names(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }
}

impl Bindings for HashMap<&str, bool> {
    fn lookup(&self, name: &str) -> Lookup {
        self.get(name).map_or(Lookup::Unbound, |value| Lookup::Bool(*value))
    }

    fn names(&self) -> Vec<&str> {
        self.keys().copied().collect()
    }
}

impl Bindings for BTreeMap<String, bool> {
    fn lookup(&self, name: &str) -> Lookup {
        self.get(name).map_or(Lookup::Unbound, |value| Lookup::Bool(*value))
    }

    fn names(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }
}

impl Bindings for Context {
    fn lookup(&self, name: &str) -> Lookup {
        match self.get(name) {
            Some(Value::Bool(value)) => Lookup::Bool(*value),
            Some(other) => Lookup::Other(other.kind()),
            None => Lookup::Unbound,
        }
    }

    fn names(&self) -> Vec<&str> {
        self.keys().collect()
    }
}

/// A parsed expression that remembers its source text for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    pub fn compile(source: &str) -> Result<Self, EvaluationError> {
        Self::compile_with(Parser::new(source))
    }

    pub fn compile_with(parser: Parser<'_>) -> Result<Self, EvaluationError> {
        let source = parser.source();
        let root = parser
            .parse()
            .map_err(|e| EvaluationError::new(source, e))?;
        Ok(Expression {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn variables(&self) -> BTreeSet<&str> {
        self.root.variables()
    }

    pub fn evaluate<B: Bindings + ?Sized>(&self, bindings: &B) -> Result<bool, EvaluationError> {
        eval(&self.root, &self.source, bindings)
            .map_err(|cause| EvaluationError::new(&self.source, cause))
    }

    pub(crate) fn fail(&self, cause: impl Into<Cause>) -> EvaluationError {
        EvaluationError::new(&self.source, cause)
    }
}

/// Both operands of `and`/`or` are always evaluated, so an unbound name is
/// reported no matter what the other operand's value is.
fn eval<B: Bindings + ?Sized>(expr: &Expr, source: &str, bindings: &B) -> Result<bool, Cause> {
    Ok(match expr {
        Expr::Variable { name, offset } => match bindings.lookup(name) {
            Lookup::Bool(value) => value,
            Lookup::Other(found) => {
                return Err(NonBooleanError {
                    src: named_source(source),
                    span: SourceSpan::from(*offset..*offset + name.len()),
                    name: name.clone(),
                    found,
                }
                .into());
            }
            Lookup::Unbound => {
                return Err(UnboundVariableError {
                    src: named_source(source),
                    span: SourceSpan::from(*offset..*offset + name.len()),
                    name: name.clone(),
                    advice: advice(name, bindings.names()),
                }
                .into());
            }
        },
        Expr::Not(operand) => !eval(operand, source, bindings)?,
        // Every operand is evaluated, so an unbound name is never masked.
        Expr::And(operands) => {
            let mut all = true;
            for operand in operands {
                all &= eval(operand, source, bindings)?;
            }
            all
        }
        Expr::Or(operands) => {
            let mut any = false;
            for operand in operands {
                any |= eval(operand, source, bindings)?;
            }
            any
        }
    })
}

fn advice(name: &str, mut known: Vec<&str>) -> Option<String> {
    if let Some(close) = known.iter().find(|key| key.eq_ignore_ascii_case(name)) {
        return Some(format!("change variable `{name}` to variable `{close}`?"));
    }
    if known.is_empty() {
        return Some("no variables are bound".to_string());
    }
    known.sort_unstable();
    Some(format!("bound variables are: {}", known.join(", ")))
}

/// Parses `expr` and evaluates it against `bindings`.
pub fn evaluate_expression<B: Bindings + ?Sized>(
    expr: &str,
    bindings: &B,
) -> Result<bool, EvaluationError> {
    Expression::compile(expr)?.evaluate(bindings)
}
