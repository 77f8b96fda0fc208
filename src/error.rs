use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

pub(crate) fn named_source(whole: &str) -> NamedSource<String> {
    NamedSource::new("expression", whole.to_string())
}

#[derive(Error, Debug, Diagnostic)]
pub enum SyntaxError {
    #[error("unexpected character '{found}'")]
    #[diagnostic(help(
        "expressions are made of identifiers, parentheses and the keywords `and`, `or`, `not`"
    ))]
    UnexpectedCharacter {
        #[source_code]
        src: NamedSource<String>,
        #[label("this character")]
        span: SourceSpan,
        found: char,
    },

    #[error("unexpected `{found}`, expected {expected}")]
    UnexpectedToken {
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
        found: String,
        expected: &'static str,
    },

    #[error("unexpected end of expression, expected {expected}")]
    #[diagnostic(help("the expression ended early, possibly after a trailing operator"))]
    UnexpectedEof {
        #[source_code]
        src: NamedSource<String>,
        #[label("expression ends here")]
        span: SourceSpan,
        expected: &'static str,
    },

    #[error("unclosed parenthesis")]
    #[diagnostic(help("add a matching `)`"))]
    UnclosedParen {
        #[source_code]
        src: NamedSource<String>,
        #[label("this `(` is never closed")]
        span: SourceSpan,
    },

    #[error("unmatched closing parenthesis")]
    UnmatchedParen {
        #[source_code]
        src: NamedSource<String>,
        #[label("no `(` opens this")]
        span: SourceSpan,
    },

    #[error("expression nests deeper than {limit} levels")]
    TooDeep {
        #[source_code]
        src: NamedSource<String>,
        #[label("limit exceeded here")]
        span: SourceSpan,
        limit: usize,
    },

    #[error("empty expression")]
    #[diagnostic(help("an expression needs at least one variable"))]
    Empty {
        #[source_code]
        src: NamedSource<String>,
        #[label("nothing to evaluate here")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic)]
#[error("unbound variable `{name}`")]
pub struct UnboundVariableError {
    #[source_code]
    pub(crate) src: NamedSource<String>,

    #[label("no value is bound to this name")]
    pub(crate) span: SourceSpan,

    pub name: String,

    #[help]
    pub(crate) advice: Option<String>,
}

#[derive(Error, Debug, Diagnostic)]
#[error("variable `{name}` is bound to a {found}, not a boolean")]
#[diagnostic(help("only `true` and `false` are accepted as variable values"))]
pub struct NonBooleanError {
    #[source_code]
    pub(crate) src: NamedSource<String>,

    #[label("used as a boolean here")]
    pub(crate) span: SourceSpan,

    pub name: String,
    pub found: &'static str,
}

#[derive(Error, Debug, Diagnostic, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("variable `{name}` is listed more than once")]
    DuplicateVariable { name: String },

    #[error("step {step} has an empty condition")]
    EmptyCondition { step: usize },

    #[error("{count} variables exceed the truth table limit of {limit}")]
    TooManyVariables { count: usize, limit: usize },
}

#[derive(Error, Debug, Diagnostic)]
pub enum Cause {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Unbound(#[from] UnboundVariableError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    NonBoolean(#[from] NonBooleanError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// The single error surfaced by `evaluate_expression`, `logic_flow` and `truth_table`.
///
/// The message echoes the expression text followed by the underlying cause.
#[derive(Error, Debug, Diagnostic)]
#[error("failed to evaluate `{expression}`: {cause}")]
pub struct EvaluationError {
    expression: String,

    #[diagnostic_source]
    cause: Cause,
}

impl EvaluationError {
    pub fn new(expression: &str, cause: impl Into<Cause>) -> Self {
        EvaluationError {
            expression: expression.to_string(),
            cause: cause.into(),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    pub fn into_cause(self) -> Cause {
        self.cause
    }
}
