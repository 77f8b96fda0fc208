//! Boolean expressions over named variables, condition-guarded rule
//! sequences, and truth tables.
//!
//! Expressions use a closed grammar: identifiers, parentheses and the
//! lowercase keywords `and`, `or`, `not`.
//!
//! ```
//! use std::collections::HashMap;
//! use logic_flow_engine::evaluate_expression;
//!
//! let vars = HashMap::from([("A", true), ("B", false), ("C", false)]);
//! assert!(evaluate_expression("(A and B) or not C", &vars).unwrap());
//! ```

pub mod error;
pub mod eval;
pub mod flow;
pub mod lex;
pub mod parse;
pub mod table;
pub mod value;

pub use error::{
    Cause, ConfigurationError, EvaluationError, NonBooleanError, SyntaxError,
    UnboundVariableError,
};
pub use eval::{Bindings, Expression, Lookup, evaluate_expression};
pub use flow::{Action, Assign, FlowDefinition, Remove, Step, StepDefinition, logic_flow};
pub use lex::Lexer;
pub use parse::{Expr, Parser};
pub use table::{Row, TruthTable, truth_table};
pub use value::{Context, Value};
