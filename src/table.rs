use std::{collections::HashSet, fmt::Display};

use serde::{Serialize, Serializer, ser::SerializeMap, ser::SerializeSeq};
use tracing::{debug, trace};

use crate::{
    error::{ConfigurationError, EvaluationError},
    eval::{Bindings, Expression, Lookup},
};

/// Largest number of input variables a table is generated for.
pub const MAX_VARIABLES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<bool>,
    result: bool,
}

impl Row {
    /// Assigned values, in the order of [`TruthTable::variables`].
    pub fn values(&self) -> &[bool] {
        &self.values
    }

    pub fn result(&self) -> bool {
        self.result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruthTable {
    variables: Vec<String>,
    rows: Vec<Row>,
}

/// One combination of the table's inputs, seen as bindings.
struct Assignment<'a> {
    names: &'a [String],
    values: &'a [bool],
}

impl Bindings for Assignment<'_> {
    fn lookup(&self, name: &str) -> Lookup {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map_or(Lookup::Unbound, |i| Lookup::Bool(self.values[i]))
    }

    fn names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }
}

impl TruthTable {
    /// Evaluates `expression` for every assignment of `variables`.
    ///
    /// Rows count in binary with `false` before `true`; the first variable is
    /// the most significant position.
    pub fn generate<S: AsRef<str>>(
        expression: &Expression,
        variables: &[S],
    ) -> Result<Self, EvaluationError> {
        let names: Vec<String> = variables.iter().map(|v| v.as_ref().to_string()).collect();

        let mut seen = HashSet::new();
        if let Some(name) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(expression.fail(ConfigurationError::DuplicateVariable {
                name: name.clone(),
            }));
        }
        if names.len() > MAX_VARIABLES {
            return Err(expression.fail(ConfigurationError::TooManyVariables {
                count: names.len(),
                limit: MAX_VARIABLES,
            }));
        }

        let n = names.len();
        let mut rows = Vec::with_capacity(1 << n);
        for bits in 0..1usize << n {
            let values: Vec<bool> = (0..n).map(|i| (bits >> (n - 1 - i)) & 1 == 1).collect();
            let result = expression.evaluate(&Assignment {
                names: &names,
                values: &values,
            })?;
            trace!(?values, result, "evaluated row");
            rows.push(Row { values, result });
        }

        debug!(
            expression = expression.source(),
            rows = rows.len(),
            "generated truth table"
        );
        Ok(TruthTable {
            variables: names,
            rows,
        })
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value assigned to `name` in row `row`.
    pub fn get(&self, row: usize, name: &str) -> Option<bool> {
        let column = self.variables.iter().position(|v| v == name)?;
        self.rows.get(row).map(|row| row.values[column])
    }
}

/// Parses `expr` and builds its truth table over `variables`.
pub fn truth_table<S: AsRef<str>>(
    expr: &str,
    variables: &[S],
) -> Result<TruthTable, EvaluationError> {
    TruthTable::generate(&Expression::compile(expr)?, variables)
}

struct RowEntries<'a> {
    variables: &'a [String],
    row: &'a Row,
}

impl Serialize for RowEntries<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.variables.len() + 1))?;
        for (name, value) in self.variables.iter().zip(&self.row.values) {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("result", &self.row.result)?;
        map.end()
    }
}

/// Serializes as a list of `{ <variable>: bool, ..., "result": bool }` objects.
impl Serialize for TruthTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&RowEntries {
                variables: &self.variables,
                row,
            })?;
        }
        seq.end()
    }
}

impl Display for TruthTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<&str> = self
            .variables
            .iter()
            .map(String::as_str)
            .chain(["result"])
            .collect();
        writeln!(f, "{}", headers.join(" | "))?;
        writeln!(
            f,
            "{}",
            headers
                .iter()
                .map(|h| "-".repeat(h.chars().count()))
                .collect::<Vec<_>>()
                .join("-+-")
        )?;
        for row in &self.rows {
            let cells: Vec<String> = row
                .values
                .iter()
                .chain([&row.result])
                .zip(&headers)
                .map(|(value, header)| {
                    let cell = if *value { "T" } else { "F" };
                    format!("{cell:<width$}", width = header.chars().count())
                })
                .collect();
            writeln!(f, "{}", cells.join(" | ").trim_end())?;
        }
        Ok(())
    }
}
