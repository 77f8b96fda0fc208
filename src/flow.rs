use std::{collections::BTreeMap, fmt::Debug};

use serde::Deserialize;
use tracing::{debug, trace};

use crate::{
    error::{ConfigurationError, EvaluationError},
    eval::Expression,
    value::{Context, Value},
};

/// Capability invoked on the shared context when a step's condition holds.
pub trait Action {
    fn apply(&self, context: &mut Context);
}

impl<F> Action for F
where
    F: Fn(&mut Context),
{
    fn apply(&self, context: &mut Context) {
        self(context)
    }
}

impl Action for Vec<Box<dyn Action>> {
    fn apply(&self, context: &mut Context) {
        for action in self {
            action.apply(context);
        }
    }
}

/// Sets `key` to `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub key: String,
    pub value: Value,
}

impl Assign {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Assign {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Action for Assign {
    fn apply(&self, context: &mut Context) {
        context.insert(self.key.clone(), self.value.clone());
    }
}

/// Removes `key`, if present.
#[derive(Debug, Clone, PartialEq)]
pub struct Remove {
    pub key: String,
}

impl Remove {
    pub fn new(key: impl Into<String>) -> Self {
        Remove { key: key.into() }
    }
}

impl Action for Remove {
    fn apply(&self, context: &mut Context) {
        context.remove(&self.key);
    }
}

pub struct Step {
    condition: String,
    action: Box<dyn Action>,
}

impl Step {
    pub fn new(condition: impl Into<String>, action: impl Action + 'static) -> Self {
        Step {
            condition: condition.into(),
            action: Box::new(action),
        }
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }
}

impl Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

/// Runs every step once, in order, applying its action when the condition holds.
///
/// Conditions are evaluated against the context as it is at that point, so
/// an action can influence the conditions of later steps. The first condition
/// that fails to parse or evaluate aborts the run; whatever earlier actions
/// changed stays changed.
pub fn logic_flow<'c>(
    steps: &[Step],
    context: &'c mut Context,
) -> Result<&'c mut Context, EvaluationError> {
    for (index, step) in steps.iter().enumerate() {
        if step.condition.trim().is_empty() {
            return Err(EvaluationError::new(
                &step.condition,
                ConfigurationError::EmptyCondition { step: index },
            ));
        }

        let condition = Expression::compile(&step.condition)?;
        if condition.evaluate(&*context)? {
            debug!(step = index, condition = %step.condition, "condition holds, applying action");
            step.action.apply(context);
        } else {
            trace!(step = index, condition = %step.condition, "condition does not hold");
        }
    }
    Ok(context)
}

/// Declarative form of a [`Step`]: every `set` entry is assigned, then every
/// `remove` key is dropped.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDefinition {
    pub condition: String,
    #[serde(default)]
    pub set: BTreeMap<String, Value>,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl StepDefinition {
    pub fn into_step(self) -> Step {
        let mut actions: Vec<Box<dyn Action>> = Vec::new();
        for (key, value) in self.set {
            actions.push(Box::new(Assign { key, value }));
        }
        for key in self.remove {
            actions.push(Box::new(Remove { key }));
        }
        Step::new(self.condition, actions)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowDefinition {
    #[serde(default)]
    pub context: Context,
    pub steps: Vec<StepDefinition>,
}

impl FlowDefinition {
    /// Runs the steps against the initial context and returns the final context.
    pub fn run(self) -> Result<Context, EvaluationError> {
        let steps: Vec<Step> = self.steps.into_iter().map(StepDefinition::into_step).collect();
        let mut context = self.context;
        logic_flow(&steps, &mut context)?;
        Ok(context)
    }
}
