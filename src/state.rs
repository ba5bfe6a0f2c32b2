//! Client-side wizard state model.
//!
//! One `WizardState` value is rebuilt from every server response and owned by
//! the controller. Everything in this module is a plain value type; the
//! derived queries are pure reads with no I/O.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::codec;

/// Parsed form of a step identifier: a step alone, or a step plus one of its
/// sub-steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepIdentifier {
    Simple(String),
    Sub { step: String, sub_step: String },
}

impl StepIdentifier {
    pub fn step(&self) -> &str {
        match self {
            StepIdentifier::Simple(step) => step,
            StepIdentifier::Sub { step, .. } => step,
        }
    }

    pub fn sub_step(&self) -> Option<&str> {
        match self {
            StepIdentifier::Simple(_) => None,
            StepIdentifier::Sub { sub_step, .. } => Some(sub_step),
        }
    }

    /// Canonical textual encoding, the inverse of parsing.
    pub fn encode(&self) -> String {
        codec::encode_identifier(self.step(), self.sub_step())
    }
}

/// One entry of the ordered wizard structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepDescriptor {
    /// A step with no known sub-steps
    Simple(String),
    /// A step with an ordered list of sub-steps (first-seen order)
    Composite { step: String, sub_steps: Vec<String> },
}

impl StepDescriptor {
    pub fn step(&self) -> &str {
        match self {
            StepDescriptor::Simple(step) => step,
            StepDescriptor::Composite { step, .. } => step,
        }
    }

    pub fn sub_steps(&self) -> &[String] {
        match self {
            StepDescriptor::Simple(_) => &[],
            StepDescriptor::Composite { sub_steps, .. } => sub_steps,
        }
    }
}

/// Ordered hierarchy of steps and sub-steps describing the whole flow.
///
/// Order is significant: it defines prev/next semantics and first/last
/// sub-step lookups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WizardStructure {
    descriptors: Vec<StepDescriptor>,
}

impl WizardStructure {
    pub fn new(descriptors: Vec<StepDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[StepDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn first(&self) -> Option<&StepDescriptor> {
        self.descriptors.first()
    }

    pub fn last(&self) -> Option<&StepDescriptor> {
        self.descriptors.last()
    }

    pub fn descriptor(&self, step: &str) -> Option<&StepDescriptor> {
        self.descriptors.iter().find(|d| d.step() == step)
    }

    /// Index of a step within the structure
    pub fn step_index(&self, step: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.step() == step)
    }

    /// Step name at a structural index
    pub fn step_by_index(&self, index: usize) -> Option<&str> {
        self.descriptors.get(index).map(StepDescriptor::step)
    }

    /// Index of a sub-step within its owning step
    pub fn sub_step_index(&self, step: &str, sub_step: &str) -> Option<usize> {
        self.descriptor(step)?
            .sub_steps()
            .iter()
            .position(|s| s == sub_step)
    }

    /// Sub-step names for a step; empty when the step is simple or unknown
    pub fn sub_step_names(&self, step: &str) -> &[String] {
        self.descriptor(step)
            .map(StepDescriptor::sub_steps)
            .unwrap_or(&[])
    }

    pub fn first_sub_step(&self, step: &str) -> Option<&str> {
        self.sub_step_names(step).first().map(String::as_str)
    }

    pub fn last_sub_step(&self, step: &str) -> Option<&str> {
        self.sub_step_names(step).last().map(String::as_str)
    }
}

/// Server-computed payload for one step
#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    /// Value of a simple step
    Single(Value),
    /// Per-sub-step values of a composite step
    Nested(HashMap<String, Value>),
}

/// Per-step payload data, keyed by step name.
///
/// Entries may be absent for steps the server has not computed yet; present
/// entries always resolve against the structure (enforced at normalization).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepValueMap {
    entries: HashMap<String, StepValue>,
}

impl StepValueMap {
    pub fn new(entries: HashMap<String, StepValue>) -> Self {
        Self { entries }
    }

    pub fn get(&self, step: &str) -> Option<&StepValue> {
        self.entries.get(step)
    }

    /// Value of one sub-step of a composite step
    pub fn sub_value(&self, step: &str, sub_step: &str) -> Option<&Value> {
        match self.entries.get(step)? {
            StepValue::Nested(values) => values.get(sub_step),
            StepValue::Single(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StepValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The step (and optional sub-step) the user is currently on.
///
/// `full_step` is the canonical encoding used when building request paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentPosition {
    pub step: String,
    pub sub_step: Option<String>,
    pub full_step: String,
}

impl CurrentPosition {
    pub fn new(step: &str, sub_step: Option<&str>) -> Self {
        Self {
            step: step.to_string(),
            sub_step: sub_step.map(str::to_string),
            full_step: codec::encode_identifier(step, sub_step),
        }
    }
}

impl From<StepIdentifier> for CurrentPosition {
    fn from(identifier: StepIdentifier) -> Self {
        CurrentPosition::new(identifier.step(), identifier.sub_step())
    }
}

/// Wire format of a wizard response as emitted by the server
#[derive(Debug, Clone, Deserialize)]
pub struct WizardPayload {
    /// Flat ordered identifiers, e.g. `["a", "b|x", "b|y"]`
    pub structure: Vec<String>,
    /// Flat per-step data keyed the same way
    pub steps: serde_json::Map<String, Value>,
    #[serde(default)]
    pub current_step: Option<String>,
    pub done: bool,
    pub valid: bool,
}

/// The normalized aggregate the controller owns.
///
/// Replaced wholesale on every applied response, never patched field by
/// field.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    pub structure: WizardStructure,
    pub steps: StepValueMap,
    pub current: CurrentPosition,
    pub done: bool,
    pub valid: bool,
}

impl WizardState {
    pub fn current_step(&self) -> &str {
        &self.current.step
    }

    pub fn current_sub_step(&self) -> Option<&str> {
        self.current.sub_step.as_deref()
    }

    pub fn current_step_index(&self) -> Option<usize> {
        self.structure.step_index(&self.current.step)
    }

    pub fn current_sub_step_index(&self) -> Option<usize> {
        let sub_step = self.current.sub_step.as_deref()?;
        self.structure.sub_step_index(&self.current.step, sub_step)
    }

    pub fn first_sub_step_for_current_step(&self) -> Option<&str> {
        self.structure.first_sub_step(&self.current.step)
    }

    pub fn last_sub_step_for_current_step(&self) -> Option<&str> {
        self.structure.last_sub_step(&self.current.step)
    }

    pub fn is_current_sub_step(&self, sub_step: &str) -> bool {
        self.current.sub_step.as_deref() == Some(sub_step)
    }

    /// True when the current sub-step is the last of its step. A step
    /// without sub-steps has nothing after it, so this is true as well.
    pub fn is_last_sub_step_for_current_step(&self) -> bool {
        self.last_sub_step_for_current_step() == self.current.sub_step.as_deref()
    }

    pub fn has_more_sub_steps_for_current_step(&self) -> bool {
        !self.is_last_sub_step_for_current_step()
    }

    /// Sub-step names for `step`, defaulting to the current step; empty when
    /// no step is resolvable.
    pub fn sub_step_names(&self, step: Option<&str>) -> &[String] {
        let step = step.unwrap_or(&self.current.step);
        self.structure.sub_step_names(step)
    }

    pub fn step_value(&self, step: &str) -> Option<&StepValue> {
        self.steps.get(step)
    }

    /// Value of one sub-step of the current step
    pub fn sub_step_value(&self, sub_step: &str) -> Option<&Value> {
        self.steps.sub_value(&self.current.step, sub_step)
    }
}
