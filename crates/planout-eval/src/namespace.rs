//! Namespace allocation: deterministically shards a unit-identifier space
//! into fixed-size segments and assigns segments to named experiments.
//!
//! Allocation reuses the interpreter's own `sample` operator, so the
//! segments an experiment receives are a pure function of (namespace name,
//! experiment name, free list at the time of the add). Removing and
//! re-adding an experiment over the same free list therefore restores the
//! identical allocation.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value as Json};
use thiserror::Error;

use crate::error::EvalError;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Configuration failure of a namespace operation. Namespace state is
/// unchanged when one of these is returned.
#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("there is already an experiment called '{0}'")]
    DuplicateExperiment(String),

    #[error("not enough segments available ({available}) to add experiment '{name}' ({requested} requested)")]
    InsufficientSegments {
        name: String,
        requested: u64,
        available: u64,
    },

    #[error("experiment '{0}' does not exist in the namespace")]
    UnknownExperiment(String),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// A namespace of `num_segments` segments, each assigned to at most one
/// experiment.
pub struct SimpleNamespace {
    pub name: String,
    /// The input key whose value identifies the subject being assigned.
    pub primary_unit: String,
    pub num_segments: u64,
    inputs: HashMap<String, Value>,
    segment_allocations: BTreeMap<u64, String>,
    /// Free segments, kept sorted so allocation is stable across
    /// add/remove cycles.
    available_segments: Vec<u64>,
    current_experiments: BTreeMap<String, Json>,
    default_experiment: Json,
    /// Cached segment selection; valid until the inputs change.
    selected_segment: Option<u64>,
}

impl SimpleNamespace {
    /// Create a namespace with every segment available and a no-op default
    /// experiment.
    pub fn new(
        name: impl Into<String>,
        num_segments: u64,
        primary_unit: impl Into<String>,
        inputs: HashMap<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            primary_unit: primary_unit.into(),
            num_segments,
            inputs,
            segment_allocations: BTreeMap::new(),
            available_segments: (0..num_segments).collect(),
            current_experiments: BTreeMap::new(),
            default_experiment: json!({}),
            selected_segment: None,
        }
    }

    /// Replace the default experiment run for units in unallocated
    /// segments.
    pub fn set_default_experiment(&mut self, code: Json) {
        self.default_experiment = code;
    }

    /// Replace the inputs, invalidating the cached segment selection.
    pub fn set_inputs(&mut self, inputs: HashMap<String, Value>) {
        self.inputs = inputs;
        self.selected_segment = None;
    }

    /// Register an experiment and allocate `segments` segments to it.
    pub fn add_experiment(
        &mut self,
        name: impl Into<String>,
        code: Json,
        segments: u64,
    ) -> Result<(), NamespaceError> {
        let name = name.into();
        if self.current_experiments.contains_key(&name) {
            return Err(NamespaceError::DuplicateExperiment(name));
        }
        let available = self.available_segments.len() as u64;
        if available < segments {
            return Err(NamespaceError::InsufficientSegments {
                name,
                requested: segments,
                available,
            });
        }

        let sampled = self.sample_segments(&name, segments)?;
        for segment in sampled {
            self.segment_allocations.insert(segment, name.clone());
            if let Ok(pos) = self.available_segments.binary_search(&segment) {
                self.available_segments.remove(pos);
            }
        }
        self.current_experiments.insert(name, code);
        Ok(())
    }

    /// Deregister an experiment, returning its segments to the free list.
    pub fn remove_experiment(&mut self, name: &str) -> Result<(), NamespaceError> {
        if self.current_experiments.remove(name).is_none() {
            return Err(NamespaceError::UnknownExperiment(name.to_string()));
        }

        let freed: Vec<u64> = self
            .segment_allocations
            .iter()
            .filter(|(_, owner)| owner.as_str() == name)
            .map(|(segment, _)| *segment)
            .collect();
        for segment in &freed {
            self.segment_allocations.remove(segment);
        }
        self.available_segments.extend(freed);
        self.available_segments.sort_unstable();
        Ok(())
    }

    /// Select the segment for the current inputs and run the experiment
    /// owning it (or the default experiment for a free segment).
    ///
    /// Returns the experiment's interpreter after its run, so callers can
    /// read the outputs and the `in_experiment` flag.
    pub fn run(&mut self) -> Result<Interpreter, NamespaceError> {
        let segment = match self.selected_segment {
            Some(segment) => segment,
            None => {
                let segment = self.select_segment()?;
                self.selected_segment = Some(segment);
                segment
            }
        };

        let mut interpreter = match self.segment_allocations.get(&segment) {
            Some(name) => Interpreter::new(
                format!("{}.{}", self.name, name),
                self.current_experiments[name].clone(),
            )
            .with_name(format!("{}-{}", self.name, name))
            .with_inputs(self.inputs.clone()),
            None => Interpreter::new(self.name.clone(), self.default_experiment.clone())
                .with_name(self.name.clone())
                .with_inputs(self.inputs.clone()),
        };
        interpreter.run()?;
        Ok(interpreter)
    }

    /// The current segment → experiment-name assignment.
    pub fn segment_allocations(&self) -> &BTreeMap<u64, String> {
        &self.segment_allocations
    }

    /// The sorted free list.
    pub fn available_segments(&self) -> &[u64] {
        &self.available_segments
    }

    // ─────────────────────────────────────────────────────────────
    // Deterministic selection
    // ─────────────────────────────────────────────────────────────

    /// Sample `draws` segments from the free list with the experiment name
    /// as the unit and the namespace name as the salt.
    fn sample_segments(&self, name: &str, draws: u64) -> Result<Vec<u64>, EvalError> {
        let node = json!({
            "op": "sample",
            "choices": { "op": "array", "values": self.available_segments },
            "unit": name,
            "salt": self.name,
            "draws": draws,
        });
        let mut interpreter = Interpreter::new(self.name.clone(), Json::Null);
        match interpreter.evaluate(&node)? {
            Value::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Int(segment) => Ok(segment as u64),
                    other => Err(EvalError::TypeMismatch(format!(
                        "sampled segment is not an integer: {}",
                        other.type_name()
                    ))),
                })
                .collect(),
            other => Err(EvalError::TypeMismatch(format!(
                "sample returned {}",
                other.type_name()
            ))),
        }
    }

    /// Hash the primary unit onto a segment index.
    fn select_segment(&self) -> Result<u64, EvalError> {
        let node = json!({
            "op": "randomInteger",
            "min": 0,
            "max": self.num_segments - 1,
            "unit": { "op": "get", "var": self.primary_unit },
            "salt": self.name,
        });
        let mut interpreter =
            Interpreter::new(self.name.clone(), Json::Null).with_inputs(self.inputs.clone());
        match interpreter.evaluate(&node)? {
            Value::Int(segment) => Ok(segment as u64),
            other => Err(EvalError::TypeMismatch(format!(
                "selected segment is not an integer: {}",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespace() -> SimpleNamespace {
        let mut inputs = HashMap::new();
        inputs.insert("userid".to_string(), Value::Str("test-id".into()));
        SimpleNamespace::new("simple_namespace", 100, "userid", inputs)
    }

    #[test]
    fn test_new_namespace_has_all_segments_free() {
        let ns = namespace();
        assert_eq!(ns.available_segments().len(), 100);
        assert!(ns.segment_allocations().is_empty());
    }

    #[test]
    fn test_duplicate_experiment_rejected() {
        let mut ns = namespace();
        ns.add_experiment("a", json!({}), 10).unwrap();
        let err = ns.add_experiment("a", json!({}), 10).unwrap_err();
        assert!(matches!(err, NamespaceError::DuplicateExperiment(_)));
        // State unchanged by the failed add.
        assert_eq!(ns.available_segments().len(), 90);
    }

    #[test]
    fn test_insufficient_segments_rejected() {
        let mut ns = namespace();
        let err = ns.add_experiment("a", json!({}), 101).unwrap_err();
        assert!(matches!(err, NamespaceError::InsufficientSegments { .. }));
        assert_eq!(ns.available_segments().len(), 100);
    }

    #[test]
    fn test_remove_unknown_experiment_rejected() {
        let mut ns = namespace();
        assert!(matches!(
            ns.remove_experiment("missing").unwrap_err(),
            NamespaceError::UnknownExperiment(_)
        ));
    }
}
