//! Step identifier codec.
//!
//! Pure functions translating between the wire encoding of the wizard (flat
//! `"step|substep"` identifiers) and the hierarchical model the controller
//! works with. No state and no I/O; deterministic for a given input.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{FormatError, StructureInconsistency, WizardError};
use crate::state::{
    CurrentPosition, StepDescriptor, StepIdentifier, StepValue, StepValueMap, WizardPayload,
    WizardState, WizardStructure,
};

/// Separator between a step name and its sub-step in the wire encoding.
/// Never appears inside a step or sub-step name.
pub const SUB_STEP_SEPARATOR: char = '|';

/// Parse a textual step identifier.
///
/// More than one separator is malformed input and is rejected instead of
/// silently truncated.
pub fn parse_identifier(raw: &str) -> Result<StepIdentifier, FormatError> {
    let parts: Vec<&str> = raw.split(SUB_STEP_SEPARATOR).collect();
    match parts.as_slice() {
        [step] => Ok(StepIdentifier::Simple(step.to_string())),
        [step, sub_step] => Ok(StepIdentifier::Sub {
            step: step.to_string(),
            sub_step: sub_step.to_string(),
        }),
        _ => Err(FormatError::MalformedIdentifier {
            raw: raw.to_string(),
        }),
    }
}

/// Canonical textual encoding of a step / sub-step pair, the inverse of
/// [`parse_identifier`].
pub fn encode_identifier(step: &str, sub_step: Option<&str>) -> String {
    match sub_step {
        Some(sub_step) => format!("{}{}{}", step, SUB_STEP_SEPARATOR, sub_step),
        None => step.to_string(),
    }
}

/// Fold the flat ordered identifier list into the hierarchical structure.
///
/// Composite descriptors are created at the position their step name is
/// first seen; repeated sub-steps are ignored (first-seen wins). A step name
/// used both with and without sub-steps, or a repeated simple step, is
/// malformed server input.
pub fn build_structure(flat_names: &[String]) -> Result<WizardStructure, FormatError> {
    let mut descriptors: Vec<StepDescriptor> = Vec::new();

    for raw in flat_names {
        match parse_identifier(raw)? {
            StepIdentifier::Simple(step) => {
                let existing = descriptors.iter().position(|d| d.step() == step);
                match existing {
                    Some(index) => {
                        return Err(match descriptors[index] {
                            StepDescriptor::Simple(_) => FormatError::DuplicateStep { step },
                            StepDescriptor::Composite { .. } => FormatError::MixedStep { step },
                        });
                    }
                    None => descriptors.push(StepDescriptor::Simple(step)),
                }
            }
            StepIdentifier::Sub { step, sub_step } => {
                let existing = descriptors.iter().position(|d| d.step() == step);
                match existing {
                    Some(index) => match &mut descriptors[index] {
                        StepDescriptor::Composite { sub_steps, .. } => {
                            if !sub_steps.contains(&sub_step) {
                                sub_steps.push(sub_step);
                            }
                        }
                        StepDescriptor::Simple(_) => {
                            return Err(FormatError::MixedStep { step });
                        }
                    },
                    None => descriptors.push(StepDescriptor::Composite {
                        step,
                        sub_steps: vec![sub_step],
                    }),
                }
            }
        }
    }

    Ok(WizardStructure::new(descriptors))
}

/// Fold the flat per-step data map into the nested value map.
///
/// The same decomposition rule as [`build_structure`] applied to the map's
/// keys; the result does not depend on key iteration order.
pub fn build_value_map(flat: &serde_json::Map<String, Value>) -> Result<StepValueMap, FormatError> {
    let mut entries: HashMap<String, StepValue> = HashMap::new();

    for (raw, value) in flat {
        match parse_identifier(raw)? {
            StepIdentifier::Simple(step) => {
                if entries
                    .insert(step.clone(), StepValue::Single(value.clone()))
                    .is_some()
                {
                    return Err(FormatError::MixedStep { step });
                }
            }
            StepIdentifier::Sub { step, sub_step } => {
                let entry = entries
                    .entry(step.clone())
                    .or_insert_with(|| StepValue::Nested(HashMap::new()));
                match entry {
                    StepValue::Nested(values) => {
                        values.insert(sub_step, value.clone());
                    }
                    StepValue::Single(_) => {
                        return Err(FormatError::MixedStep { step });
                    }
                }
            }
        }
    }

    Ok(StepValueMap::new(entries))
}

/// Resolve the current position from the wire `current_step` field.
///
/// A null current step falls back to the first step of the structure for a
/// running wizard, or the last step for a finished one (a finished wizard is
/// presented "at" its final step).
pub fn resolve_current_position(
    raw_current: Option<&str>,
    structure: &WizardStructure,
    done: bool,
) -> Result<CurrentPosition, FormatError> {
    if let Some(raw) = raw_current {
        return Ok(parse_identifier(raw)?.into());
    }

    let fallback = if done {
        structure.last()
    } else {
        structure.first()
    };
    let descriptor = fallback.ok_or_else(|| FormatError::MissingField {
        field: "structure".to_string(),
    })?;

    let sub_steps = descriptor.sub_steps();
    let sub_step = if done {
        sub_steps.last()
    } else {
        sub_steps.first()
    };

    Ok(CurrentPosition::new(
        descriptor.step(),
        sub_step.map(String::as_str),
    ))
}

/// Check that every value-map entry resolves against the structure.
///
/// Structure steps without data are legal (the server has not computed them
/// yet); data without a structural counterpart, or with the wrong shape, is
/// surfaced as an inconsistency, never repaired.
pub fn verify_consistency(
    structure: &WizardStructure,
    steps: &StepValueMap,
) -> Result<(), StructureInconsistency> {
    for (step, value) in steps.iter() {
        match (structure.descriptor(step), value) {
            (Some(StepDescriptor::Simple(_)), StepValue::Single(_)) => {}
            (Some(StepDescriptor::Composite { sub_steps, .. }), StepValue::Nested(values)) => {
                for sub_step in values.keys() {
                    if !sub_steps.contains(sub_step) {
                        return Err(StructureInconsistency {
                            identifier: encode_identifier(step, Some(sub_step)),
                        });
                    }
                }
            }
            _ => {
                return Err(StructureInconsistency {
                    identifier: step.clone(),
                })
            }
        }
    }
    Ok(())
}

/// Normalize a raw wizard payload into the owned state: build the structure
/// and value map, verify their consistency, resolve the current position.
pub fn normalize(payload: &WizardPayload) -> Result<WizardState, WizardError> {
    let structure = build_structure(&payload.structure)?;
    let steps = build_value_map(&payload.steps)?;
    verify_consistency(&structure, &steps)?;
    let current = resolve_current_position(payload.current_step.as_deref(), &structure, payload.done)?;

    Ok(WizardState {
        structure,
        steps,
        current,
        done: payload.done,
        valid: payload.valid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_simple_identifier() {
        assert_eq!(
            parse_identifier("a"),
            Ok(StepIdentifier::Simple("a".to_string()))
        );
    }

    #[test]
    fn test_parse_sub_step_identifier() {
        assert_eq!(
            parse_identifier("b|x"),
            Ok(StepIdentifier::Sub {
                step: "b".to_string(),
                sub_step: "x".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_rejects_multiple_separators() {
        assert_eq!(
            parse_identifier("a|b|c"),
            Err(FormatError::MalformedIdentifier {
                raw: "a|b|c".to_string()
            })
        );
    }

    #[test]
    fn test_encode_round_trip() {
        for (step, sub_step) in [("a", None), ("b", Some("x"))] {
            let encoded = encode_identifier(step, sub_step);
            let parsed = parse_identifier(&encoded).expect("well-formed");
            assert_eq!(parsed.step(), step);
            assert_eq!(parsed.sub_step(), sub_step);
        }
    }

    #[test]
    fn test_build_structure_all_simple() {
        let structure = build_structure(&flat(&["a", "b", "c"])).expect("structure");
        let steps: Vec<&str> = structure.descriptors().iter().map(|d| d.step()).collect();
        assert_eq!(steps, ["a", "b", "c"]);
        assert!(structure
            .descriptors()
            .iter()
            .all(|d| matches!(d, StepDescriptor::Simple(_))));
    }

    #[test]
    fn test_build_structure_groups_sub_steps() {
        let structure = build_structure(&flat(&["a", "b|x", "b|y"])).expect("structure");
        assert_eq!(structure.len(), 2);
        assert_eq!(structure.step_by_index(0), Some("a"));
        assert_eq!(structure.sub_step_names("b"), ["x", "y"]);
    }

    #[test]
    fn test_build_structure_keeps_first_seen_position() {
        let structure = build_structure(&flat(&["b|x", "a", "b|y"]));
        // "b" was created before "a"; "b|y" joins the existing descriptor
        let structure = structure.expect("structure");
        assert_eq!(structure.step_by_index(0), Some("b"));
        assert_eq!(structure.step_by_index(1), Some("a"));
        assert_eq!(structure.sub_step_names("b"), ["x", "y"]);
    }

    #[test]
    fn test_build_structure_is_deterministic() {
        let names = flat(&["a", "b|x", "b|y", "c"]);
        assert_eq!(
            build_structure(&names).expect("first"),
            build_structure(&names).expect("second")
        );
    }

    #[test]
    fn test_build_structure_ignores_repeated_sub_steps() {
        let structure = build_structure(&flat(&["b|x", "b|x", "b|y"])).expect("structure");
        assert_eq!(structure.sub_step_names("b"), ["x", "y"]);
    }

    #[test]
    fn test_build_structure_rejects_mixed_usage() {
        assert_eq!(
            build_structure(&flat(&["a", "a|x"])),
            Err(FormatError::MixedStep {
                step: "a".to_string()
            })
        );
        assert_eq!(
            build_structure(&flat(&["a|x", "a"])),
            Err(FormatError::MixedStep {
                step: "a".to_string()
            })
        );
    }

    #[test]
    fn test_build_structure_rejects_duplicate_simple_steps() {
        assert_eq!(
            build_structure(&flat(&["a", "a"])),
            Err(FormatError::DuplicateStep {
                step: "a".to_string()
            })
        );
    }

    #[test]
    fn test_build_value_map_nests_sub_steps() {
        let map = match json!({"a": 1, "b|x": "vx", "b|y": "vy"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let values = build_value_map(&map).expect("values");
        assert_eq!(values.len(), 2);
        assert!(matches!(values.get("a"), Some(StepValue::Single(v)) if v == &json!(1)));
        assert_eq!(values.sub_value("b", "x"), Some(&json!("vx")));
        assert_eq!(values.sub_value("b", "y"), Some(&json!("vy")));
    }

    #[test]
    fn test_build_value_map_rejects_mixed_usage() {
        let map = match json!({"a": 1, "a|x": 2}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert_eq!(
            build_value_map(&map),
            Err(FormatError::MixedStep {
                step: "a".to_string()
            })
        );
    }

    #[test]
    fn test_resolve_explicit_current_step() {
        let structure = build_structure(&flat(&["a", "b|x", "b|y"])).expect("structure");
        let position =
            resolve_current_position(Some("b|x"), &structure, false).expect("position");
        assert_eq!(position, CurrentPosition::new("b", Some("x")));
    }

    #[test]
    fn test_resolve_falls_back_to_first_step() {
        let structure = build_structure(&flat(&["a", "b|x", "b|y"])).expect("structure");
        let position = resolve_current_position(None, &structure, false).expect("position");
        assert_eq!(position, CurrentPosition::new("a", None));
    }

    #[test]
    fn test_resolve_falls_back_to_last_sub_step_when_done() {
        let structure = build_structure(&flat(&["a", "b|x", "b|y"])).expect("structure");
        let position = resolve_current_position(None, &structure, true).expect("position");
        assert_eq!(position, CurrentPosition::new("b", Some("y")));
    }

    #[test]
    fn test_resolve_rejects_empty_structure() {
        let structure = WizardStructure::default();
        assert_eq!(
            resolve_current_position(None, &structure, false),
            Err(FormatError::MissingField {
                field: "structure".to_string()
            })
        );
    }

    #[test]
    fn test_verify_consistency_accepts_missing_entries() {
        let structure = build_structure(&flat(&["a", "b|x", "b|y"])).expect("structure");
        let values = build_value_map(match &json!({"a": 1}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        })
        .expect("values");
        assert!(verify_consistency(&structure, &values).is_ok());
    }

    #[test]
    fn test_verify_consistency_rejects_unknown_step() {
        let structure = build_structure(&flat(&["a"])).expect("structure");
        let values = build_value_map(match &json!({"z": 1}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        })
        .expect("values");
        assert_eq!(
            verify_consistency(&structure, &values),
            Err(StructureInconsistency {
                identifier: "z".to_string()
            })
        );
    }

    #[test]
    fn test_verify_consistency_rejects_unknown_sub_step() {
        let structure = build_structure(&flat(&["b|x"])).expect("structure");
        let values = build_value_map(match &json!({"b|z": 1}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        })
        .expect("values");
        assert_eq!(
            verify_consistency(&structure, &values),
            Err(StructureInconsistency {
                identifier: "b|z".to_string()
            })
        );
    }

    #[test]
    fn test_verify_consistency_rejects_shape_mismatch() {
        // nested data for a step the structure says is simple
        let structure = build_structure(&flat(&["a"])).expect("structure");
        let values = StepValueMap::new(
            [(
                "a".to_string(),
                StepValue::Nested([("x".to_string(), json!(1))].into_iter().collect()),
            )]
            .into_iter()
            .collect(),
        );
        assert_eq!(
            verify_consistency(&structure, &values),
            Err(StructureInconsistency {
                identifier: "a".to_string()
            })
        );
    }

    #[test]
    fn test_normalize_full_payload() {
        let payload: WizardPayload = serde_json::from_value(json!({
            "structure": ["a", "b|x", "b|y"],
            "steps": {"a": 1, "b|x": "vx"},
            "current_step": "b|x",
            "done": false,
            "valid": false
        }))
        .expect("payload");
        let state = normalize(&payload).expect("state");
        assert_eq!(state.current.full_step, "b|x");
        assert_eq!(state.structure.len(), 2);
        assert_eq!(state.sub_step_value("x"), Some(&json!("vx")));
        assert!(!state.done);
        assert!(!state.valid);
    }
}

// ---------------------------------------------------------------------------
// Property tests — codec laws
// ---------------------------------------------------------------------------

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // -- Strategy helpers --

    /// Step and sub-step names never contain the separator.
    fn arb_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,7}"
    }

    /// A flat identifier list honouring the structure invariants: unique step
    /// names, each either simple or carrying 1..4 unique sub-steps.
    fn arb_flat_names() -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set("[a-z]{1,6}", 1..5).prop_flat_map(|names| {
            names
                .into_iter()
                .map(|name| {
                    let simple = Just(vec![name.clone()]);
                    let composite = prop::collection::btree_set("[a-z]{1,4}", 1..4).prop_map(
                        move |sub_steps| {
                            sub_steps
                                .into_iter()
                                .map(|sub_step| format!("{}|{}", name, sub_step))
                                .collect::<Vec<_>>()
                        },
                    );
                    prop_oneof![simple, composite].boxed()
                })
                .collect::<Vec<_>>()
        })
        .prop_map(|groups| groups.into_iter().flatten().collect())
    }

    proptest! {
        /// Round-trip law: parsing the encoding yields the original pair.
        #[test]
        fn identifier_round_trip(step in arb_name(), sub_step in prop::option::of(arb_name())) {
            let encoded = encode_identifier(&step, sub_step.as_deref());
            let parsed = parse_identifier(&encoded).expect("well-formed identifier");
            prop_assert_eq!(parsed.step(), step.as_str());
            prop_assert_eq!(parsed.sub_step(), sub_step.as_deref());
        }

        /// Determinism: the same flat list always folds to an equal structure.
        #[test]
        fn build_structure_idempotent(names in arb_flat_names()) {
            let first = build_structure(&names).expect("structure");
            let second = build_structure(&names).expect("structure");
            prop_assert_eq!(first, second);
        }

        /// All-simple lists fold to one simple descriptor per element,
        /// order preserved.
        #[test]
        fn all_simple_lists_keep_order(names in prop::collection::btree_set("[a-z]{1,6}", 1..6)) {
            let names: Vec<String> = names.into_iter().collect();
            let structure = build_structure(&names).expect("structure");
            prop_assert_eq!(structure.len(), names.len());
            for (index, name) in names.iter().enumerate() {
                prop_assert_eq!(structure.step_by_index(index), Some(name.as_str()));
            }
        }
    }
}
