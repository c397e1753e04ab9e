//! Field flattening
//!
//! Walks a nested record and emits one [`FieldVote`] per leaf. Mappings
//! recurse; lists are serialized whole and vote as a single unit; scalars are
//! stringified with `null` becoming the empty string.

use crate::config::ListVotePolicy;
use quorum_domain::{FieldPath, FieldVote, ModelRun, Record};
use serde_json::Value;

/// Flatten a structured record into votes tagged with the run that produced it
///
/// Votes are emitted in the record's key order.
///
/// # Examples
///
/// ```
/// use quorum_domain::ModelRun;
/// use quorum_extractor::{flatten_record, ListVotePolicy};
/// use serde_json::json;
///
/// let record = json!({"patient_info": {"name": "Alice", "age": 42}});
/// let votes = flatten_record(
///     record.as_object().unwrap(),
///     &ModelRun::new("llava", 1),
///     ListVotePolicy::OrderSensitive,
/// );
/// assert_eq!(votes.len(), 2);
/// assert_eq!(votes[0].field_path.to_string(), "patient_info.name");
/// assert_eq!(votes[1].serialized_value, "42");
/// ```
pub fn flatten_record(record: &Record, run: &ModelRun, policy: ListVotePolicy) -> Vec<FieldVote> {
    let mut votes = Vec::new();
    for (key, value) in record {
        walk(FieldPath::root(key.as_str()), value, run, policy, &mut votes);
    }
    votes
}

fn walk(path: FieldPath, value: &Value, run: &ModelRun, policy: ListVotePolicy, out: &mut Vec<FieldVote>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(path.child(key.as_str()), child, run, policy, out);
            }
        }
        leaf => out.push(FieldVote::new(
            path,
            serialize_leaf(leaf, policy),
            run.model_identity.as_str(),
            run.run_index,
        )),
    }
}

/// Turn a leaf value into its vote token
pub fn serialize_leaf(value: &Value, policy: ListVotePolicy) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => serialize_list(items, policy),
        // Mappings never reach here from `walk`
        Value::Object(_) => value.to_string(),
    }
}

fn serialize_list(items: &[Value], policy: ListVotePolicy) -> String {
    match policy {
        ListVotePolicy::OrderSensitive => Value::Array(items.to_vec()).to_string(),
        ListVotePolicy::Canonical => {
            let mut keyed: Vec<(String, &Value)> = items.iter().map(|v| (v.to_string(), v)).collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Vec<Value> = keyed.into_iter().map(|(_, v)| v.clone()).collect();
            Value::Array(sorted).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn run() -> ModelRun {
        ModelRun::new("llava:7b", 2)
    }

    fn flatten(value: Value, policy: ListVotePolicy) -> Vec<FieldVote> {
        match value {
            Value::Object(map) => flatten_record(&map, &run(), policy),
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_nested_paths_and_tags() {
        let votes = flatten(
            json!({"patient_info": {"name": "Alice", "address": {"city": "Taipei"}}}),
            ListVotePolicy::OrderSensitive,
        );
        let paths: Vec<_> = votes.iter().map(|v| v.field_path.to_string()).collect();
        assert_eq!(paths, ["patient_info.name", "patient_info.address.city"]);
        assert!(votes.iter().all(|v| v.model_identity == "llava:7b" && v.run_index == 2));
    }

    #[test]
    fn test_scalar_stringification() {
        let votes = flatten(
            json!({"a": null, "b": true, "c": 3.5, "d": "", "e": -7}),
            ListVotePolicy::OrderSensitive,
        );
        let values: Vec<_> = votes.iter().map(|v| v.serialized_value.as_str()).collect();
        assert_eq!(values, ["", "true", "3.5", "", "-7"]);
    }

    #[test]
    fn test_zero_and_false_are_real_votes() {
        let votes = flatten(json!({"count": 0, "smoker": false}), ListVotePolicy::OrderSensitive);
        let values: Vec<_> = votes.iter().map(|v| v.serialized_value.as_str()).collect();
        assert_eq!(values, ["0", "false"]);
    }

    #[test]
    fn test_list_is_single_vote() {
        let votes = flatten(
            json!({"medications": ["A", {"dose": 2}]}),
            ListVotePolicy::OrderSensitive,
        );
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].serialized_value, r#"["A",{"dose":2}]"#);
    }

    #[test]
    fn test_list_order_matters_by_default() {
        let ab = flatten(json!({"m": ["A", "B"]}), ListVotePolicy::OrderSensitive);
        let ba = flatten(json!({"m": ["B", "A"]}), ListVotePolicy::OrderSensitive);
        assert_ne!(ab[0].serialized_value, ba[0].serialized_value);
    }

    #[test]
    fn test_canonical_policy_ignores_list_order() {
        let ab = flatten(json!({"m": ["A", "B"]}), ListVotePolicy::Canonical);
        let ba = flatten(json!({"m": ["B", "A"]}), ListVotePolicy::Canonical);
        assert_eq!(ab[0].serialized_value, ba[0].serialized_value);
        assert_eq!(ab[0].serialized_value, r#"["A","B"]"#);
    }

    #[test]
    fn test_empty_mapping_contributes_nothing() {
        assert!(flatten(json!({"a": {}}), ListVotePolicy::OrderSensitive).is_empty());
        assert!(flatten(json!({}), ListVotePolicy::OrderSensitive).is_empty());
    }

    #[test]
    fn test_dotted_key_kept_as_one_segment() {
        let votes = flatten(json!({"a.b": {"c": "x"}}), ListVotePolicy::OrderSensitive);
        assert_eq!(votes[0].field_path.segments(), ["a.b", "c"]);
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,6}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn count_leaves(value: &Value) -> usize {
        match value {
            Value::Object(map) => map.values().map(count_leaves).sum(),
            _ => 1,
        }
    }

    proptest! {
        #[test]
        fn prop_one_vote_per_leaf(
            map in prop::collection::btree_map("[a-z]{1,4}", arb_value(), 0..5)
        ) {
            let record: Record = map.into_iter().collect();
            let expected: usize = record.values().map(count_leaves).sum();
            let votes = flatten_record(&record, &run(), ListVotePolicy::OrderSensitive);
            prop_assert_eq!(votes.len(), expected);
        }
    }
}
