// Copyright 2024 The DocAssert Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use regex::Regex;
use serde_json::{Map, Value};

/// Rule deciding which object keys hold identifiers.
///
/// The default rule matches the key `id` exactly and nothing else, so
/// `user_id`, `ID` or `uuid` are kept. Use [`IdFields::Pattern`] for suffix
/// or case-insensitive rules.
#[derive(Debug, Clone)]
pub enum IdFields {
    /// Keys equal to one of the listed names (case-sensitive).
    Exact(Vec<String>),
    /// Keys matched by the regular expression.
    Pattern(Regex),
}

impl IdFields {
    pub fn exact<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IdFields::Exact(keys.into_iter().map(Into::into).collect())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(IdFields::Pattern(Regex::new(pattern)?))
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            IdFields::Exact(keys) => keys.iter().any(|k| k == key),
            IdFields::Pattern(re) => re.is_match(key),
        }
    }
}

impl Default for IdFields {
    fn default() -> Self {
        IdFields::exact(["id"])
    }
}

/// Returns a copy of `value` with every identifier field removed, at any depth.
pub fn strip_ids(value: &Value, fields: &IdFields) -> Value {
    match value {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .filter(|(key, _)| !fields.matches(key))
                .map(|(key, value)| (key.clone(), strip_ids(value, fields)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| strip_ids(v, fields)).collect()),
        scalar => scalar.clone(),
    }
}

/// [`strip_ids`] with the default rule (the literal key `id`).
pub fn remove_ids(value: &Value) -> Value {
    strip_ids(value, &IdFields::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_removes_literal_id_at_every_depth() {
        let value = json!({
            "id": 7,
            "name": "phone",
            "data": { "id": "abc", "color": "red" },
            "items": [{ "id": 1, "qty": 2 }, { "qty": 3 }]
        });

        assert_eq!(
            remove_ids(&value),
            json!({
                "name": "phone",
                "data": { "color": "red" },
                "items": [{ "qty": 2 }, { "qty": 3 }]
            })
        );
    }

    #[test]
    fn test_default_rule_is_exact() {
        let value = json!({ "id": 1, "user_id": 2, "ID": 3, "uuid": 4, "idle": true });
        assert_eq!(
            remove_ids(&value),
            json!({ "user_id": 2, "ID": 3, "uuid": 4, "idle": true })
        );
    }

    #[test]
    fn test_exact_key_set() {
        let fields = IdFields::exact(["id", "uuid"]);
        let value = json!({ "id": 1, "uuid": "x", "name": "a" });
        assert_eq!(strip_ids(&value, &fields), json!({ "name": "a" }));
    }

    #[test]
    fn test_pattern_rule() {
        let fields = IdFields::pattern(r"(^|_)id$").unwrap();
        let value = json!({ "id": 1, "user_id": 2, "idle": true, "valid": false });
        assert_eq!(
            strip_ids(&value, &fields),
            json!({ "idle": true, "valid": false })
        );
    }

    #[test]
    fn test_scalars_and_input_untouched() {
        assert_eq!(remove_ids(&json!("id")), json!("id"));
        assert_eq!(remove_ids(&json!(null)), json!(null));

        let value = json!({ "id": 1 });
        let stripped = remove_ids(&value);
        assert_eq!(stripped, json!({}));
        assert_eq!(value, json!({ "id": 1 }));
    }

    #[test]
    fn test_preserves_key_order() {
        let value = json!({ "z": 1, "id": 2, "a": 3 });
        let keys: Vec<String> = remove_ids(&value)
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(
                    (prop_oneof![Just("id".to_string()), "[a-z]{1,4}"], inner),
                    0..4
                )
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn remove_ids_is_idempotent(value in arb_json()) {
            let once = remove_ids(&value);
            prop_assert_eq!(remove_ids(&once), once);
        }
    }
}
