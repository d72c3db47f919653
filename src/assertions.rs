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

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::domain::ResponseSnapshot;
use crate::json_diff::path::Path;
use crate::json_diff::{diff, strip_ids, Config};
use crate::message::MessageBuilder;
use crate::AssertionError;

/// Structural validation of a single JSON value.
///
/// Errors are returned as produced by the validator, without rewording.
pub trait Schema {
    fn validate_item(&self, item: &Value) -> Result<(), AssertionError>;
}

impl Schema for jsonschema::Validator {
    fn validate_item(&self, item: &Value) -> Result<(), AssertionError> {
        self.validate(item)
            .map_err(|err| AssertionError::Schema(err.to_owned()))
    }
}

/// Validates by deserializing into `T`, so the model type is the schema.
///
/// Deserialization from a [`Value`] never coerces between JSON types; add
/// `#[serde(deny_unknown_fields)]` to `T` to also reject extra fields.
pub struct TypedModel<T>(PhantomData<fn() -> T>);

impl<T> TypedModel<T> {
    pub fn new() -> Self {
        TypedModel(PhantomData)
    }
}

impl<T> Default for TypedModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Schema for TypedModel<T> {
    fn validate_item(&self, item: &Value) -> Result<(), AssertionError> {
        T::deserialize(item).map(|_| ()).map_err(AssertionError::Json)
    }
}

/// Fails when the response status differs from `expected_code`.
pub fn assert_status_code(
    response: &ResponseSnapshot,
    expected_code: u16,
) -> Result<(), AssertionError> {
    let actual_code = response.status();
    if actual_code == expected_code {
        return Ok(());
    }

    debug!(expected_code, actual_code, "response code mismatch");
    let message = MessageBuilder::code(response)
        .add_code_result(expected_code, actual_code)
        .add_request_url()
        .add_response_info()
        .message();
    Err(AssertionError::Failed(message))
}

/// Validates the response body against `model`; every element is validated
/// when the body is an array.
pub fn assert_schema<S>(response: &ResponseSnapshot, model: &S) -> Result<(), AssertionError>
where
    S: Schema + ?Sized,
{
    match response.json()? {
        Value::Array(items) => items.iter().try_for_each(|item| model.validate_item(item)),
        body => model.validate_item(&body),
    }
}

/// Fails when `actual` does not contain every field and element of `expected`.
pub fn assert_subset_json(
    response: &ResponseSnapshot,
    expected: &Value,
    actual: &Value,
) -> Result<(), AssertionError> {
    assert_subset_json_with(response, expected, actual, &Config::new())
}

/// [`assert_subset_json`] with explicit comparison settings. When the config
/// asks for it, identifier fields are stripped from both sides first.
pub fn assert_subset_json_with(
    response: &ResponseSnapshot,
    expected: &Value,
    actual: &Value,
    config: &Config,
) -> Result<(), AssertionError> {
    match config.id_fields() {
        Some(fields) => {
            let expected = strip_ids(expected, fields);
            let actual = strip_ids(actual, fields);
            compare_subset(response, &expected, &actual, config)
        }
        None => compare_subset(response, expected, actual, config),
    }
}

/// Parses the response body and checks it contains `expected`.
pub fn assert_response_body(
    response: &ResponseSnapshot,
    expected: &Value,
    config: &Config,
) -> Result<(), AssertionError> {
    let actual = response.json()?;
    assert_subset_json_with(response, expected, &actual, config)
}

/// Fails when a single value taken from the body differs from `expected`.
/// `note` is added to the report to say which value was checked.
pub fn assert_body_value(
    response: &ResponseSnapshot,
    expected: &Value,
    actual: &Value,
    note: &str,
) -> Result<(), AssertionError> {
    if expected == actual {
        return Ok(());
    }

    debug!(%expected, %actual, note, "response body value mismatch");
    let message = MessageBuilder::body(response)
        .add_value_result(expected, actual)
        .add_error_info(note)
        .add_request_url()
        .add_response_info()
        .message();
    Err(AssertionError::Failed(message))
}

fn compare_subset<'a>(
    response: &ResponseSnapshot,
    expected: &'a Value,
    actual: &'a Value,
    config: &Config<'a>,
) -> Result<(), AssertionError> {
    let diff = diff(expected, actual, Path::for_actual(actual), config);
    if diff.is_empty() {
        return Ok(());
    }

    debug!(mismatches = diff.len(), "response body does not contain expected json");
    for entry in diff.values() {
        debug!("{}", entry);
    }

    let message = MessageBuilder::body(response)
        .add_diff_result(&diff)
        .add_request_url()
        .add_response_info()
        .message();
    Err(AssertionError::Failed(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HttpMethod, RequestSnapshot};
    use crate::json_diff::path::JSONPath;
    use crate::json_diff::{IdFields, NumericMode};
    use serde::Deserialize;
    use serde_json::json;

    fn response(status: u16, body: &str) -> ResponseSnapshot {
        let request = RequestSnapshot::new(HttpMethod::Get, "https://api.test/objects")
            .with_header("accept", "application/json");
        ResponseSnapshot::new(status, body, request)
    }

    fn failure_message(result: Result<(), AssertionError>) -> String {
        match result {
            Err(AssertionError::Failed(message)) => message,
            other => panic!("expected an assertion failure, got {:?}", other),
        }
    }

    #[test]
    fn test_status_code() {
        let ok = response(200, "{}");
        assert!(assert_status_code(&ok, 200).is_ok());

        let message = failure_message(assert_status_code(&ok, 201));
        assert!(message.starts_with("IN RESPONSE CODE \n\texpected code: 201\n\tactual code: 200\n"));
        assert!(message.contains("\tURL: https://api.test/objects\n"));
        assert!(message.ends_with("Response body:\n\t{}\n"));
    }

    #[test]
    fn test_subset_passes_with_extra_fields() {
        let response = response(200, "{}");
        let expected = json!({ "name": "Alice", "age": 30 });
        let actual = json!({ "name": "Alice", "age": 30, "extra": true });
        assert!(assert_subset_json(&response, &expected, &actual).is_ok());
    }

    #[test]
    fn test_subset_failure_message() {
        let response = response(200, r#"{"name":"Alice","age":31}"#);
        let expected = json!({ "name": "Alice", "age": 30 });
        let actual = response.json().unwrap();

        let message = failure_message(assert_subset_json(&response, &expected, &actual));
        assert_eq!(
            message,
            "IN RESPONSE BODY in json following field didn't match with reference:\n\
             key: age\n\t\texpected: 30 \n\t\tactual: 31\n\
             The content of the sent request (url, query params, body):\n\
             \tURL: https://api.test/objects\n\
             \tmethod: GET\n\
             \theaders: {accept: application/json}\n\
             \tquery params:\n\
             \tbody:\n\
             Response body:\n\t{\"name\":\"Alice\",\"age\":31}\n"
        );
    }

    #[test]
    fn test_subset_array_root_marker() {
        let response = response(200, "[]");
        let expected = json!([{ "id": 1 }, { "id": 2 }]);
        let actual = json!([{ "id": 1 }]);

        let message = failure_message(assert_subset_json(&response, &expected, &actual));
        assert!(message.contains("key: root:[1]\n\t\texpected: {\"id\":2} \n\t\tactual: <missing>\n"));
    }

    #[test]
    fn test_identical_failures_render_identically() {
        let response = response(200, "{}");
        let expected = json!({ "a": [1, 2], "b": { "c": null } });
        let actual = json!({ "a": [2], "b": {} });

        let first = failure_message(assert_subset_json(&response, &expected, &actual));
        let second = failure_message(assert_subset_json(&response, &expected, &actual));
        assert_eq!(first, second);
    }

    #[test]
    fn test_strip_ids_is_opt_in() {
        let response = response(200, "{}");
        let expected = json!([{ "id": 1, "name": "phone" }]);
        let actual = json!([{ "id": 42, "name": "phone", "price": 10 }]);

        assert!(assert_subset_json(&response, &expected, &actual).is_err());

        let config = Config::new().strip_ids(IdFields::default());
        assert!(assert_subset_json_with(&response, &expected, &actual, &config).is_ok());
        assert_eq!(actual, json!([{ "id": 42, "name": "phone", "price": 10 }]));
    }

    #[test]
    fn test_ignore_path_and_numeric_mode() {
        let response = response(200, "{}");
        let expected = json!({ "created_at": "yesterday", "price": 10 });
        let actual = json!({ "created_at": "today", "price": 10.0 });

        let config = Config::new().ignore_path("$.created_at".jsonpath().unwrap());
        assert!(assert_subset_json_with(&response, &expected, &actual, &config).is_ok());

        let config = config.numeric_mode(NumericMode::Strict);
        let message =
            failure_message(assert_subset_json_with(&response, &expected, &actual, &config));
        assert!(message.contains("key: price\n\t\texpected: 10 \n\t\tactual: 10.0\n"));
    }

    #[test]
    fn test_response_body() {
        let ok = response(200, r#"{"id": 5, "name": "phone", "data": {"color": "red"}}"#);
        let config = Config::new().strip_ids(IdFields::default());
        assert!(assert_response_body(&ok, &json!({ "id": 1, "name": "phone" }), &config).is_ok());

        let broken = response(200, "not json");
        assert!(matches!(
            assert_response_body(&broken, &json!({}), &config),
            Err(AssertionError::Json(_))
        ));
    }

    #[test]
    fn test_body_value() {
        let response = response(200, "{}");
        assert!(assert_body_value(&response, &json!("a"), &json!("a"), "name").is_ok());

        let message = failure_message(assert_body_value(&response, &json!(1), &json!("1"), "count"));
        assert!(message.starts_with("\texpected: 1\n\tactual: \"1\"\n\ncount\nThe content of the sent request"));
    }

    #[test]
    fn test_schema_with_json_schema() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        });
        let validator = jsonschema::validator_for(&schema).unwrap();

        assert!(assert_schema(&response(200, r#"{"name": "a"}"#), &validator).is_ok());
        assert!(assert_schema(&response(200, r#"[{"name": "a"}, {"name": "b"}]"#), &validator).is_ok());

        let result = assert_schema(&response(200, r#"[{"name": "a"}, {"name": 1}]"#), &validator);
        assert!(matches!(result, Err(AssertionError::Schema(_))));
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    #[allow(dead_code)]
    struct Item {
        name: String,
        price: u32,
    }

    #[test]
    fn test_schema_with_typed_model() {
        let model = TypedModel::<Item>::new();

        assert!(assert_schema(&response(200, r#"{"name": "a", "price": 1}"#), &model).is_ok());
        assert!(assert_schema(&response(200, r#"[{"name": "a", "price": 1}]"#), &model).is_ok());

        for body in [
            r#"{"name": "a", "price": "1"}"#,
            r#"{"name": "a"}"#,
            r#"[{"name": "a", "price": 1, "extra": 0}]"#,
            "not json",
        ] {
            assert!(matches!(
                assert_schema(&response(200, body), &model),
                Err(AssertionError::Json(_))
            ));
        }
    }
}
