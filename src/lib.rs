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

#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

use thiserror::Error;

pub mod assertions;
pub mod client;
pub mod domain;
pub mod fixtures;
pub mod json_diff;
pub mod message;

pub use assertions::{
    assert_body_value, assert_response_body, assert_schema, assert_status_code,
    assert_subset_json, assert_subset_json_with, Schema, TypedModel,
};
pub use client::{ApiClient, ClientConfig, ClientError};
pub use domain::{ApiRequest, HttpMethod, RequestSnapshot, ResponseSnapshot};
pub use fixtures::{FixtureError, Fixtures};
pub use json_diff::path::{JSONPath, Path};
pub use json_diff::{
    diff, remove_ids, strip_ids, Config, DiffEntry, DiffResult, IdFields, NumericMode,
};
pub use message::{MessageBuilder, Place};

/// Error returned by the assertion operations.
#[derive(Debug, Error)]
pub enum AssertionError {
    /// The check failed; the payload is the full failure report.
    #[error("{0}")]
    Failed(String),
    /// The JSON schema validator rejected the body.
    #[error(transparent)]
    Schema(#[from] jsonschema::ValidationError<'static>),
    /// The body is not JSON, or it does not deserialize into the model type.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AssertionError {
    /// The failure report, when this is an assertion failure.
    pub fn report(&self) -> Option<&str> {
        match self {
            AssertionError::Failed(message) => Some(message),
            _ => None,
        }
    }
}
