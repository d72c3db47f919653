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

//! Partial ("left in right") JSON comparison.
//!
//! The expected value is a subset specification: every object key and array
//! position it names must be present in the actual value with an equal value.
//! Keys and trailing elements that only exist in the actual value are ignored.

pub mod ids;
mod misc;
pub mod path;

use indexmap::IndexMap;
use misc::Indent;
use path::{Key, Path};
use serde_json::{Number, Value};
use std::fmt;

pub use ids::{remove_ids, strip_ids, IdFields};

/// How should numbers be compared.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum NumericMode {
    /// Numbers denoting the same value are equal, so `30` equals `30.0`.
    #[default]
    ByValue,
    /// Numbers must also share their representation, so `30` differs from `30.0`.
    Strict,
}

/// Configuration for how JSON values should be compared.
#[derive(Debug, Clone, Default)]
pub struct Config<'a> {
    pub(crate) numeric_mode: NumericMode,
    pub(crate) ignore_paths: Vec<Path<'a>>,
    pub(crate) id_fields: Option<IdFields>,
}

impl<'a> Config<'a> {
    /// Create a new [`Config`] comparing numbers by value, ignoring nothing
    /// and keeping identifier fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the config's numeric mode.
    pub fn numeric_mode(mut self, numeric_mode: NumericMode) -> Self {
        self.numeric_mode = numeric_mode;
        self
    }

    /// Add a path pattern whose mismatches (including those below it) are dropped.
    pub fn ignore_path(mut self, path: Path<'a>) -> Self {
        self.ignore_paths.push(path);
        self
    }

    /// Remove identifier fields from both sides before comparing.
    ///
    /// Only applied by the assertion operations; [`diff`] itself compares the
    /// values it is given.
    pub fn strip_ids(mut self, fields: IdFields) -> Self {
        self.id_fields = Some(fields);
        self
    }

    /// The identifier rule set by [`Config::strip_ids`], if any.
    pub fn id_fields(&self) -> Option<&IdFields> {
        self.id_fields.as_ref()
    }

    /// Checks if the given path should be ignored.
    pub fn to_ignore(&self, path: &Path) -> bool {
        self.ignore_paths.iter().any(|p| p.prefixes(path))
    }
}

/// One place where the actual value does not satisfy the expected one.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry<'a> {
    path: Path<'a>,
    expected: &'a Value,
    actual: Option<&'a Value>,
}

/// Mismatches keyed by rendered path, in traversal order.
pub type DiffResult<'a> = IndexMap<String, DiffEntry<'a>>;

/// Rendering of an expected value that has no counterpart in the actual value.
pub const MISSING: &str = "<missing>";

impl<'a> DiffEntry<'a> {
    pub fn path(&self) -> &Path<'a> {
        &self.path
    }

    pub fn expected(&self) -> &'a Value {
        self.expected
    }

    /// `None` when the actual document has nothing at this path.
    pub fn actual(&self) -> Option<&'a Value> {
        self.actual
    }

    pub fn is_missing(&self) -> bool {
        self.actual.is_none()
    }

    /// Compact rendering of the actual side, [`MISSING`] when absent.
    pub fn actual_display(&self) -> String {
        match self.actual {
            Some(actual) => actual.to_string(),
            None => MISSING.to_string(),
        }
    }
}

impl<'a> fmt::Display for DiffEntry<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let json_to_string =
            |json: &Value| serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string());

        match self.actual {
            Some(actual) => {
                writeln!(f, "json atoms at path \"{}\" are not equal:", self.path)?;
                writeln!(f, "    expected:")?;
                writeln!(f, "{}", json_to_string(self.expected).indent(8))?;
                writeln!(f, "    actual:")?;
                write!(f, "{}", json_to_string(actual).indent(8))
            }
            None => write!(
                f,
                "json atom at path \"{}\" is missing from actual",
                self.path
            ),
        }
    }
}

/// Compares `expected` against `actual`, treating `expected` as a subset.
///
/// An empty result means `actual` satisfies `expected`. Neither input is
/// modified; entries borrow from them.
pub fn diff<'a>(
    expected: &'a Value,
    actual: &'a Value,
    path: Path<'a>,
    config: &Config<'a>,
) -> DiffResult<'a> {
    let mut acc = DiffResult::new();
    diff_with(expected, Some(actual), path, config, &mut acc);
    acc
}

fn diff_with<'a>(
    expected: &'a Value,
    actual: Option<&'a Value>,
    path: Path<'a>,
    config: &Config<'a>,
    acc: &mut DiffResult<'a>,
) {
    let mut folder = DiffFolder {
        actual,
        path,
        acc,
        config,
    };

    fold_json(expected, &mut folder);
}

struct DiffFolder<'a, 'b> {
    actual: Option<&'a Value>,
    path: Path<'a>,
    acc: &'b mut DiffResult<'a>,
    config: &'b Config<'a>,
}

macro_rules! direct_compare {
    ($name:ident) => {
        fn $name(&mut self, expected: &'a Value) {
            if self.actual != Some(expected) {
                self.record(self.path.clone(), expected, self.actual);
            }
        }
    };
}

impl<'a, 'b> DiffFolder<'a, 'b> {
    direct_compare!(on_null);
    direct_compare!(on_bool);
    direct_compare!(on_string);

    fn on_number(&mut self, expected: &'a Value, number: &Number) {
        let is_equal = match self.actual {
            Some(Value::Number(actual)) => match self.config.numeric_mode {
                NumericMode::Strict => number == actual,
                NumericMode::ByValue => numbers_equal(number, actual),
            },
            _ => false,
        };

        if !is_equal {
            self.record(self.path.clone(), expected, self.actual);
        }
    }

    fn on_array(&mut self, expected: &'a [Value]) {
        let actual = self.actual.and_then(Value::as_array);

        for (idx, expected) in expected.iter().enumerate() {
            let path = self.path.append(Key::Idx(idx));

            match actual.and_then(|items| items.get(idx)) {
                Some(actual) => diff_with(expected, Some(actual), path, self.config, self.acc),
                None => self.record(path, expected, None),
            }
        }
    }

    fn on_object(&mut self, expected: &'a serde_json::Map<String, Value>) {
        let actual = self.actual.and_then(Value::as_object);

        for (key, expected) in expected.iter() {
            let path = self.path.append(Key::Field(key));

            match actual.and_then(|fields| fields.get(key)) {
                Some(actual) => diff_with(expected, Some(actual), path, self.config, self.acc),
                None => self.record(path, expected, None),
            }
        }
    }

    fn record(&mut self, path: Path<'a>, expected: &'a Value, actual: Option<&'a Value>) {
        if self.config.to_ignore(&path) {
            return;
        }

        self.acc.insert(
            path.to_string(),
            DiffEntry {
                path,
                expected,
                actual,
            },
        );
    }
}

fn numbers_equal(expected: &Number, actual: &Number) -> bool {
    match (as_integer(expected), as_integer(actual)) {
        (Some(e), Some(a)) => e == a,
        (Some(int), None) => float_equals_integer(actual, int),
        (None, Some(int)) => float_equals_integer(expected, int),
        (None, None) => expected.as_f64() == actual.as_f64(),
    }
}

fn as_integer(number: &Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

// Exact: an f64 cast would merge integers above 2^53.
fn float_equals_integer(float: &Number, int: i128) -> bool {
    match float.as_f64() {
        Some(f) => f.fract() == 0.0 && f as i128 == int,
        None => false,
    }
}

fn fold_json<'a>(json: &'a Value, folder: &mut DiffFolder<'a, '_>) {
    match json {
        Value::Null => folder.on_null(json),
        Value::Bool(_) => folder.on_bool(json),
        Value::Number(number) => folder.on_number(json, number),
        Value::String(_) => folder.on_string(json),
        Value::Array(items) => folder.on_array(items),
        Value::Object(fields) => folder.on_object(fields),
    }
}
