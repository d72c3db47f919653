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
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Marker written in front of every path when the compared document is an array.
pub const ARRAY_ROOT: &str = "root:";

/// Location inside a JSON document.
///
/// Paths produced by the diff engine only hold [`Key::Field`] and [`Key::Idx`]
/// segments. Paths parsed from JSONPath patterns may also hold wildcards and
/// index ranges; those are only used to match concrete paths via
/// [`Path::prefixes`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path<'a> {
    root: &'a str,
    keys: Vec<Key<'a>>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Key<'a> {
    Idx(usize),
    IdxRange(usize, usize),
    IdxRangeStart(usize),
    IdxRangeEnd(usize),
    Wildcard,
    WildcardArray,
    Field(&'a str),
}

#[derive(Debug, Error)]
pub enum PathError {
    #[error("invalid JSONPath `{0}`")]
    Syntax(String),
    #[error("invalid index in JSONPath: {0}")]
    Index(#[from] std::num::ParseIntError),
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

// We cannot implement FromStr for Path because it would confict with lifetimes
// https://stackoverflow.com/questions/28931515/how-do-i-implement-fromstr-with-a-concrete-lifetime
pub trait JSONPath {
    fn jsonpath(&self) -> Result<Path<'_>, PathError>;
}

impl JSONPath for str {
    fn jsonpath(&self) -> Result<Path<'_>, PathError> {
        Path::from_jsonpath(self)
    }
}

// Field names that would read as path syntax are written quoted, `["a.b"]`,
// so distinct paths never render to the same string.
fn needs_quoting(field: &str) -> bool {
    field.is_empty() || field.contains(['.', '[', ']', ':'])
}

impl<'a> fmt::Display for Key<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Key::Idx(idx) => write!(f, "[{}]", idx),
            Key::Field(key) if needs_quoting(key) => write!(f, "[{}]", Value::from(*key)),
            Key::Field(key) => write!(f, ".{}", key),
            Key::IdxRange(start, end) => write!(f, "[{}:{}]", start, end),
            Key::IdxRangeStart(start) => write!(f, "[{}:]", start),
            Key::IdxRangeEnd(end) => write!(f, "[:{}]", end),
            Key::Wildcard => write!(f, ".*"),
            Key::WildcardArray => write!(f, "[*]"),
        }
    }
}

impl<'a> Path<'a> {
    /// Creates an empty path rendered with the given root marker.
    pub fn new(root: &'a str) -> Self {
        Self { root, keys: vec![] }
    }

    /// Creates the starting path for comparing against `actual`: arrays get
    /// the [`ARRAY_ROOT`] marker, everything else an empty prefix.
    pub fn for_actual(actual: &Value) -> Path<'static> {
        if actual.is_array() {
            Path::new(ARRAY_ROOT)
        } else {
            Path::new("")
        }
    }

    pub fn root(&self) -> &'a str {
        self.root
    }

    pub fn keys(&self) -> &[Key<'a>] {
        &self.keys
    }

    /// Returns a new path with `next` appended; `self` is left untouched.
    pub fn append(&self, next: Key<'a>) -> Path<'a> {
        let mut keys = self.keys.clone();
        keys.push(next);
        Path {
            root: self.root,
            keys,
        }
    }

    /// Checks whether `self`, read as a pattern, matches `other` or one of its
    /// ancestors. Root markers are not compared.
    pub fn prefixes(&self, other: &Path) -> bool {
        if self.keys.len() > other.keys.len() {
            return false;
        }

        self.keys
            .iter()
            .zip(other.keys.iter())
            .all(|(pattern, concrete)| {
                if pattern == concrete {
                    return true;
                }

                match (pattern, concrete) {
                    (Key::Wildcard, Key::Field(_)) => true,
                    (Key::WildcardArray, Key::Idx(_)) => true,
                    (Key::IdxRange(a, b), Key::Idx(c)) => a <= c && c < b,
                    (Key::IdxRangeStart(a), Key::Idx(b)) => a <= b,
                    (Key::IdxRangeEnd(a), Key::Idx(b)) => b < a,
                    _ => false,
                }
            })
    }

    pub fn from_jsonpath(jsonpath: &'a str) -> Result<Self, PathError> {
        let re = Regex::new(
            r"^\$\.?(([a-zA-Z_][a-zA-Z0-9_]*)*(\[\d+\]|\[\d*:\d*\]|(\[\*\]))?)(\.((([a-zA-Z_][a-zA-Z0-9_]*)(\[\d+\]|\[\d*:\d*\]|(\[\*\]))?)|\*))*$",
        )?;

        if !re.is_match(jsonpath) {
            return Err(PathError::Syntax(jsonpath.to_string()));
        }

        if jsonpath == "$" {
            return Ok(Path::default());
        }

        let mut keys = Vec::new();

        for segment in jsonpath
            .trim_start_matches('$')
            .split(['.', '['])
            .skip(1)
        {
            keys.push(Self::parse_token(segment)?);
        }

        Ok(Path { root: "", keys })
    }

    fn parse_token(token: &'a str) -> Result<Key<'a>, PathError> {
        let (token, from_array) = match token.strip_suffix(']') {
            Some(inner) => (inner, true),
            None => (token, false),
        };

        if token == "*" || token == ":" {
            return Ok(if from_array {
                Key::WildcardArray
            } else {
                Key::Wildcard
            });
        }

        if let Some((start, end)) = token.split_once(':') {
            return Ok(match (start.is_empty(), end.is_empty()) {
                (false, true) => Key::IdxRangeStart(start.parse()?),
                (true, false) => Key::IdxRangeEnd(end.parse()?),
                _ => Key::IdxRange(start.parse()?, end.parse()?),
            });
        }

        if from_array {
            return Ok(Key::Idx(token.parse()?));
        }

        Ok(Key::Field(token))
    }
}

impl<'a> fmt::Display for Path<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.root)?;
        for (i, key) in self.keys.iter().enumerate() {
            let rendered = key.to_string();
            // the first segment is written bare: "age", not ".age"
            match rendered.strip_prefix('.') {
                Some(bare) if i == 0 => f.write_str(bare)?,
                _ => f.write_str(&rendered)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render() {
        let path = Path::new("").append(Key::Field("age"));
        assert_eq!(path.to_string(), "age");

        let path = Path::new("")
            .append(Key::Field("user"))
            .append(Key::Field("tags"))
            .append(Key::Idx(1));
        assert_eq!(path.to_string(), "user.tags[1]");

        let path = Path::new(ARRAY_ROOT)
            .append(Key::Idx(0))
            .append(Key::Field("name"));
        assert_eq!(path.to_string(), "root:[0].name");

        let path = Path::new(ARRAY_ROOT).append(Key::Field("name"));
        assert_eq!(path.to_string(), "root:name");

        assert_eq!(Path::new("").to_string(), "");
        assert_eq!(Path::new(ARRAY_ROOT).to_string(), "root:");
    }

    #[test]
    fn test_render_quotes_ambiguous_fields() {
        let dotted = Path::new("").append(Key::Field("a.b"));
        let nested = Path::new("")
            .append(Key::Field("a"))
            .append(Key::Field("b"));
        assert_eq!(dotted.to_string(), r#"["a.b"]"#);
        assert_eq!(nested.to_string(), "a.b");

        let path = Path::new(ARRAY_ROOT)
            .append(Key::Idx(0))
            .append(Key::Field("x[1]"))
            .append(Key::Field(""));
        assert_eq!(path.to_string(), r#"root:[0]["x[1]"][""]"#);

        let path = Path::new("")
            .append(Key::Field("user"))
            .append(Key::Field("created:at"));
        assert_eq!(path.to_string(), r#"user["created:at"]"#);
    }

    #[test]
    fn test_append_leaves_parent_untouched() {
        let parent = Path::new("").append(Key::Field("a"));
        let child = parent.append(Key::Idx(3));

        assert_eq!(parent.keys(), &[Key::Field("a")]);
        assert_eq!(child.keys(), &[Key::Field("a"), Key::Idx(3)]);
        assert_eq!(child.root(), parent.root());
    }

    #[test]
    fn test_for_actual() {
        assert_eq!(Path::for_actual(&json!([1, 2])).root(), ARRAY_ROOT);
        assert_eq!(Path::for_actual(&json!({"a": 1})).root(), "");
        assert_eq!(Path::for_actual(&json!("x")).root(), "");
    }

    #[test]
    fn test_parse_jsonpath() {
        let path = "$.a.b.c".jsonpath().unwrap();
        assert_eq!(
            path.keys(),
            &[Key::Field("a"), Key::Field("b"), Key::Field("c")]
        );

        let path = "$.a[0].b[1].c".jsonpath().unwrap();
        assert_eq!(
            path.keys(),
            &[
                Key::Field("a"),
                Key::Idx(0),
                Key::Field("b"),
                Key::Idx(1),
                Key::Field("c"),
            ]
        );

        let path = "$.a[0].b[*].*.c[0:1]".jsonpath().unwrap();
        assert_eq!(
            path.keys(),
            &[
                Key::Field("a"),
                Key::Idx(0),
                Key::Field("b"),
                Key::WildcardArray,
                Key::Wildcard,
                Key::Field("c"),
                Key::IdxRange(0, 1),
            ]
        );

        let path = "$[:].a[3:].b[:4]".jsonpath().unwrap();
        assert_eq!(
            path.keys(),
            &[
                Key::WildcardArray,
                Key::Field("a"),
                Key::IdxRangeStart(3),
                Key::Field("b"),
                Key::IdxRangeEnd(4),
            ]
        );

        assert!("$".jsonpath().unwrap().keys().is_empty());
    }

    #[test]
    fn test_prefixes() {
        let concrete = Path::new("")
            .append(Key::Field("a"))
            .append(Key::Field("b"))
            .append(Key::Field("c"))
            .append(Key::Idx(1));

        assert!("$.a.b".jsonpath().unwrap().prefixes(&concrete));
        assert!("$.a.*.c[0:3]".jsonpath().unwrap().prefixes(&concrete));
        assert!("$.a.b.c[*]".jsonpath().unwrap().prefixes(&concrete));
        assert!("$.a.b.c[1:]".jsonpath().unwrap().prefixes(&concrete));
        assert!("$".jsonpath().unwrap().prefixes(&concrete));

        assert!(!"$.a.b.d".jsonpath().unwrap().prefixes(&concrete));
        assert!(!"$.a.b.c[:1]".jsonpath().unwrap().prefixes(&concrete));
        assert!(!"$.a.b.c[1].d".jsonpath().unwrap().prefixes(&concrete));
        assert!(!"$.a[0]".jsonpath().unwrap().prefixes(&concrete));

        let array_rooted = Path::new(ARRAY_ROOT)
            .append(Key::Idx(2))
            .append(Key::Field("id"));
        assert!("$[*].id".jsonpath().unwrap().prefixes(&array_rooted));
    }

    #[test]
    fn test_jsonpath_validation() {
        assert!("$.a.b.c".jsonpath().is_ok());
        assert!("$.a.b.c[1:2]".jsonpath().is_ok());
        assert!("$[*].a".jsonpath().is_ok());

        assert!(".a.b.c".jsonpath().is_err());
        assert!("$.a.b.c[".jsonpath().is_err());
        assert!("$.a.b.c[]".jsonpath().is_err());
        assert!("$.a.b.c[1:".jsonpath().is_err());
        assert!("id".jsonpath().is_err());
        assert!("".jsonpath().is_err());
    }
}
