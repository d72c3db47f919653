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

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fixture {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Directory of JSON documents holding expected bodies and request payloads.
#[derive(Debug, Clone)]
pub struct Fixtures {
    root: PathBuf,
}

impl Fixtures {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of fixture `name`; `.json` is appended when `name` has no extension.
    pub fn path_of(&self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        if path.extension().is_none() {
            path.with_extension("json")
        } else {
            path
        }
    }

    pub fn load(&self, name: &str) -> Result<Value, FixtureError> {
        load_json(&self.path_of(name))
    }
}

/// Reads and parses one JSON file.
pub fn load_json(path: &Path) -> Result<Value, FixtureError> {
    let data = fs::read_to_string(path).map_err(|source| FixtureError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| FixtureError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("objects")).unwrap();
        fs::write(
            dir.path().join("objects/get_objects.json"),
            r#"[{"id": "1", "name": "phone"}]"#,
        )
        .unwrap();

        let fixtures = Fixtures::new(dir.path());
        assert_eq!(
            fixtures.load("objects/get_objects").unwrap(),
            json!([{ "id": "1", "name": "phone" }])
        );
        assert_eq!(
            fixtures.load("objects/get_objects.json").unwrap(),
            json!([{ "id": "1", "name": "phone" }])
        );
    }

    #[test]
    fn test_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        let fixtures = Fixtures::new(dir.path());

        let err = fixtures.load("missing").unwrap_err();
        assert!(matches!(err, FixtureError::Read { .. }));
        assert!(err.to_string().contains("missing.json"));

        let err = fixtures.load("broken").unwrap_err();
        assert!(matches!(err, FixtureError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
