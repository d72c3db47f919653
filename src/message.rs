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

//! Failure reports for assertion errors.
//!
//! A [`MessageBuilder`] collects structured [`Segment`]s in the order they
//! are added and renders them into one string. The assertion operations
//! always add the comparison result first, then the request, then the
//! response body; the rendered text of that sequence is stable.

use std::fmt;

use serde_json::Value;

use crate::domain::{RequestSnapshot, ResponseSnapshot};
use crate::json_diff::DiffResult;

/// Part of the exchange a report is about.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Place {
    ResponseBody,
    ResponseCode,
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::ResponseBody => write!(f, "IN RESPONSE BODY"),
            Place::ResponseCode => write!(f, "IN RESPONSE CODE"),
        }
    }
}

/// A mismatch copied out of a [`DiffResult`], already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub path: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    CodeResult { expected: u16, actual: u16 },
    DiffResult(Vec<Mismatch>),
    ValueResult { expected: Value, actual: Value },
    RequestUrl,
    ResponseInfo,
    ErrorInfo(String),
}

/// Single-use builder for one failure report.
#[derive(Debug, Clone)]
pub struct MessageBuilder<'r> {
    place: Place,
    response: &'r ResponseSnapshot,
    segments: Vec<Segment>,
}

impl<'r> MessageBuilder<'r> {
    pub fn new(place: Place, response: &'r ResponseSnapshot) -> Self {
        Self {
            place,
            response,
            segments: vec![],
        }
    }

    /// Builder for reports about the response body.
    pub fn body(response: &'r ResponseSnapshot) -> Self {
        Self::new(Place::ResponseBody, response)
    }

    /// Builder for reports about the response status code.
    pub fn code(response: &'r ResponseSnapshot) -> Self {
        Self::new(Place::ResponseCode, response)
    }

    pub fn place(&self) -> Place {
        self.place
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Adds the expected and actual status codes.
    pub fn add_code_result(mut self, expected: u16, actual: u16) -> Self {
        self.segments.push(Segment::CodeResult { expected, actual });
        self
    }

    /// Adds one line per mismatch of `diff`, in its order.
    pub fn add_diff_result(mut self, diff: &DiffResult) -> Self {
        let mismatches = diff
            .iter()
            .map(|(path, entry)| Mismatch {
                path: path.clone(),
                expected: entry.expected().to_string(),
                actual: entry.actual_display(),
            })
            .collect();
        self.segments.push(Segment::DiffResult(mismatches));
        self
    }

    /// Adds a single expected/actual value pair.
    pub fn add_value_result(mut self, expected: &Value, actual: &Value) -> Self {
        self.segments.push(Segment::ValueResult {
            expected: expected.clone(),
            actual: actual.clone(),
        });
        self
    }

    /// Adds URL, method, headers, query parameters and body of the sent request.
    pub fn add_request_url(mut self) -> Self {
        self.segments.push(Segment::RequestUrl);
        self
    }

    /// Adds the raw response body.
    pub fn add_response_info(mut self) -> Self {
        self.segments.push(Segment::ResponseInfo);
        self
    }

    /// Adds free-form text, or a blank line when `text` is empty.
    pub fn add_error_info(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::ErrorInfo(text.into()));
        self
    }

    /// Renders all segments added so far.
    pub fn message(&self) -> String {
        let mut msg = String::new();
        for segment in &self.segments {
            render(&mut msg, segment, self.place, self.response);
        }
        msg
    }
}

impl<'r> fmt::Display for MessageBuilder<'r> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

fn render(msg: &mut String, segment: &Segment, place: Place, response: &ResponseSnapshot) {
    match segment {
        Segment::CodeResult { expected, actual } => {
            msg.push_str(&format!(
                "{} \n\texpected code: {}\n\tactual code: {}\n",
                place, expected, actual
            ));
        }
        Segment::DiffResult(mismatches) => {
            msg.push_str(&format!(
                "{} in json following field didn't match with reference:\n",
                place
            ));
            for m in mismatches {
                msg.push_str(&format!(
                    "key: {}\n\t\texpected: {} \n\t\tactual: {}\n",
                    m.path, m.expected, m.actual
                ));
            }
        }
        Segment::ValueResult { expected, actual } => {
            msg.push_str(&format!("\texpected: {}\n\tactual: {}\n", expected, actual));
        }
        Segment::RequestUrl => render_request(msg, response.request()),
        Segment::ResponseInfo => {
            msg.push_str(&format!(
                "Response body:\n\t{}\n",
                String::from_utf8_lossy(response.body())
            ));
        }
        Segment::ErrorInfo(text) if text.is_empty() => msg.push('\n'),
        Segment::ErrorInfo(text) => msg.push_str(&format!("\n{}\n", text)),
    }
}

fn render_request(msg: &mut String, request: &RequestSnapshot) {
    msg.push_str(&format!(
        "The content of the sent request (url, query params, body):\n\tURL: {}\n",
        request.url()
    ));
    msg.push_str(&format!("\tmethod: {}\n", request.method()));
    msg.push_str(&format!("\theaders: {}\n", render_headers(request.headers())));

    if request.query().is_empty() {
        msg.push_str("\tquery params:\n");
    } else {
        msg.push_str(&format!("\tquery params: {}\n", render_query(request.query())));
    }

    match request.body() {
        Some(body) => msg.push_str(&format!("\tbody: {}\n", String::from_utf8_lossy(body))),
        None => msg.push_str("\tbody:\n"),
    }
}

fn render_headers(headers: &[(String, String)]) -> String {
    let pairs = headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>();
    format!("{{{}}}", pairs.join(", "))
}

fn render_query(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&")
}
