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

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use api_assert::fixtures::load_json;
use api_assert::{
    assert_response_body, assert_schema, assert_status_code, ApiClient, ApiRequest,
    AssertionError, ClientConfig, Config, HttpMethod, IdFields, JSONPath, NumericMode,
};

#[doc(hidden)]
#[macro_export]
macro_rules! handle_error {
    ($code:expr, $msg:expr, $($arg:tt)*) => {
        println!($msg, $($arg)*);
        std::process::exit($code);
    };

    ($code:expr, $msg:expr) => {
        println!($msg);
        std::process::exit($code);
    };
}

#[doc(hidden)]
struct Code;

impl Code {
    const SUCCESS: i32 = 0;
    const INTERNAL_ERROR: i32 = 1;
    const INVALID_ARGUMENT: i32 = 2;
    const FIXTURE_ERROR: i32 = 3;
    const ASSERTION_ERROR: i32 = 4;
    const TRANSPORT_ERROR: i32 = 5;
}

#[doc(hidden)]
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Endpoint path, appended to the base URL
    path: String,

    /// Base URL of the API under test; RESOURCE_URL is used when omitted
    #[clap(short, long)]
    url: Option<String>,

    /// HTTP method
    #[clap(short = 'X', long, default_value = "GET")]
    method: HttpMethod,

    /// Request header in the `name: value` format
    #[clap(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Query parameter in the `name=value` format
    #[clap(short, long = "query")]
    query: Vec<String>,

    /// JSON file sent as the request body
    #[clap(short, long)]
    body: Option<PathBuf>,

    /// Expected response status code
    #[clap(short, long)]
    status: Option<u16>,

    /// JSON schema file the response body (or each of its elements) must satisfy
    #[clap(long)]
    schema: Option<PathBuf>,

    /// JSON file the response body must contain
    #[clap(short, long)]
    expect: Option<PathBuf>,

    /// Remove `id` fields from both sides before comparing
    #[clap(long)]
    strip_ids: bool,

    /// Regular expression selecting identifier keys to remove (implies --strip-ids)
    #[clap(long)]
    id_pattern: Option<String>,

    /// JSONPath of a field to leave out of the comparison
    #[clap(long = "ignore")]
    ignore: Vec<String>,

    /// Treat 30 and 30.0 as different numbers
    #[clap(long)]
    strict_numbers: bool,

    /// Log requests and comparison details
    #[clap(short, long)]
    verbose: bool,
}

#[doc(hidden)]
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let client_config = match &cli.url {
        Some(url) => ClientConfig::new(url).with_request_logging(cli.verbose),
        None => match ClientConfig::from_env() {
            Ok(config) => config,
            Err(err) => {
                handle_error!(Code::INVALID_ARGUMENT, "Error: {}", err);
            }
        },
    };

    let client = match ApiClient::new(client_config) {
        Ok(client) => client,
        Err(err) => {
            handle_error!(Code::INTERNAL_ERROR, "Error: {}", err);
        }
    };

    let request = build_request(&cli);
    let id = format!("{} {}{}", request.http_method, client.config().base_url(), request.path);

    let response = match client.send(request).await {
        Ok(response) => response,
        Err(err) => {
            handle_error!(Code::TRANSPORT_ERROR, "{} ❌\nError: {}", id, err);
        }
    };

    if let Some(expected_code) = cli.status {
        report(&id, assert_status_code(&response, expected_code));
    }

    if let Some(schema_path) = &cli.schema {
        let schema = match load_json(schema_path) {
            Ok(schema) => schema,
            Err(err) => {
                handle_error!(Code::FIXTURE_ERROR, "Error: {}", err);
            }
        };
        let validator = match jsonschema::validator_for(&schema) {
            Ok(validator) => validator,
            Err(err) => {
                handle_error!(Code::INVALID_ARGUMENT, "Error: invalid schema: {}", err);
            }
        };
        report(&id, assert_schema(&response, &validator));
    }

    if let Some(expect_path) = &cli.expect {
        let expected = match load_json(expect_path) {
            Ok(expected) => expected,
            Err(err) => {
                handle_error!(Code::FIXTURE_ERROR, "Error: {}", err);
            }
        };
        let config = diff_config(&cli);
        report(&id, assert_response_body(&response, &expected, &config));
    }

    println!("{} ✅", id);
    std::process::exit(Code::SUCCESS);
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_request(cli: &Cli) -> ApiRequest {
    let mut request = ApiRequest::new(cli.method, cli.path.as_str());

    for header in &cli.headers {
        let Some((name, value)) = header.split_once(':') else {
            handle_error!(Code::INVALID_ARGUMENT, "Error: invalid header {}", header);
        };
        request = request.with_header(name.trim(), value.trim());
    }

    for param in &cli.query {
        let Some((name, value)) = param.split_once('=') else {
            handle_error!(Code::INVALID_ARGUMENT, "Error: invalid query parameter {}", param);
        };
        request = request.with_query(name, value);
    }

    if let Some(body_path) = &cli.body {
        match load_json(body_path) {
            Ok(body) => request = request.with_json(&body),
            Err(err) => {
                handle_error!(Code::FIXTURE_ERROR, "Error: {}", err);
            }
        }
    }

    request
}

fn diff_config(cli: &Cli) -> Config<'_> {
    let mut config = Config::new();

    if cli.strict_numbers {
        config = config.numeric_mode(NumericMode::Strict);
    }

    for path in &cli.ignore {
        match path.jsonpath() {
            Ok(path) => config = config.ignore_path(path),
            Err(err) => {
                handle_error!(Code::INVALID_ARGUMENT, "Error: {}", err);
            }
        }
    }

    match &cli.id_pattern {
        Some(pattern) => match IdFields::pattern(pattern) {
            Ok(fields) => config = config.strip_ids(fields),
            Err(err) => {
                handle_error!(Code::INVALID_ARGUMENT, "Error: invalid id pattern: {}", err);
            }
        },
        None if cli.strip_ids => config = config.strip_ids(IdFields::default()),
        None => {}
    }

    config
}

fn report(id: &str, result: Result<(), AssertionError>) {
    if let Err(err) = result {
        handle_error!(Code::ASSERTION_ERROR, "{} ❌\n{}", id, err);
    }
}
