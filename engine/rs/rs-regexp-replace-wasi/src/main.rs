//! WASI command that replaces every regex match in a text.
//!
//! Reads one JSON request `{"pattern", "text", "replacement"}` from stdin
//! (at most 1 MiB) and writes one JSON response to stdout:
//!
//! - `{"replaced_text": "...", "error": null}` on success;
//! - `{"replaced_text": "", "error": {"code": 1, ...}}` if the request is not
//!   valid JSON of that shape;
//! - `{"replaced_text": "", "error": {"code": 2, ...}}` if the pattern does
//!   not compile.
//!
//! An I/O failure exits non-zero without writing a response.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Largest request read from stdin.
const MAX_REQUEST_BYTES: u64 = 1024 * 1024;

const INVALID_INPUT: i32 = 1;
const INVALID_PATTERN: i32 = 2;

#[derive(Deserialize)]
struct Request {
    pattern: String,
    text: String,
    replacement: String,
}

#[derive(Serialize)]
struct Failure {
    code: i32,
    message: String,
}

#[derive(Serialize)]
struct Response {
    replaced_text: String,
    error: Option<Failure>,
}

impl Response {
    fn replaced(text: String) -> Self {
        Self {
            replaced_text: text,
            error: None,
        }
    }

    fn failed(code: i32, message: String) -> Self {
        Self {
            replaced_text: String::new(),
            error: Some(Failure { code, message }),
        }
    }
}

fn respond(input: &[u8]) -> Response {
    let request: Request = match serde_json::from_slice(input) {
        Ok(request) => request,
        Err(e) => {
            return Response::failed(INVALID_INPUT, format!("unable to parse the input json: {e}"));
        }
    };

    match Regex::new(&request.pattern) {
        Ok(pattern) => Response::replaced(
            pattern
                .replace_all(&request.text, request.replacement.as_str())
                .into_owned(),
        ),
        Err(e) => Response::failed(INVALID_PATTERN, format!("invalid regular expression: {e}")),
    }
}

fn main() -> io::Result<()> {
    let mut input = Vec::new();
    io::stdin()
        .lock()
        .take(MAX_REQUEST_BYTES)
        .read_to_end(&mut input)?;

    let response = respond(&input);

    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &response)?;
    stdout.flush()
}
