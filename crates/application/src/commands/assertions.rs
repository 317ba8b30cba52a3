//! Test command interpreter
//!
//! Each line is one self-contained assertion against the captured response.
//! Every line is evaluated, whatever happened on the lines before it.

use std::collections::BTreeSet;

use courier_domain::{HttpResponse, ScopeTarget, TestAssertionResult};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::{CommandContext, CommandLine, script_lines};

const PREVIEW_CHARS: usize = 100;

/// Interprets test command scripts against a response.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestCommandInterpreter;

impl TestCommandInterpreter {
    /// Creates an interpreter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs every line of `script`, returning one result per executable line.
    pub fn run_script(
        &self,
        script: &str,
        response: &HttpResponse,
        context: &mut CommandContext<'_>,
    ) -> Vec<TestAssertionResult> {
        script_lines(script)
            .map(|line| self.run_command(&line, response, context))
            .collect()
    }

    /// Runs a single assertion line.
    pub fn run(
        &self,
        line: &str,
        response: &HttpResponse,
        context: &mut CommandContext<'_>,
    ) -> TestAssertionResult {
        script_lines(line).next().map_or_else(
            || TestAssertionResult::fail(line.trim(), "Empty test command"),
            |parsed| self.run_command(&parsed, response, context),
        )
    }

    #[allow(clippy::unused_self)]
    fn run_command(
        &self,
        line: &CommandLine<'_>,
        response: &HttpResponse,
        context: &mut CommandContext<'_>,
    ) -> TestAssertionResult {
        let outcome = match line.command {
            "status" => check_status(line, response),
            "jsonHasProperty" => check_json_has_property(line, response, context),
            "jsonArrayLengthEquals" => check_json_array_length(line, response, context),
            "jsonValueEquals" => check_json_value_equals(line, response, context),
            "bodyJsonPathEquals" => check_json_path_equals(line, response, context),
            "bodyContains" => check_body_contains(line, response),
            "bodyMatches" => check_body_matches(line, response),
            "headerExists" => check_header_exists(line, response),
            "headerValueEquals" => check_header_value_equals(line, response),
            "headerContains" => check_header_contains(line, response),
            "responseTimeBelow" => check_response_time(line, response),
            "setVarFromHeader" => set_var_from_header(line, response, context),
            "echoRequestHeaderEquals" => check_echo_header(line, response, false),
            "echoRequestHeaderContains" => check_echo_header(line, response, true),
            "echoRequestMethodEquals" => check_echo_method(line, response),
            "echoRequestBodyEquals" => check_echo_body(line, response),
            "echoRequestUrlContains" => check_echo_url(line, response),
            other => {
                warn!(line = line.number, command = other, "unknown test command");
                Err(format!("Unknown test command: {other}"))
            }
        };

        match outcome {
            Ok(()) => TestAssertionResult::pass(line.text),
            Err(error) => {
                debug!(line = line.number, %error, "assertion failed");
                TestAssertionResult::fail(line.text, error)
            }
        }
    }
}

type Check = Result<(), String>;

fn one_arg<'a>(line: &CommandLine<'a>, usage: &str) -> Result<&'a str, String> {
    if line.rest.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(line.rest)
    }
}

fn two_args<'a>(line: &CommandLine<'a>, usage: &str) -> Result<(&'a str, &'a str), String> {
    match line.split_first_arg() {
        Some((first, rest)) if !rest.is_empty() => Ok((first, rest)),
        _ => Err(format!("Usage: {usage}")),
    }
}

fn body_json(response: &HttpResponse) -> Result<Value, String> {
    serde_json::from_str(&response.body)
        .map_err(|e| format!("Failed to parse body as JSON: {e}"))
}

fn preview(body: &str) -> String {
    if body.chars().count() > PREVIEW_CHARS {
        format!("{}...", body.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        body.to_string()
    }
}

/// Strings without quotes, everything else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Accepts `$`-rooted JSONPath or a plain dot path like `data.items[0]`.
fn first_match(
    context: &CommandContext<'_>,
    path: &str,
    json: &Value,
) -> Result<Option<Value>, String> {
    let expression = if path.starts_with('$') {
        path.to_string()
    } else {
        format!("$.{path}")
    };
    context
        .json_path
        .query(&expression, json)
        .map(|matches| matches.into_iter().next())
        .map_err(|e| e.to_string())
}

fn check_status(line: &CommandLine<'_>, response: &HttpResponse) -> Check {
    let raw = one_arg(line, "status <code>")?;
    let expected: u16 = raw
        .parse()
        .map_err(|_| format!("Invalid status code: '{raw}'"))?;
    if response.status == expected {
        Ok(())
    } else {
        Err(format!("Expected status {expected}, got {}", response.status))
    }
}

fn check_json_has_property(
    line: &CommandLine<'_>,
    response: &HttpResponse,
    context: &CommandContext<'_>,
) -> Check {
    let name = one_arg(line, "jsonHasProperty <name>")?;
    let json = body_json(response)?;
    match first_match(context, name, &json)? {
        Some(_) => Ok(()),
        None => Err(format!("Property '{name}' not found in response body")),
    }
}

fn check_json_array_length(
    line: &CommandLine<'_>,
    response: &HttpResponse,
    context: &CommandContext<'_>,
) -> Check {
    let usage = "jsonArrayLengthEquals <path> <length>";
    let (path, raw) = two_args(line, usage)?;
    let expected: usize = raw
        .parse()
        .map_err(|_| format!("Invalid length: '{raw}'"))?;
    let json = body_json(response)?;
    let value = first_match(context, path, &json)?
        .ok_or_else(|| format!("JSON path '{path}' not found"))?;
    let actual = value
        .as_array()
        .ok_or_else(|| format!("JSON path '{path}' is not an array"))?
        .len();
    if actual == expected {
        Ok(())
    } else {
        Err(format!(
            "Array '{path}' has length {actual}, expected {expected}"
        ))
    }
}

fn check_json_value_equals(
    line: &CommandLine<'_>,
    response: &HttpResponse,
    context: &CommandContext<'_>,
) -> Check {
    let (path, expected) = two_args(line, "jsonValueEquals <path> <value>")?;
    let json = body_json(response)?;
    let actual = first_match(context, path, &json)?
        .ok_or_else(|| format!("JSON path '{path}' not found"))?;

    let equal = match (expected.parse::<f64>(), actual.as_f64()) {
        (Ok(wanted), Some(found)) => (wanted - found).abs() < f64::EPSILON,
        _ => render(&actual) == expected,
    };
    if equal {
        Ok(())
    } else {
        Err(format!(
            "JSON path '{path}' value mismatch: expected {expected}, got {}",
            render(&actual)
        ))
    }
}

fn check_json_path_equals(
    line: &CommandLine<'_>,
    response: &HttpResponse,
    context: &CommandContext<'_>,
) -> Check {
    let (expression, expected) = two_args(line, "bodyJsonPathEquals <jsonPath> <value>")?;
    let json = body_json(response)?;
    let actual = context
        .json_path
        .query(expression, &json)
        .map_err(|e| e.to_string())?
        .into_iter()
        .next()
        .ok_or_else(|| format!("JSON path '{expression}' matched nothing"))?;
    let actual = render(&actual);
    if actual == expected {
        Ok(())
    } else {
        Err(format!(
            "JSON path '{expression}' value mismatch: expected '{expected}', got '{actual}'"
        ))
    }
}

fn check_body_contains(line: &CommandLine<'_>, response: &HttpResponse) -> Check {
    let text = one_arg(line, "bodyContains <text>")?;
    if response.body.contains(text) {
        Ok(())
    } else {
        Err(format!(
            "Body does not contain '{text}' (body: {})",
            preview(&response.body)
        ))
    }
}

fn check_body_matches(line: &CommandLine<'_>, response: &HttpResponse) -> Check {
    let pattern = one_arg(line, "bodyMatches <regex>")?;
    let regex =
        Regex::new(pattern).map_err(|e| format!("Invalid regex pattern '{pattern}': {e}"))?;
    if regex.is_match(&response.body) {
        Ok(())
    } else {
        Err(format!("Body does not match pattern '{pattern}'"))
    }
}

fn header<'r>(response: &'r HttpResponse, name: &str) -> Result<&'r str, String> {
    response
        .header(name)
        .ok_or_else(|| format!("Header '{name}' not found"))
}

fn check_header_exists(line: &CommandLine<'_>, response: &HttpResponse) -> Check {
    let name = one_arg(line, "headerExists <name>")?;
    header(response, name).map(|_| ())
}

fn check_header_value_equals(line: &CommandLine<'_>, response: &HttpResponse) -> Check {
    let (name, expected) = two_args(line, "headerValueEquals <name> <value>")?;
    let actual = header(response, name)?;
    if actual == expected {
        Ok(())
    } else {
        Err(format!(
            "Header '{name}' value mismatch: expected '{expected}', got '{actual}'"
        ))
    }
}

fn check_header_contains(line: &CommandLine<'_>, response: &HttpResponse) -> Check {
    let (name, expected) = two_args(line, "headerContains <name> <text>")?;
    let actual = header(response, name)?;
    if actual.contains(expected) {
        Ok(())
    } else {
        Err(format!("Header '{name}' value '{actual}' does not contain '{expected}'"))
    }
}

fn check_response_time(line: &CommandLine<'_>, response: &HttpResponse) -> Check {
    let raw = one_arg(line, "responseTimeBelow <ms>")?;
    let limit: u128 = raw
        .parse()
        .map_err(|_| format!("Invalid duration: '{raw}'"))?;
    let actual = response.duration.as_millis();
    if actual < limit {
        Ok(())
    } else {
        Err(format!("Response took {actual}ms, expected < {limit}ms"))
    }
}

fn set_var_from_header(
    line: &CommandLine<'_>,
    response: &HttpResponse,
    context: &mut CommandContext<'_>,
) -> Check {
    let (variable, name) = two_args(line, "setVarFromHeader <varName> <headerName>")?;
    let value = header(response, name)?.to_string();
    context
        .store
        .set_value(&ScopeTarget::Environment, variable, value)
        .map_err(|e| e.to_string())
}

fn echo_body(response: &HttpResponse) -> Result<Value, String> {
    body_json(response).map_err(|e| format!("Echo response is not JSON: {e}"))
}

fn cookie_pairs(header: &str) -> BTreeSet<&str> {
    header
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect()
}

fn check_echo_header(line: &CommandLine<'_>, response: &HttpResponse, contains: bool) -> Check {
    let usage = if contains {
        "echoRequestHeaderContains <name> <value>"
    } else {
        "echoRequestHeaderEquals <name> <value>"
    };
    let (name, expected) = two_args(line, usage)?;
    let echo = echo_body(response)?;
    let actual = echo
        .get("headers")
        .and_then(Value::as_object)
        .and_then(|headers| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| render(value))
        })
        .ok_or_else(|| format!("Echoed request has no header '{name}'"))?;

    let matched = if contains {
        if name.eq_ignore_ascii_case("cookie") {
            cookie_pairs(&actual) == cookie_pairs(expected)
        } else {
            actual.contains(expected)
        }
    } else {
        actual == expected
    };
    if matched {
        Ok(())
    } else {
        Err(format!(
            "Echoed header '{name}' is '{actual}', expected {}'{expected}'",
            if contains { "it to contain " } else { "" }
        ))
    }
}

fn check_echo_method(line: &CommandLine<'_>, response: &HttpResponse) -> Check {
    let expected = one_arg(line, "echoRequestMethodEquals <METHOD>")?;
    let echo = echo_body(response)?;
    let actual = echo
        .get("method")
        .map(render)
        .ok_or_else(|| "Echoed request has no method".to_string())?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(format!("Echoed method is '{actual}', expected '{expected}'"))
    }
}

fn check_echo_body(line: &CommandLine<'_>, response: &HttpResponse) -> Check {
    let expected = one_arg(line, "echoRequestBodyEquals <body>")?;
    let echo = echo_body(response)?;
    let actual = echo
        .get("data")
        .or_else(|| echo.get("body"))
        .map(render)
        .ok_or_else(|| "Echoed request has no body".to_string())?;

    let equal = match (
        serde_json::from_str::<Value>(&actual),
        serde_json::from_str::<Value>(expected),
    ) {
        (Ok(found), Ok(wanted)) => found == wanted,
        _ => actual.trim() == expected.trim(),
    };
    if equal {
        Ok(())
    } else {
        Err(format!(
            "Echoed body is '{}', expected '{expected}'",
            preview(&actual)
        ))
    }
}

fn check_echo_url(line: &CommandLine<'_>, response: &HttpResponse) -> Check {
    let expected = one_arg(line, "echoRequestUrlContains <text>")?;
    let echo = echo_body(response)?;
    let actual = echo
        .get("url")
        .map(render)
        .ok_or_else(|| "Echoed request has no url".to_string())?;
    if actual.contains(expected) {
        Ok(())
    } else {
        Err(format!("Echoed url '{actual}' does not contain '{expected}'"))
    }
}
