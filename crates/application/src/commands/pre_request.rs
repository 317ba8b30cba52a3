//! Pre-request command interpreter
//!
//! Applies a batch of independent mutations to a request before it is sent.

use courier_domain::{HttpMethod, PreparedRequest, RequestBody, ScopeTarget};
use tracing::{debug, info, warn};

use super::{CommandContext, CommandError, CommandFailure, CommandLine, script_lines};

const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Outcome of one pre-request script run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreRequestReport {
    /// Number of lines applied successfully.
    pub applied: usize,
    /// Lines that failed, in script order.
    pub failures: Vec<CommandFailure>,
    /// Messages written by `log`.
    pub logs: Vec<String>,
}

impl PreRequestReport {
    /// True if every line applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Interprets pre-request command scripts.
///
/// | command | effect |
/// |---|---|
/// | `setBody <text>` | raw body, Content-Type defaults to JSON |
/// | `setBodyWithVar <expr>` | body from a resolved expression |
/// | `removeHeader <name>` | case-insensitive removal |
/// | `setUrl <url>` / `setUrlWithVar <expr>` | replace the URL |
/// | `addHeader <name> <value>` / `addHeaderWithVar <name> <expr>` | set one header |
/// | `setMethod <METHOD>` | replace the method |
/// | `setParam <name> <value>` | set one query parameter |
/// | `setVar <name> <value>` | write a runtime variable |
/// | `log <message>` | record a message |
#[derive(Debug, Clone, Copy, Default)]
pub struct PreRequestCommandInterpreter;

impl PreRequestCommandInterpreter {
    /// Creates an interpreter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs every line of `script` against `request`.
    #[allow(clippy::unused_self)]
    pub fn run(
        &self,
        script: &str,
        request: &mut PreparedRequest,
        context: &mut CommandContext<'_>,
    ) -> PreRequestReport {
        let mut report = PreRequestReport::default();

        for line in script_lines(script) {
            match Self::apply(&line, request, context, &mut report.logs) {
                Ok(()) => {
                    debug!(line = line.number, command = line.command, "pre-request command applied");
                    report.applied += 1;
                }
                Err(error) => {
                    warn!(line = line.number, command = line.command, %error, "pre-request command skipped");
                    report.failures.push(CommandFailure {
                        line: line.number,
                        text: line.text.to_string(),
                        error,
                    });
                }
            }
        }

        report
    }

    fn apply(
        line: &CommandLine<'_>,
        request: &mut PreparedRequest,
        context: &mut CommandContext<'_>,
        logs: &mut Vec<String>,
    ) -> Result<(), CommandError> {
        match line.command {
            "setBody" => set_body(request, line.rest.to_string()),
            "setBodyWithVar" => {
                guard_body(request)?;
                let expression = required(line.rest, "setBodyWithVar <varExpr>")?;
                let value = resolve(context, expression)?;
                set_body(request, value)
            }
            "removeHeader" => {
                let name = required(line.rest, "removeHeader <name>")?;
                request.headers.remove(name);
                Ok(())
            }
            "setUrl" => {
                request.url = required(line.rest, "setUrl <url>")?.to_string();
                Ok(())
            }
            "setUrlWithVar" => {
                let expression = required(line.rest, "setUrlWithVar <varName>")?;
                request.url = resolve(context, expression)?;
                Ok(())
            }
            "addHeader" => {
                let (name, value) = pair(line, "addHeader <name> <value>")?;
                request.headers.set(name, value);
                Ok(())
            }
            "addHeaderWithVar" => {
                let (name, expression) = pair(line, "addHeaderWithVar <name> <varExpr>")?;
                let value = resolve(context, expression)?;
                request.headers.set(name, value);
                Ok(())
            }
            "setMethod" => {
                request.method = required(line.rest, "setMethod <METHOD>")?.parse::<HttpMethod>()?;
                Ok(())
            }
            "setParam" => {
                let (name, value) = pair(line, "setParam <name> <value>")?;
                let value = context.resolver().substitute(value)?;
                request.params.set(name, value);
                Ok(())
            }
            "setVar" => {
                let (name, value) = pair(line, "setVar <name> <value>")?;
                let value = context.resolver().substitute(value)?;
                context.store.set_value(&ScopeTarget::Runtime, name, value)?;
                Ok(())
            }
            "log" => {
                let message = context.resolver().substitute(line.rest)?;
                info!(script_log = %message, "pre-request script");
                logs.push(message);
                Ok(())
            }
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }
}

fn guard_body(request: &PreparedRequest) -> Result<(), CommandError> {
    if request.body.holds_file_data() {
        return Err(CommandError::FileBodyProtected);
    }
    Ok(())
}

fn set_body(request: &mut PreparedRequest, content: String) -> Result<(), CommandError> {
    guard_body(request)?;
    request.body = RequestBody::Raw { content };
    if !request.headers.contains("Content-Type") {
        request.headers.set("Content-Type", DEFAULT_CONTENT_TYPE);
    }
    Ok(())
}

fn required<'a>(rest: &'a str, usage: &'static str) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument(usage))
    } else {
        Ok(rest)
    }
}

fn pair<'a>(line: &CommandLine<'a>, usage: &'static str) -> Result<(&'a str, &'a str), CommandError> {
    match line.split_first_arg() {
        Some((name, value)) if !value.is_empty() => Ok((name, value)),
        _ => Err(CommandError::MissingArgument(usage)),
    }
}

fn resolve(context: &CommandContext<'_>, expression: &str) -> Result<String, CommandError> {
    context
        .resolver()
        .resolve_expression(expression)?
        .ok_or_else(|| CommandError::Unresolved(expression.to_string()))
}
