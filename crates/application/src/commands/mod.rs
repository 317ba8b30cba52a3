//! Line-oriented command interpreters
//!
//! Both interpreters read one command per line. Blank lines and lines
//! starting with `#` or `//` are skipped. A bad line is reported on its own
//! and never stops the lines after it.

mod assertions;
mod pre_request;
pub mod sandboxed;

pub use assertions::TestCommandInterpreter;
pub use pre_request::{PreRequestCommandInterpreter, PreRequestReport};

use courier_domain::{DomainError, VariableStore};
use thiserror::Error;

use crate::error::ReferenceError;
use crate::ports::{JsonPathEvaluator, SnapshotSource};
use crate::variable_resolver::VariableResolver;

/// Why a single command line failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The command name is not part of the language.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A required argument is missing.
    #[error("Usage: {0}")]
    MissingArgument(&'static str),

    /// The body holds attached files that the command would discard.
    #[error("Refusing to replace a body that holds file data")]
    FileBodyProtected,

    /// A variable expression did not resolve.
    #[error("Variable '{0}' is not defined")]
    Unresolved(String),

    /// A structured reference failed.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// A domain rule was violated.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// A failed line of a command script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// 1-based line number.
    pub line: usize,
    /// The line as written (trimmed).
    pub text: String,
    /// What went wrong.
    pub error: CommandError,
}

/// One executable line of a command script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLine<'a> {
    /// 1-based line number.
    pub number: usize,
    /// The trimmed line.
    pub text: &'a str,
    /// The command name.
    pub command: &'a str,
    /// Everything after the command name, trimmed.
    pub rest: &'a str,
}

impl<'a> CommandLine<'a> {
    /// Splits the arguments into a first word and the remainder.
    #[must_use]
    pub fn split_first_arg(&self) -> Option<(&'a str, &'a str)> {
        let rest = self.rest;
        if rest.is_empty() {
            return None;
        }
        Some(match rest.split_once(char::is_whitespace) {
            Some((first, tail)) => (first, tail.trim()),
            None => (rest, ""),
        })
    }
}

/// Returns the executable lines of a script.
pub fn script_lines(script: &str) -> impl Iterator<Item = CommandLine<'_>> {
    script.lines().enumerate().filter_map(|(index, raw)| {
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') || text.starts_with("//") {
            return None;
        }
        let (command, rest) = text
            .split_once(char::is_whitespace)
            .map_or((text, ""), |(command, rest)| (command, rest.trim()));
        Some(CommandLine {
            number: index + 1,
            text,
            command,
            rest,
        })
    })
}

/// What an interpreter needs to resolve variables and write them back.
pub struct CommandContext<'a> {
    /// Variable scopes; commands may write to them.
    pub store: &'a mut VariableStore,
    /// Execution snapshots for structured references.
    pub snapshots: &'a dyn SnapshotSource,
    /// JSONPath evaluator.
    pub json_path: &'a dyn JsonPathEvaluator,
}

impl<'a> CommandContext<'a> {
    /// Creates a context.
    #[must_use]
    pub fn new(
        store: &'a mut VariableStore,
        snapshots: &'a dyn SnapshotSource,
        json_path: &'a dyn JsonPathEvaluator,
    ) -> Self {
        Self {
            store,
            snapshots,
            json_path,
        }
    }

    /// A resolver over the current state of the store.
    #[must_use]
    pub fn resolver(&self) -> VariableResolver<'_> {
        VariableResolver::new(&*self.store, self.snapshots, self.json_path)
    }
}
