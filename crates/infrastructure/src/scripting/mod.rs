//! Script validation and sandboxed execution.

mod sandbox;
mod security;

pub use sandbox::{ScriptSandbox, TracingConsole};
pub use security::ScriptSecurityValidator;
