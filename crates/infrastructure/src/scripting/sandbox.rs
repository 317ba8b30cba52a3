//! Rhai script sandbox
//!
//! Every run gets a fresh engine with operation, depth and size limits and a
//! wall-clock deadline enforced from inside the engine's progress callback,
//! so a runaway script is actually stopped rather than abandoned.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use courier_application::ports::{ScriptConsole, ScriptError, ScriptOutcome, ScriptRunner};
use courier_domain::{EngineSettings, SandboxSettings, TestAssertionResult};
use parking_lot::Mutex;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::ScriptSecurityValidator;

const MAX_COLLECTION_SIZE: usize = 10_000;

/// Forwards script output to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl ScriptConsole for TracingConsole {
    fn log(&self, line: &str) {
        info!(script_log = line, "script output");
    }
}

/// Runs Rhai scripts after static validation.
///
/// Each top-level key of the context object becomes a script variable; the
/// values of those variables after the run form the outcome's context.
/// Scripts record test results with `test(name, passed)`.
#[derive(Clone)]
pub struct ScriptSandbox {
    validator: ScriptSecurityValidator,
    settings: SandboxSettings,
    console: Arc<dyn ScriptConsole>,
}

impl ScriptSandbox {
    /// Creates a sandbox from the engine settings.
    #[must_use]
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            validator: ScriptSecurityValidator::new(settings.security.max_script_length),
            settings: settings.sandbox,
            console: Arc::new(TracingConsole),
        }
    }

    /// Replaces the console that receives `print` and `debug` output.
    #[must_use]
    pub fn with_console(mut self, console: Arc<dyn ScriptConsole>) -> Self {
        self.console = console;
        self
    }

    /// Validates `script` and runs it on the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::SecurityViolation`] if validation finds a
    /// critical issue, otherwise any compilation, runtime or timeout error.
    pub fn execute(&self, script: &str, context: &Value) -> Result<ScriptOutcome, ScriptError> {
        self.check(script)?;
        execute_unchecked(&self.settings, &self.console, script, context)
    }

    fn check(&self, script: &str) -> Result<(), ScriptError> {
        let report = self.validator.validate(script);
        if report.is_valid {
            for finding in &report.violations {
                debug!(%finding, "advisory script finding");
            }
            return Ok(());
        }
        warn!(violations = report.violations.len(), "script blocked");
        Err(ScriptError::SecurityViolation {
            message: report.summary(),
            violations: report.violations,
        })
    }
}

#[async_trait]
impl ScriptRunner for ScriptSandbox {
    async fn run(&self, script: &str, context: Value) -> Result<ScriptOutcome, ScriptError> {
        self.check(script)?;

        let settings = self.settings;
        let console = Arc::clone(&self.console);
        let script = script.to_string();
        let handle = tokio::task::spawn_blocking(move || {
            execute_unchecked(&settings, &console, &script, &context)
        });

        // The engine stops itself at the deadline; this outer bound only
        // covers time spent before the first progress callback.
        let grace = settings.timeout() + std::time::Duration::from_millis(250);
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(ScriptError::Runtime(join.to_string())),
            Err(_) => Err(ScriptError::Timeout {
                timeout_ms: settings.timeout_ms,
            }),
        }
    }
}

fn build_engine(
    settings: &SandboxSettings,
    console: &Arc<dyn ScriptConsole>,
    logs: &Arc<Mutex<Vec<String>>>,
    tests: &Arc<Mutex<Vec<TestAssertionResult>>>,
) -> Engine {
    let mut engine = Engine::new();
    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");
    engine.disable_symbol("import");
    engine.set_max_operations(settings.max_operations);
    engine.set_max_expr_depths(settings.max_expr_depth, settings.max_expr_depth);
    engine.set_max_string_size(settings.max_string_size);
    engine.set_max_array_size(MAX_COLLECTION_SIZE);
    engine.set_max_map_size(MAX_COLLECTION_SIZE);

    let deadline = Instant::now() + settings.timeout();
    engine.on_progress(move |_| (Instant::now() >= deadline).then_some(Dynamic::UNIT));

    {
        let console = Arc::clone(console);
        let logs = Arc::clone(logs);
        engine.on_print(move |line| {
            console.log(line);
            logs.lock().push(line.to_string());
        });
    }
    {
        let console = Arc::clone(console);
        let logs = Arc::clone(logs);
        engine.on_debug(move |line, _source, _pos| {
            console.log(line);
            logs.lock().push(line.to_string());
        });
    }
    {
        let tests = Arc::clone(tests);
        engine.register_fn("test", move |name: &str, passed: bool| {
            tests.lock().push(if passed {
                TestAssertionResult::pass(name)
            } else {
                TestAssertionResult::fail(name, "Assertion failed")
            });
        });
    }
    {
        let tests = Arc::clone(tests);
        engine.register_fn("test", move |name: &str, passed: bool, message: &str| {
            tests.lock().push(if passed {
                TestAssertionResult::pass(name)
            } else {
                TestAssertionResult::fail(name, message)
            });
        });
    }

    engine.register_fn(
        "parse_json",
        |text: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
            rhai::serde::to_dynamic(value)
        },
    );
    engine.register_fn(
        "to_json",
        |value: Dynamic| -> Result<String, Box<EvalAltResult>> {
            let value: Value = rhai::serde::from_dynamic(&value)?;
            Ok(value.to_string())
        },
    );
    engine.register_fn("base64_encode", |text: &str| -> String {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
    });
    engine.register_fn("base64_decode", |text: &str| -> String {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(text.as_bytes())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .unwrap_or_default()
    });
    engine.register_fn("uuid", || uuid::Uuid::now_v7().to_string());
    engine.register_fn("timestamp", || chrono::Utc::now().timestamp_millis());

    engine
}

fn execute_unchecked(
    settings: &SandboxSettings,
    console: &Arc<dyn ScriptConsole>,
    script: &str,
    context: &Value,
) -> Result<ScriptOutcome, ScriptError> {
    let logs = Arc::new(Mutex::new(Vec::new()));
    let tests = Arc::new(Mutex::new(Vec::new()));
    let engine = build_engine(settings, console, &logs, &tests);

    let ast = engine
        .compile(script)
        .map_err(|e| ScriptError::Compilation(e.to_string()))?;

    let mut scope = Scope::new();
    let names: Vec<String> = match context {
        Value::Object(map) => {
            for (name, value) in map {
                let value = rhai::serde::to_dynamic(value)
                    .map_err(|e| ScriptError::Runtime(e.to_string()))?;
                scope.push_dynamic(name.as_str(), value);
            }
            map.keys().cloned().collect()
        }
        _ => Vec::new(),
    };

    let started = Instant::now();
    engine
        .run_ast_with_scope(&mut scope, &ast)
        .map_err(|e| runtime_error(*e, settings.timeout_ms))?;
    debug!(elapsed_ms = started.elapsed().as_millis(), "script finished");

    let mut updated = Map::new();
    for name in names {
        if let Some(value) = scope.get_value::<Dynamic>(&name) {
            let value: Value = rhai::serde::from_dynamic(&value)
                .map_err(|e| ScriptError::Runtime(e.to_string()))?;
            updated.insert(name, value);
        }
    }

    let logs = std::mem::take(&mut *logs.lock());
    let tests = std::mem::take(&mut *tests.lock());
    Ok(ScriptOutcome {
        context: Value::Object(updated),
        tests,
        logs,
    })
}

fn runtime_error(error: EvalAltResult, timeout_ms: u64) -> ScriptError {
    match error {
        EvalAltResult::ErrorTerminated(..) => ScriptError::Timeout { timeout_ms },
        EvalAltResult::ErrorTooManyOperations(..) => {
            ScriptError::Runtime("Script exceeded the operation limit".to_string())
        }
        other => ScriptError::Runtime(other.to_string()),
    }
}
