//! Execute request use case
//!
//! Runs one stored request end to end: admission, substitution, the
//! pre-request phase, the transport call, the test phase and finally the
//! snapshot update that later structured references read from.

use std::sync::Arc;

use courier_domain::{
    ContainerKind, HttpResponse, PreparedRequest, RequestSnapshot, ResponseSnapshot,
    ScriptLanguage, SnapshotCatalog, TestResults, VariableMap, VariableStore,
};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::admission::{AdmissionController, AdmissionError};
use crate::commands::sandboxed::{PreRequestScriptInput, run_test_script};
use crate::commands::{
    CommandContext, PreRequestCommandInterpreter, PreRequestReport, TestCommandInterpreter,
};
use crate::error::ReferenceError;
use crate::ports::{
    Clock, HttpTransport, JsonPathEvaluator, ScriptError, ScriptRunner, StandardJsonPath,
    TransportError,
};
use crate::variable_resolver::VariableResolver;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum ExecutePipelineError {
    /// No admission slot freed up in time.
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// The target request does not exist.
    #[error("{kind} '{container}' has no request named '{item}'")]
    ItemNotFound {
        /// Container kind
        kind: ContainerKind,
        /// Container name
        container: String,
        /// Request name
        item: String,
    },

    /// A structured reference in the request failed.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// The sandboxed pre-request script was blocked or failed.
    #[error("Pre-request script failed: {0}")]
    PreRequestScript(#[from] ScriptError),

    /// The request has no URL after substitution.
    #[error("URL is required")]
    EmptyUrl,

    /// The transport call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Names the stored request to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTarget {
    /// Container kind
    pub kind: ContainerKind,
    /// Container name
    pub container: String,
    /// Request name
    pub item: String,
}

impl ExecutionTarget {
    /// Creates a target.
    #[must_use]
    pub fn new(kind: ContainerKind, container: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            kind,
            container: container.into(),
            item: item.into(),
        }
    }
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The request as sent.
    pub request: PreparedRequest,
    /// The transport response.
    pub response: HttpResponse,
    /// Per-line report of a command pre-request script.
    pub pre_request: PreRequestReport,
    /// Lines printed by a sandboxed pre-request script.
    pub script_logs: Vec<String>,
    /// Test results, also stored on the response snapshot.
    pub tests: TestResults,
}

/// Use case for executing a stored request.
pub struct ExecuteRequestPipeline {
    transport: Arc<dyn HttpTransport>,
    scripts: Arc<dyn ScriptRunner>,
    clock: Arc<dyn Clock>,
    admission: AdmissionController,
    json_path: Arc<dyn JsonPathEvaluator>,
}

impl ExecuteRequestPipeline {
    /// Creates the pipeline with the standard JSONPath evaluator.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        scripts: Arc<dyn ScriptRunner>,
        clock: Arc<dyn Clock>,
        admission: AdmissionController,
    ) -> Self {
        Self {
            transport,
            scripts,
            clock,
            admission,
            json_path: Arc::new(StandardJsonPath),
        }
    }

    /// Replaces the JSONPath evaluator (builder pattern).
    #[must_use]
    pub fn with_json_path(mut self, json_path: Arc<dyn JsonPathEvaluator>) -> Self {
        self.json_path = json_path;
        self
    }

    /// Runs the stored request named by `target`.
    ///
    /// The catalog and store are shared with other runs. Each is locked only
    /// for the synchronous phases, never across the transport call or a
    /// sandboxed script, so concurrent runs are bounded by admission alone.
    /// Runtime variables set during the run belong to that run and are
    /// dropped when it ends, successful or not.
    ///
    /// # Errors
    ///
    /// Returns an error if admission is rejected, the request is missing or
    /// its URL is empty, a structured reference fails, a sandboxed
    /// pre-request script fails, or the transport fails.
    pub async fn execute(
        &self,
        target: &ExecutionTarget,
        catalog: &Mutex<SnapshotCatalog>,
        store: &Mutex<VariableStore>,
    ) -> Result<PipelineOutcome, ExecutePipelineError> {
        let _permit = self.admission.acquire().await?;
        let mut scope = RunScope {
            catalog,
            store,
            runtime: VariableMap::new(),
        };
        self.run(target, &mut scope).await
    }

    async fn run(
        &self,
        target: &ExecutionTarget,
        scope: &mut RunScope<'_>,
    ) -> Result<PipelineOutcome, ExecutePipelineError> {
        let json_path = self.json_path.as_ref();
        let (authored, scripts) = scope
            .catalog
            .lock()
            .container(target.kind, &target.container)
            .and_then(|c| c.item(&target.item))
            .map(|item| (item.request.clone(), item.scripts.clone()))
            .ok_or_else(|| ExecutePipelineError::ItemNotFound {
                kind: target.kind,
                container: target.container.clone(),
                item: target.item.clone(),
            })?;

        let mut request = scope.with_store(|store, catalog| {
            VariableResolver::new(&*store, catalog, json_path).resolve_request(&authored)
        })?;

        let mut pre_request = PreRequestReport::default();
        let mut script_logs = Vec::new();
        if let Some(script) = scripts.runnable_pre_request() {
            match script.language {
                ScriptLanguage::CommandDsl => {
                    pre_request = scope.with_store(|store, catalog| {
                        let mut context = CommandContext::new(store, catalog, json_path);
                        PreRequestCommandInterpreter::new().run(
                            &script.content,
                            &mut request,
                            &mut context,
                        )
                    });
                }
                ScriptLanguage::Sandboxed => {
                    let input =
                        scope.with_store(|store, _| PreRequestScriptInput::capture(&request, store));
                    let outcome = self
                        .scripts
                        .run(&script.content, input.context().clone())
                        .await?;
                    scope.with_store(|store, _| input.apply(&outcome, &mut request, store))?;
                    script_logs = outcome.logs;
                }
            }
        }

        if request.url.trim().is_empty() {
            return Err(ExecutePipelineError::EmptyUrl);
        }

        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.send(&request).await?;

        let results = match scripts.runnable_tests() {
            Some(script) => match script.language {
                ScriptLanguage::CommandDsl => scope.with_store(|store, catalog| {
                    let mut context = CommandContext::new(store, catalog, json_path);
                    TestCommandInterpreter::new().run_script(&script.content, &response, &mut context)
                }),
                ScriptLanguage::Sandboxed => {
                    run_test_script(self.scripts.as_ref(), &script.content, &response).await
                }
            },
            None => Vec::new(),
        };

        let captured_at = self.clock.now();
        {
            let mut catalog = scope.catalog.lock();
            if let Some(item) = catalog
                .container_mut(target.kind, &target.container)
                .and_then(|c| c.item_mut(&target.item))
            {
                item.record_execution(
                    RequestSnapshot::capture(&request, captured_at),
                    ResponseSnapshot::capture(&response, results.clone(), captured_at),
                );
            }
        }

        let tests = TestResults::new(results);
        info!(
            item = %target.item,
            status = response.status,
            passed = tests.passed,
            failed = tests.failed,
            "request executed"
        );

        Ok(PipelineOutcome {
            request,
            response,
            pre_request,
            script_logs,
            tests,
        })
    }
}

/// The shared state one run works against, plus its private runtime scope.
struct RunScope<'a> {
    catalog: &'a Mutex<SnapshotCatalog>,
    store: &'a Mutex<VariableStore>,
    runtime: VariableMap,
}

impl RunScope<'_> {
    /// Locks the catalog, then the store, and runs `f` with this run's
    /// runtime variables swapped into the store.
    fn with_store<R>(&mut self, f: impl FnOnce(&mut VariableStore, &SnapshotCatalog) -> R) -> R {
        let catalog = self.catalog.lock();
        let mut store = self.store.lock();
        let outer = store.replace_runtime(std::mem::take(&mut self.runtime));
        let result = f(&mut *store, &*catalog);
        self.runtime = store.replace_runtime(outer);
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::significant_drop_tightening)]
mod tests {
    use super::*;
    use crate::ports::ScriptOutcome;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use courier_domain::{
        AdmissionSettings, Container, ExecutionKind, RequestItem, RequestScripts, ScopeTarget,
        Script, Variable,
    };
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockTransport {
        sent: Mutex<Vec<PreparedRequest>>,
        response: HttpResponse,
    }

    impl MockTransport {
        fn returning(response: HttpResponse) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                response,
            })
        }

        fn last_sent(&self) -> PreparedRequest {
            self.sent.lock().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, TransportError> {
            self.sent.lock().push(request.clone());
            Ok(self.response.clone())
        }
    }

    struct ScriptedRunner {
        outcome: Result<ScriptOutcome, ScriptError>,
    }

    #[async_trait]
    impl ScriptRunner for ScriptedRunner {
        async fn run(&self, _script: &str, context: Value) -> Result<ScriptOutcome, ScriptError> {
            self.outcome.clone().map(|mut outcome| {
                if outcome.context.is_null() {
                    outcome.context = context;
                }
                outcome
            })
        }
    }

    fn idle_runner() -> Arc<ScriptedRunner> {
        Arc::new(ScriptedRunner {
            outcome: Ok(ScriptOutcome {
                context: Value::Null,
                tests: Vec::new(),
                logs: Vec::new(),
            }),
        })
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()))
    }

    fn catalog(item: RequestItem) -> SnapshotCatalog {
        SnapshotCatalog::new()
            .with_container(Container::new(ContainerKind::Collections, "Orders").with_item(item))
    }

    fn target(item: &str) -> ExecutionTarget {
        ExecutionTarget::new(ContainerKind::Collections, "Orders", item)
    }

    fn pipeline(transport: Arc<MockTransport>, runner: Arc<ScriptedRunner>) -> ExecuteRequestPipeline {
        ExecuteRequestPipeline::new(transport, runner, clock(), AdmissionController::default())
    }

    #[tokio::test]
    async fn test_full_run_records_snapshots() {
        let transport = MockTransport::returning(
            HttpResponse::new(200, r#"{"data":{"id":42}}"#).with_header("X-Trace", "t-1"),
        );
        let item = RequestItem::new("Get Order", PreparedRequest::get("{{host}}/orders/1"))
            .with_scripts(RequestScripts {
                pre_request: Some(Script::commands("addHeader X-Client courier")),
                tests: Some(Script::commands(
                    "status 200\njsonValueEquals data.id 42\nsetVarFromHeader trace X-Trace",
                )),
            });
        let catalog = Mutex::new(catalog(item));
        let mut variables = VariableStore::new();
        variables.activate_environment(courier_domain::ActiveEnvironment::new(
            "dev",
            VariableMap::new(),
        ));
        variables
            .define(&ScopeTarget::Environment, "host", Variable::new("https://api.test"))
            .unwrap();
        let store = Mutex::new(variables);

        let outcome = pipeline(transport.clone(), idle_runner())
            .execute(&target("Get Order"), &catalog, &store)
            .await
            .unwrap();

        let sent = transport.last_sent();
        assert_eq!(sent.url, "https://api.test/orders/1");
        assert_eq!(sent.headers.get("X-Client"), Some("courier"));
        assert!(outcome.pre_request.is_clean());
        assert_eq!(outcome.tests.total, 3);
        assert!(outcome.tests.all_passed(), "{:?}", outcome.tests.results);
        assert_eq!(store.lock().resolve_value("trace").as_deref(), Some("t-1"));

        let catalog = catalog.lock();
        let item = catalog
            .container(ContainerKind::Collections, "Orders")
            .and_then(|c| c.item("Get Order"))
            .unwrap();
        let response = item.snapshot_value(ExecutionKind::Response).unwrap();
        assert_eq!(response["status"], 200);
        assert_eq!(response["testResults"].as_array().map(Vec::len), Some(3));
        let request = item.snapshot_value(ExecutionKind::Request).unwrap();
        assert_eq!(request["url"], "https://api.test/orders/1");
    }

    #[tokio::test]
    async fn test_missing_item() {
        let transport = MockTransport::returning(HttpResponse::new(200, ""));
        let catalog = Mutex::new(catalog(RequestItem::new("List", PreparedRequest::get("http://x"))));
        let err = pipeline(transport, idle_runner())
            .execute(&target("Nope"), &catalog, &Mutex::new(VariableStore::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutePipelineError::ItemNotFound { .. }));
        assert_eq!(err.to_string(), "collections 'Orders' has no request named 'Nope'");
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let transport = MockTransport::returning(HttpResponse::new(200, ""));
        let catalog = Mutex::new(catalog(RequestItem::new("Blank", PreparedRequest::get("  "))));
        let err = pipeline(transport, idle_runner())
            .execute(&target("Blank"), &catalog, &Mutex::new(VariableStore::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutePipelineError::EmptyUrl));
    }

    #[tokio::test]
    async fn test_blocked_pre_request_script_stops_the_run() {
        let transport = MockTransport::returning(HttpResponse::new(200, ""));
        let runner = Arc::new(ScriptedRunner {
            outcome: Err(ScriptError::SecurityViolation {
                message: "blocked".to_string(),
                violations: Vec::new(),
            }),
        });
        let item = RequestItem::new("Guarded", PreparedRequest::get("http://x")).with_scripts(
            RequestScripts {
                pre_request: Some(Script::sandboxed("eval(\"1\")")),
                tests: None,
            },
        );
        let catalog = Mutex::new(catalog(item));

        let err = pipeline(transport.clone(), runner)
            .execute(&target("Guarded"), &catalog, &Mutex::new(VariableStore::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutePipelineError::PreRequestScript(_)));
        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_sandboxed_test_failure_is_one_result() {
        let transport = MockTransport::returning(HttpResponse::new(500, "oops"));
        let runner = Arc::new(ScriptedRunner {
            outcome: Err(ScriptError::Timeout { timeout_ms: 10 }),
        });
        let item = RequestItem::new("Flaky", PreparedRequest::get("http://x")).with_scripts(
            RequestScripts {
                pre_request: None,
                tests: Some(Script::sandboxed("loop {}")),
            },
        );
        let catalog = Mutex::new(catalog(item));

        let outcome = pipeline(transport, runner)
            .execute(&target("Flaky"), &catalog, &Mutex::new(VariableStore::new()))
            .await
            .unwrap();
        assert_eq!(outcome.tests.total, 1);
        assert_eq!(
            outcome.tests.results[0].name,
            courier_domain::SCRIPT_EXECUTION_ERROR
        );
    }

    #[tokio::test]
    async fn test_runtime_scope_is_cleared_after_run() {
        let transport = MockTransport::returning(HttpResponse::new(200, ""));
        let item = RequestItem::new("Tagged", PreparedRequest::get("http://x/{{tag}}"))
            .with_scripts(RequestScripts {
                pre_request: Some(Script::commands("setVar tag v1\nsetUrlWithVar http://x/{{tag}}")),
                tests: None,
            });
        let catalog = Mutex::new(catalog(item));
        let store = Mutex::new(VariableStore::new());

        pipeline(transport.clone(), idle_runner())
            .execute(&target("Tagged"), &catalog, &store)
            .await
            .unwrap();
        assert_eq!(transport.last_sent().url, "http://x/v1");
        assert_eq!(store.lock().resolve_value("tag"), None);
    }

    /// Holds every send for a while and records how many overlap.
    #[derive(Default)]
    struct SlowTransport {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl HttpTransport for SlowTransport {
        async fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, TransportError> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(active, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(HttpResponse::new(200, request.url.clone()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_runs_on_shared_state_stop_at_the_ceiling() {
        let transport = Arc::new(SlowTransport::default());
        let item = RequestItem::new("Tagged", PreparedRequest::get("http://x/{{tag}}"))
            .with_scripts(RequestScripts {
                pre_request: Some(Script::commands("setVar tag v1\nsetUrlWithVar http://x/{{tag}}")),
                tests: Some(Script::commands("status 200\nbodyContains /v1")),
            });
        let catalog = Mutex::new(catalog(item));
        let store = Mutex::new(VariableStore::new());
        let pipeline = ExecuteRequestPipeline::new(
            transport.clone(),
            idle_runner(),
            clock(),
            AdmissionController::default(),
        );
        let target = target("Tagged");

        let (pipeline, target, catalog_ref, store_ref) = (&pipeline, &target, &catalog, &store);
        let run = move || pipeline.execute(target, catalog_ref, store_ref);
        let (a, b, c, d, e, f) = tokio::join!(run(), run(), run(), run(), run(), run());

        for outcome in [a, b, c, d, e, f] {
            let outcome = outcome.unwrap();
            assert!(outcome.tests.all_passed(), "{:?}", outcome.tests.results);
        }
        assert_eq!(transport.peak.load(Ordering::SeqCst), 5);
        assert_eq!(store.lock().resolve_value("tag"), None);
    }

    #[tokio::test]
    async fn test_admission_rejection_skips_transport() {
        let transport = MockTransport::returning(HttpResponse::new(200, ""));
        let admission = AdmissionController::new(AdmissionSettings {
            max_in_flight: 1,
            base_delay_ms: 1,
            max_attempts: 1,
        });
        let _held = admission.try_acquire().unwrap();
        let pipeline =
            ExecuteRequestPipeline::new(transport.clone(), idle_runner(), clock(), admission);
        let catalog = Mutex::new(catalog(RequestItem::new("List", PreparedRequest::get("http://x"))));

        let err = pipeline
            .execute(&target("List"), &catalog, &Mutex::new(VariableStore::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutePipelineError::Admission(_)));
        assert!(transport.sent.lock().is_empty());
    }
}
