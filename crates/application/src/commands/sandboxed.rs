//! Sandboxed script phases
//!
//! Scripts written in the sandboxed language see the request (before
//! sending) or the response (after receiving) as plain maps. Changes the
//! pre-request script makes to `request` and `vars` are written back.

use std::collections::BTreeMap;

use courier_domain::{
    HttpMethod, HttpResponse, PreparedRequest, RequestBody, ScopeTarget, TestAssertionResult,
    VariableStore,
};
use serde_json::{Value, json};
use tracing::warn;

use crate::ports::{ScriptError, ScriptOutcome, ScriptRunner};

/// What a sandboxed pre-request script is given, captured from the request
/// and the variables visible to it.
#[derive(Debug, Clone)]
pub struct PreRequestScriptInput {
    context: Value,
    vars: BTreeMap<String, String>,
}

impl PreRequestScriptInput {
    /// Captures the script context. Nothing stays borrowed, so the store can
    /// be unlocked while the script runs.
    #[must_use]
    pub fn capture(request: &PreparedRequest, store: &VariableStore) -> Self {
        let vars: BTreeMap<String, String> = store
            .all_variable_names()
            .into_iter()
            .filter_map(|name| store.resolve_value(&name).map(|value| (name, value)))
            .collect();
        let context = json!({
            "request": request_map(request),
            "vars": vars,
        });
        Self { context, vars }
    }

    /// The value handed to the script runner.
    #[must_use]
    pub const fn context(&self) -> &Value {
        &self.context
    }

    /// Writes the script's changes back. Either every change lands or none.
    ///
    /// Variables the script changed go to the runtime scope.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Runtime`] if the script left an invalid method
    /// or a blank variable name.
    pub fn apply(
        &self,
        outcome: &ScriptOutcome,
        request: &mut PreparedRequest,
        store: &mut VariableStore,
    ) -> Result<(), ScriptError> {
        let mut updated = request.clone();
        if let Some(changed) = outcome.context.get("request") {
            apply_request_changes(changed, &mut updated)?;
        }

        let mut changed_vars = Vec::new();
        if let Some(Value::Object(changed)) = outcome.context.get("vars") {
            for (name, value) in changed {
                let value = value.as_str().map_or_else(|| value.to_string(), ToString::to_string);
                if self.vars.get(name) == Some(&value) {
                    continue;
                }
                if name.trim().is_empty() {
                    return Err(ScriptError::Runtime(format!(
                        "Invalid variable name '{name}'"
                    )));
                }
                changed_vars.push((name.as_str(), value));
            }
        }

        for (name, value) in changed_vars {
            store
                .set_value(&ScopeTarget::Runtime, name, value)
                .map_err(|e| ScriptError::Runtime(e.to_string()))?;
        }
        *request = updated;
        Ok(())
    }
}

/// Runs a sandboxed pre-request script and applies its changes.
///
/// Returns the lines the script printed.
///
/// # Errors
///
/// Returns the sandbox error if the script was blocked or failed, or the
/// apply error if its changes were invalid; the request and store are left
/// untouched in either case.
pub async fn run_pre_request_script(
    runner: &dyn ScriptRunner,
    script: &str,
    request: &mut PreparedRequest,
    store: &mut VariableStore,
) -> Result<Vec<String>, ScriptError> {
    let input = PreRequestScriptInput::capture(request, store);
    let outcome = runner.run(script, input.context().clone()).await?;
    input.apply(&outcome, request, store)?;
    Ok(outcome.logs)
}

/// Runs a sandboxed test script against a response.
///
/// A script that fails as a whole yields the single `Script Execution Error`
/// result instead of a partial list.
pub async fn run_test_script(
    runner: &dyn ScriptRunner,
    script: &str,
    response: &HttpResponse,
) -> Vec<TestAssertionResult> {
    let headers: BTreeMap<&str, &str> = response
        .headers
        .enabled()
        .map(|h| (h.name.as_str(), h.value.as_str()))
        .collect();
    let context = json!({
        "response": {
            "status": response.status,
            "statusText": response.status_text,
            "headers": headers,
            "body": response.body,
            "json": response.body_as_json().unwrap_or(Value::Null),
            "duration": u64::try_from(response.duration.as_millis()).unwrap_or(u64::MAX),
        }
    });

    match runner.run(script, context).await {
        Ok(outcome) => outcome.tests,
        Err(error) => {
            warn!(%error, "test script failed");
            vec![TestAssertionResult::script_error(error.to_string())]
        }
    }
}

fn request_map(request: &PreparedRequest) -> Value {
    let headers: BTreeMap<&str, &str> = request
        .headers
        .enabled()
        .map(|h| (h.name.as_str(), h.value.as_str()))
        .collect();
    let params: BTreeMap<&str, &str> = request
        .params
        .enabled()
        .map(|p| (p.key.as_str(), p.value.as_str()))
        .collect();
    json!({
        "method": request.method.as_str(),
        "url": request.url,
        "headers": headers,
        "params": params,
        "body": request.body.text().unwrap_or_default(),
    })
}

fn apply_request_changes(changed: &Value, request: &mut PreparedRequest) -> Result<(), ScriptError> {
    if let Some(method) = changed.get("method").and_then(Value::as_str) {
        request.method = method
            .parse::<HttpMethod>()
            .map_err(|e| ScriptError::Runtime(e.to_string()))?;
    }
    if let Some(url) = changed.get("url").and_then(Value::as_str) {
        url.clone_into(&mut request.url);
    }
    if let Some(Value::Object(headers)) = changed.get("headers") {
        let removed: Vec<String> = request
            .headers
            .enabled()
            .filter(|h| !headers.keys().any(|k| h.is_named(k)))
            .map(|h| h.name.clone())
            .collect();
        for name in removed {
            request.headers.remove(&name);
        }
        for (name, value) in headers {
            let value = value.as_str().map_or_else(|| value.to_string(), ToString::to_string);
            if request.headers.get(name) != Some(value.as_str()) {
                request.headers.set(name.clone(), value);
            }
        }
    }
    if let Some(Value::Object(params)) = changed.get("params") {
        for (key, value) in params {
            let value = value.as_str().map_or_else(|| value.to_string(), ToString::to_string);
            if request.params.get(key) != Some(value.as_str()) {
                request.params.set(key.clone(), value);
            }
        }
    }
    if let Some(body) = changed.get("body").and_then(Value::as_str)
        && body != request.body.text().unwrap_or_default()
    {
        if request.body.holds_file_data() {
            warn!("pre-request script tried to replace a body that holds file data");
        } else {
            request.body = RequestBody::raw(body);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_domain::{SCRIPT_EXECUTION_ERROR, Variable};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Returns a canned outcome and records the context it was given.
    struct CannedRunner {
        outcome: Result<ScriptOutcome, ScriptError>,
        seen: Mutex<Option<Value>>,
    }

    impl CannedRunner {
        fn new(outcome: Result<ScriptOutcome, ScriptError>) -> Self {
            Self {
                outcome,
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ScriptRunner for CannedRunner {
        async fn run(&self, _script: &str, context: Value) -> Result<ScriptOutcome, ScriptError> {
            *self.seen.lock().unwrap() = Some(context);
            self.outcome.clone()
        }
    }

    #[tokio::test]
    async fn test_pre_request_changes_are_applied() {
        let runner = CannedRunner::new(Ok(ScriptOutcome {
            context: json!({
                "request": {
                    "method": "PUT",
                    "url": "https://changed",
                    "headers": {"X-New": "1"},
                    "params": {"page": "3"},
                    "body": "{}"
                },
                "vars": {"token": "t", "fresh": "yes"}
            }),
            tests: Vec::new(),
            logs: vec!["hello".into()],
        }));
        let mut request = PreparedRequest::get("https://orig").with_header("X-Old", "1");
        let mut store = VariableStore::new();
        store
            .define(&ScopeTarget::Global, "token", Variable::new("t"))
            .unwrap();

        let logs = run_pre_request_script(&runner, "request.url = \"https://changed\";", &mut request, &mut store)
            .await
            .unwrap();

        assert_eq!(logs, vec!["hello"]);
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.url, "https://changed");
        assert!(!request.headers.contains("X-Old"));
        assert_eq!(request.headers.get("X-New"), Some("1"));
        assert_eq!(request.params.get("page"), Some("3"));
        assert_eq!(request.body.text(), Some("{}"));
        assert_eq!(store.get(&ScopeTarget::Runtime, "fresh").map(|v| v.value.as_str()), Some("yes"));
        assert!(store.get(&ScopeTarget::Runtime, "token").is_none());

        let seen = runner.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen["request"]["url"], "https://orig");
        assert_eq!(seen["vars"]["token"], "t");
    }

    #[tokio::test]
    async fn test_pre_request_failure_leaves_request_alone() {
        let runner = CannedRunner::new(Err(ScriptError::Timeout { timeout_ms: 10 }));
        let mut request = PreparedRequest::get("https://orig");
        let mut store = VariableStore::new();

        let err = run_pre_request_script(&runner, "loop {}", &mut request, &mut store)
            .await
            .unwrap_err();
        assert_eq!(err, ScriptError::Timeout { timeout_ms: 10 });
        assert_eq!(request.url, "https://orig");
    }

    #[tokio::test]
    async fn test_invalid_method_leaves_request_and_store_alone() {
        let runner = CannedRunner::new(Ok(ScriptOutcome {
            context: json!({
                "request": {"url": "https://changed", "method": "TELEPORT"},
                "vars": {"token": "new"}
            }),
            tests: Vec::new(),
            logs: Vec::new(),
        }));
        let mut request = PreparedRequest::get("https://orig");
        let mut store = VariableStore::new();

        let err = run_pre_request_script(&runner, "request.method = \"TELEPORT\";", &mut request, &mut store)
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(_)));
        assert_eq!(request.url, "https://orig");
        assert_eq!(request.method, HttpMethod::Get);
        assert!(store.get(&ScopeTarget::Runtime, "token").is_none());
    }

    #[tokio::test]
    async fn test_test_script_results() {
        let runner = CannedRunner::new(Ok(ScriptOutcome {
            context: Value::Null,
            tests: vec![TestAssertionResult::pass("ok")],
            logs: Vec::new(),
        }));
        let response = HttpResponse::new(201, r#"{"id":1}"#);
        let results = run_test_script(&runner, "test(\"ok\", true);", &response).await;
        assert_eq!(results, vec![TestAssertionResult::pass("ok")]);

        let seen = runner.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen["response"]["status"], 201);
        assert_eq!(seen["response"]["json"]["id"], 1);
    }

    #[tokio::test]
    async fn test_failed_test_script_is_one_result() {
        let runner = CannedRunner::new(Err(ScriptError::Runtime("boom".into())));
        let results = run_test_script(&runner, "x", &HttpResponse::new(200, "")).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, SCRIPT_EXECUTION_ERROR);
        assert!(results[0].error.as_deref().unwrap().contains("boom"));
    }
}
