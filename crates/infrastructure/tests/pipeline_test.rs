//! End-to-end tests: persisted scopes, the reqwest transport against a local
//! server, both script languages and structured references to the recorded
//! snapshots.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use courier_application::AdmissionController;
use courier_application::ports::{KeyValueStore, StandardJsonPath};
use courier_application::use_cases::{
    ExecuteRequestPipeline, ExecutionTarget, FlushVariableScopes, LoadVariableScopes,
};
use courier_application::VariableResolver;
use courier_domain::{
    Container, ContainerKind, EngineSettings, PreparedRequest, RequestItem, RequestScripts,
    Script, SnapshotCatalog,
};
use courier_infrastructure::{FileKeyValueStore, ReqwestTransport, ScriptSandbox, SystemClock};

/// Serves every connection with the same JSON body and echoes the request
/// line in `X-Request-Line`.
async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buffer = Vec::new();
                let mut chunk = [0_u8; 1024];
                while !buffer.windows(4).any(|w| w == b"\r\n\r\n") {
                    let read = socket.read(&mut chunk).await.unwrap();
                    if read == 0 {
                        return;
                    }
                    buffer.extend_from_slice(&chunk[..read]);
                }
                let head = String::from_utf8_lossy(&buffer).to_string();
                let request_line = head.lines().next().unwrap_or_default().to_string();

                let body = r#"{"data":{"id":42,"tags":["a","b"]}}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nX-Trace: t-1\r\nX-Request-Line: {request_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            });
        }
    });

    format!("http://{address}")
}

fn pipeline() -> ExecuteRequestPipeline {
    let settings = EngineSettings::default();
    ExecuteRequestPipeline::new(
        Arc::new(ReqwestTransport::new().unwrap()),
        Arc::new(ScriptSandbox::new(&settings)),
        Arc::new(SystemClock::new()),
        AdmissionController::new(settings.admission),
    )
}

#[tokio::test]
async fn test_command_scripts_and_structured_reference() {
    let base = spawn_server().await;
    let dir = tempdir().unwrap();
    let store = FileKeyValueStore::new(dir.path().join("store.json"));
    store
        .set(
            [
                ("global".to_string(), json!({"base": {"value": base}})),
                ("env_dev".to_string(), json!({"version": {"value": "v1"}})),
            ]
            .into_iter()
            .collect(),
        )
        .await
        .unwrap();

    let variables = LoadVariableScopes::new(&store).execute(Some("dev")).await.unwrap();

    let item = RequestItem::new("Get Order", PreparedRequest::get("{{base}}/{{version}}/orders"))
        .with_scripts(RequestScripts {
            pre_request: Some(Script::commands("setParam page 2\naddHeader X-Client courier")),
            tests: Some(Script::commands(
                "status 200\njsonValueEquals data.id 42\nheaderContains X-Request-Line page=2\nsetVarFromHeader trace X-Trace",
            )),
        });
    let catalog = SnapshotCatalog::new()
        .with_container(Container::new(ContainerKind::Collections, "Orders").with_item(item));
    let (catalog, variables) = (Mutex::new(catalog), Mutex::new(variables));

    let outcome = pipeline()
        .execute(
            &ExecutionTarget::new(ContainerKind::Collections, "Orders", "Get Order"),
            &catalog,
            &variables,
        )
        .await
        .unwrap();

    assert!(outcome.tests.all_passed(), "{:?}", outcome.tests.results);
    assert_eq!(outcome.response.status_text, "OK");

    let (catalog, variables) = (catalog.into_inner(), variables.into_inner());
    let resolver = VariableResolver::new(&variables, &catalog, &StandardJsonPath);
    let id = resolver
        .substitute(r#"id=${"collections"."Orders"."Get Order"."response"."body".jsonPath("$.data.id")}"#)
        .unwrap();
    assert_eq!(id, "id=42");
    let trace = resolver
        .substitute(r#"${"collections"."Orders"."Get Order"."response"."headers"."x-trace"}"#)
        .unwrap();
    assert_eq!(trace, "t-1");
    assert!(
        resolver
            .substitute(r#"${"collections"."Orders"."Get Order"."response"."body".jsonPath("$.missing")}"#)
            .is_err()
    );

    FlushVariableScopes::new(&store).execute(&variables).await.unwrap();
    let persisted = store.get(&["env_dev"]).await.unwrap();
    assert_eq!(persisted["env_dev"]["trace"]["value"], "t-1");
}

#[tokio::test]
async fn test_sandboxed_scripts() {
    let base = spawn_server().await;
    let variables = LoadVariableScopes::new(&FileKeyValueStore::new(
        tempdir().unwrap().path().join("empty.json"),
    ))
    .execute(None)
    .await
    .unwrap();

    let item = RequestItem::new("Search", PreparedRequest::get(format!("{base}/search")))
        .with_scripts(RequestScripts {
            pre_request: Some(Script::sandboxed(
                r#"
                    request.params["q"] = "rust";
                    request.headers["X-Mode"] = "sandboxed";
                    print("prepared " + request.url);
                "#,
            )),
            tests: Some(Script::sandboxed(
                r#"
                    test("status is 200", response.status == 200);
                    test("two tags", response.json.data.tags.len() == 2);
                    test("query sent", response.headers["x-request-line"].contains("q=rust"));
                "#,
            )),
        });
    let catalog = SnapshotCatalog::new()
        .with_container(Container::new(ContainerKind::Scenarios, "Smoke").with_item(item));
    let (catalog, variables) = (Mutex::new(catalog), Mutex::new(variables));

    let outcome = pipeline()
        .execute(
            &ExecutionTarget::new(ContainerKind::Scenarios, "Smoke", "Search"),
            &catalog,
            &variables,
        )
        .await
        .unwrap();

    assert_eq!(outcome.script_logs, vec![format!("prepared {base}/search")]);
    assert_eq!(outcome.tests.total, 3);
    assert!(outcome.tests.all_passed(), "{:?}", outcome.tests.results);
    assert_eq!(outcome.request.headers.get("X-Mode"), Some("sandboxed"));
}
