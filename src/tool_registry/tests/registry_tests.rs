//! Registry service tests against the in-memory connector.

use std::sync::Arc;
use std::time::Duration;

use crate::tool_registry::{
    adapters::{InMemoryConnector, InMemoryTool},
    domain::{McpServerName, McpTransport, ToolResponse, TransportState},
    ports::TransportError,
    services::{
        DiscoveryError, InvocationError, InvokeOptions, RegisterServerRequest,
        RegistrationError, RegistryOptions, ToolRegistry,
    },
};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

type TestRegistry = ToolRegistry<InMemoryConnector, DefaultClock>;

struct Harness {
    connector: InMemoryConnector,
    registry: TestRegistry,
}

#[fixture]
fn harness() -> Harness {
    let connector = InMemoryConnector::new();
    let registry = ToolRegistry::new(
        Arc::new(connector.clone()),
        Arc::new(DefaultClock),
        RegistryOptions {
            connect_timeout: Duration::from_secs(2),
            tool_timeout: Duration::from_secs(2),
            max_concurrent_calls: 4,
        },
    );
    Harness {
        connector,
        registry,
    }
}

fn name(value: &str) -> McpServerName {
    McpServerName::new(value).expect("valid server name")
}

fn stdio_request(server: &str) -> RegisterServerRequest {
    RegisterServerRequest::new(
        server,
        McpTransport::stdio("memory-server").expect("valid stdio transport"),
    )
}

fn http_request(server: &str) -> RegisterServerRequest {
    RegisterServerRequest::new(
        server,
        McpTransport::streamable_http("http://127.0.0.1:8000/mcp").expect("valid http transport"),
    )
}

fn pair_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
        "required": ["a", "b"]
    })
}

fn arithmetic(tool: &str, op: fn(i64, i64) -> i64) -> InMemoryTool {
    InMemoryTool::new(tool, pair_schema(), move |arguments| {
        let a = arguments.get("a").and_then(Value::as_i64).unwrap_or_default();
        let b = arguments.get("b").and_then(Value::as_i64).unwrap_or_default();
        ToolResponse::from_text(op(a, b).to_string())
    })
}

fn weather_tool() -> InMemoryTool {
    InMemoryTool::new(
        "get_weather",
        json!({"type": "object", "properties": {"location": {"type": "string"}}, "required": ["location"]}),
        |_| ToolResponse::from_text("It's always sunny"),
    )
}

async fn register_math_and_weather(harness: &Harness) {
    harness
        .connector
        .set_tool_catalog(
            name("math"),
            vec![arithmetic("add", |a, b| a + b), arithmetic("multiply", |a, b| a * b)],
        )
        .expect("catalog stored");
    harness
        .connector
        .set_tool_catalog(name("weather"), vec![weather_tool()])
        .expect("catalog stored");
    harness
        .registry
        .register(vec![stdio_request("math"), http_request("weather")])
        .await
        .expect("registration should succeed");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn register_is_lazy(harness: Harness) {
    register_math_and_weather(&harness).await;

    assert_eq!(harness.connector.connect_count(&name("math")).expect("count"), 0);
    let status = harness
        .registry
        .server_status("math")
        .await
        .expect("server should be registered");
    assert_eq!(status.state(), TransportState::Disconnected);
}

#[rstest]
#[case(vec![stdio_request("math"), stdio_request("MATH")])]
#[case(vec![stdio_request("math"), http_request("math")])]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_names_in_batch_store_nothing(
    harness: Harness,
    #[case] batch: Vec<RegisterServerRequest>,
) {
    let result = harness.registry.register(batch).await;

    assert_eq!(result, Err(RegistrationError::DuplicateName(name("math"))));
    assert!(harness.registry.server_names().await.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_against_registered_server_is_rejected(harness: Harness) {
    harness
        .registry
        .register(vec![stdio_request("math")])
        .await
        .expect("first registration should succeed");

    let result = harness
        .registry
        .register(vec![http_request("weather"), stdio_request("math")])
        .await;

    assert_eq!(result, Err(RegistrationError::DuplicateName(name("math"))));
    assert_eq!(harness.registry.server_names().await, vec![name("math")]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_name_is_rejected(harness: Harness) {
    let result = harness
        .registry
        .register(vec![stdio_request("math server")])
        .await;

    assert!(matches!(
        result,
        Err(RegistrationError::InvalidServerName { name, .. }) if name == "math server"
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn discovery_returns_union_of_tools(harness: Harness) {
    register_math_and_weather(&harness).await;

    let discovered = harness
        .registry
        .discover_tools()
        .await
        .expect("discovery should succeed");

    assert_eq!(
        discovered.tool_names(),
        vec!["add", "get_weather", "multiply"]
    );
    assert!(discovered.unavailable().is_empty());
    let state = harness
        .registry
        .server_status("weather")
        .await
        .map(|status| status.state());
    assert_eq!(state, Some(TransportState::Ready));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unreachable_server_is_omitted(harness: Harness) {
    register_math_and_weather(&harness).await;
    harness
        .connector
        .set_unreachable(name("weather"), "connection refused")
        .expect("stored");

    let discovered = harness
        .registry
        .discover_tools()
        .await
        .expect("discovery should degrade gracefully");

    assert_eq!(discovered.tool_names(), vec!["add", "multiply"]);
    let unavailable: Vec<&str> = discovered
        .unavailable()
        .iter()
        .map(|entry| entry.server.as_str())
        .collect();
    assert_eq!(unavailable, vec!["weather"]);
    let status = harness
        .registry
        .server_status("weather")
        .await
        .expect("registered");
    assert_eq!(status.state(), TransportState::Failed);
    assert!(status.last_error().is_some_and(|reason| reason.contains("connection refused")));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn single_failed_server_reports_transport_unavailable(harness: Harness) {
    harness
        .registry
        .register(vec![stdio_request("math")])
        .await
        .expect("registered");
    harness
        .connector
        .set_unreachable(name("math"), "spawn failed")
        .expect("stored");

    let result = harness.registry.discover_tools().await;

    assert!(matches!(
        result,
        Err(DiscoveryError::TransportUnavailable { server, .. }) if server == name("math")
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn every_failed_server_reports_all_unavailable(harness: Harness) {
    register_math_and_weather(&harness).await;
    for server in ["math", "weather"] {
        harness
            .connector
            .set_unreachable(name(server), "down")
            .expect("stored");
    }

    let result = harness.registry.discover_tools().await;

    assert!(matches!(
        result,
        Err(DiscoveryError::AllServersUnavailable(servers)) if servers.len() == 2
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn colliding_tool_names_fail_and_keep_mapping(harness: Harness) {
    register_math_and_weather(&harness).await;
    harness
        .registry
        .discover_tools()
        .await
        .expect("first discovery should succeed");
    harness
        .connector
        .set_tool_catalog(name("weather"), vec![weather_tool(), arithmetic("add", |a, b| a + b)])
        .expect("catalog stored");

    let result = harness.registry.discover_tools().await;

    assert_eq!(
        result,
        Err(DiscoveryError::NameCollision {
            tool: "add".to_owned(),
            first_server: name("math"),
            second_server: name("weather"),
        })
    );
    assert_eq!(harness.registry.tools().await.len(), 3);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn discovery_without_servers_fails(harness: Harness) {
    assert_eq!(
        harness.registry.discover_tools().await,
        Err(DiscoveryError::NoServersRegistered)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_discovery_leaves_mapping_unchanged(harness: Harness) {
    register_math_and_weather(&harness).await;
    let token = CancellationToken::new();
    token.cancel();

    let result = harness.registry.discover_tools_with(&token).await;

    assert_eq!(result, Err(DiscoveryError::Cancelled));
    assert!(harness.registry.tools().await.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_rediscovery_keeps_ready_sessions(harness: Harness) {
    register_math_and_weather(&harness).await;
    harness.registry.discover_tools().await.expect("discovery");
    let token = CancellationToken::new();
    token.cancel();

    let result = harness.registry.discover_tools_with(&token).await;

    assert_eq!(result, Err(DiscoveryError::Cancelled));
    assert_eq!(harness.connector.closed_session_count().expect("count"), 0);
    let state = harness
        .registry
        .server_status("math")
        .await
        .map(|status| status.state());
    assert_eq!(state, Some(TransportState::Ready));

    let response = harness
        .registry
        .invoke("add", json!({"a": 3, "b": 5}), InvokeOptions::new())
        .await
        .expect("invoke should reuse the kept session");
    assert_eq!(response.text(), "8");
    assert_eq!(harness.connector.connect_count(&name("math")).expect("count"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_server_reconnects_on_rediscovery(harness: Harness) {
    register_math_and_weather(&harness).await;
    harness
        .connector
        .set_unreachable(name("weather"), "down")
        .expect("stored");
    harness.registry.discover_tools().await.expect("partial discovery");

    harness
        .connector
        .set_reachable(&name("weather"))
        .expect("stored");
    let discovered = harness.registry.discover_tools().await.expect("rediscovery");

    assert!(discovered.tools().contains_key("get_weather"));
    assert_eq!(harness.connector.connect_count(&name("weather")).expect("count"), 2);
    assert_eq!(harness.connector.connect_count(&name("math")).expect("count"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invoke_dispatches_to_owning_server(harness: Harness) {
    register_math_and_weather(&harness).await;
    harness.registry.discover_tools().await.expect("discovery");

    let response = harness
        .registry
        .invoke("add", json!({"a": 3, "b": 5}), InvokeOptions::new())
        .await
        .expect("invoke should succeed");

    assert_eq!(response.text(), "8");
    let state = harness
        .registry
        .server_status("math")
        .await
        .map(|status| status.state());
    assert_eq!(state, Some(TransportState::Ready));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_tool_never_touches_transport(harness: Harness) {
    register_math_and_weather(&harness).await;
    harness.registry.discover_tools().await.expect("discovery");

    let result = harness
        .registry
        .invoke("subtract", json!({"a": 1, "b": 1}), InvokeOptions::new())
        .await;

    assert!(matches!(result, Err(InvocationError::UnknownTool(tool)) if tool == "subtract"));
    assert_eq!(harness.connector.call_count().expect("count"), 0);
}

#[rstest]
#[case(json!({"a": 3}))]
#[case(json!({"a": "3", "b": 5}))]
#[case(json!([3, 5]))]
#[tokio::test(flavor = "multi_thread")]
async fn schema_mismatch_never_touches_transport(harness: Harness, #[case] arguments: Value) {
    register_math_and_weather(&harness).await;
    harness.registry.discover_tools().await.expect("discovery");

    let result = harness
        .registry
        .invoke("add", arguments, InvokeOptions::new())
        .await;

    assert!(matches!(result, Err(InvocationError::SchemaMismatch { .. })));
    assert_eq!(harness.connector.call_count().expect("count"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn timeout_returns_promptly_and_server_stays_usable(harness: Harness) {
    harness
        .connector
        .set_tool_catalog(
            name("math"),
            vec![
                arithmetic("slow_add", |a, b| a + b).with_delay(Duration::from_secs(5)),
                arithmetic("add", |a, b| a + b),
            ],
        )
        .expect("catalog stored");
    harness
        .registry
        .register(vec![stdio_request("math")])
        .await
        .expect("registered");
    harness.registry.discover_tools().await.expect("discovery");

    let started = tokio::time::Instant::now();
    let result = harness
        .registry
        .invoke(
            "slow_add",
            json!({"a": 1, "b": 2}),
            InvokeOptions::new().with_timeout(Duration::from_millis(50)),
        )
        .await;

    assert!(matches!(result, Err(InvocationError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(2));

    let response = harness
        .registry
        .invoke("add", json!({"a": 1, "b": 2}), InvokeOptions::new())
        .await
        .expect("transport should remain usable");
    assert_eq!(response.text(), "3");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancellation_aborts_in_flight_call(harness: Harness) {
    harness
        .connector
        .set_tool_catalog(
            name("math"),
            vec![arithmetic("add", |a, b| a + b).with_delay(Duration::from_secs(5))],
        )
        .expect("catalog stored");
    harness
        .registry
        .register(vec![stdio_request("math")])
        .await
        .expect("registered");
    harness.registry.discover_tools().await.expect("discovery");

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = harness
        .registry
        .invoke(
            "add",
            json!({"a": 1, "b": 2}),
            InvokeOptions::new().with_cancellation(token),
        )
        .await;

    assert!(matches!(result, Err(InvocationError::Cancelled { tool }) if tool == "add"));
    let state = harness
        .registry
        .server_status("math")
        .await
        .map(|status| status.state());
    assert_eq!(state, Some(TransportState::Ready));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn broken_session_fails_server_until_rediscovery(harness: Harness) {
    register_math_and_weather(&harness).await;
    harness.registry.discover_tools().await.expect("discovery");
    harness
        .connector
        .break_sessions(name("math"))
        .expect("stored");

    let first = harness
        .registry
        .invoke("add", json!({"a": 1, "b": 1}), InvokeOptions::new())
        .await;
    assert!(matches!(
        first,
        Err(InvocationError::TransportError {
            source: TransportError::Closed,
            ..
        })
    ));

    let second = harness
        .registry
        .invoke("add", json!({"a": 1, "b": 1}), InvokeOptions::new())
        .await;
    assert!(matches!(
        second,
        Err(InvocationError::ServerUnavailable {
            state: TransportState::Failed,
            ..
        })
    ));

    harness
        .connector
        .set_reachable(&name("math"))
        .expect("stored");
    harness.registry.discover_tools().await.expect("rediscovery");
    let recovered = harness
        .registry
        .invoke("add", json!({"a": 1, "b": 1}), InvokeOptions::new())
        .await
        .expect("fresh session should work");
    assert_eq!(recovered.text(), "2");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn shutdown_then_invoke_reports_closed(harness: Harness) {
    register_math_and_weather(&harness).await;
    harness.registry.discover_tools().await.expect("discovery");

    harness.registry.shutdown().await;
    harness.registry.shutdown().await;

    let result = harness
        .registry
        .invoke("add", json!({"a": 1, "b": 1}), InvokeOptions::new())
        .await;
    assert!(matches!(result, Err(InvocationError::RegistryClosed)));
    assert_eq!(harness.connector.closed_session_count().expect("count"), 2);
    assert_eq!(
        harness.registry.discover_tools().await,
        Err(DiscoveryError::RegistryClosed)
    );
    assert_eq!(
        harness.registry.register(vec![stdio_request("other")]).await,
        Err(RegistrationError::RegistryClosed)
    );
    let state = harness
        .registry
        .server_status("math")
        .await
        .map(|status| status.state());
    assert_eq!(state, Some(TransportState::Closed));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn shutdown_before_discovery_is_valid(harness: Harness) {
    register_math_and_weather(&harness).await;

    harness.registry.shutdown().await;

    assert!(harness.registry.is_closed().await);
    assert_eq!(harness.connector.connect_count(&name("math")).expect("count"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_invocations_all_complete(harness: Harness) {
    harness
        .connector
        .set_tool_catalog(
            name("math"),
            vec![arithmetic("add", |a, b| a + b).with_delay(Duration::from_millis(20))],
        )
        .expect("catalog stored");
    harness
        .registry
        .register(vec![stdio_request("math")])
        .await
        .expect("registered");
    harness.registry.discover_tools().await.expect("discovery");

    let calls = (0..10_i64).map(|index| {
        harness
            .registry
            .invoke("add", json!({"a": index, "b": 1}), InvokeOptions::new())
    });
    let results = futures::future::join_all(calls).await;

    let texts: Vec<String> = results
        .into_iter()
        .map(|result| result.expect("call should succeed").text())
        .collect();
    let expected: Vec<String> = (1..=10).map(|value: i64| value.to_string()).collect();
    assert_eq!(texts, expected);
}
