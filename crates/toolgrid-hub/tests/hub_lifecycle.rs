//! End-to-end lifecycle tests over the [`ToolHub`] facade with scripted
//! mock transports.

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::assert_ok;

use toolgrid_hub::{
    BackoffPolicy, ConnectionState, ErrorCategory, ErrorReport, ErrorSink, HubError,
    ServerDefinition, ToolDescriptor, ToolHub, ToolOutcome, ToolTransport, TransportError,
    TransportFactory,
};

/// Transport stub serving a fixed tool list and echoing calls.
struct MockTransport {
    tools: Vec<ToolDescriptor>,
}

#[async_trait]
impl ToolTransport for MockTransport {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: HashMap<String, serde_json::Value>,
    ) -> Result<ToolOutcome, TransportError> {
        Ok(ToolOutcome::success(json!({
            "tool": name,
            "argumentCount": arguments.len(),
        })))
    }

    async fn close(&self) {}
}

/// Factory with per-server tool lists and a per-server refusal switch.
#[derive(Default)]
struct MockFactory {
    attempts: AtomicUsize,
    tools_by_server: Mutex<HashMap<String, Vec<ToolDescriptor>>>,
    refusing: Mutex<HashSet<String>>,
}

impl MockFactory {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn set_tools(&self, server_id: &str, tools: &[&str]) {
        let descriptors = tools.iter().map(|name| ToolDescriptor::new(*name)).collect();
        self.tools_by_server
            .lock()
            .unwrap()
            .insert(server_id.to_string(), descriptors);
    }

    fn refuse(&self, server_id: &str) {
        self.refusing.lock().unwrap().insert(server_id.to_string());
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn create(
        &self,
        definition: &ServerDefinition,
    ) -> Result<Arc<dyn ToolTransport>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refusing.lock().unwrap().contains(&definition.id) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }
        let tools = self
            .tools_by_server
            .lock()
            .unwrap()
            .get(&definition.id)
            .cloned()
            .unwrap_or_default();
        Ok(Arc::new(MockTransport { tools }))
    }
}

/// Sink that records every report for assertions.
#[derive(Clone, Default)]
struct CapturingSink {
    reports: Arc<Mutex<Vec<ErrorReport>>>,
}

impl CapturingSink {
    fn categories(&self) -> Vec<ErrorCategory> {
        self.reports.lock().unwrap().iter().map(|r| r.category).collect()
    }
}

impl ErrorSink for CapturingSink {
    fn report(&self, report: ErrorReport) {
        self.reports.lock().unwrap().push(report);
    }

    fn clone_box(&self) -> Box<dyn ErrorSink> {
        Box::new(self.clone())
    }
}

fn hub_with(factory: Arc<MockFactory>) -> (ToolHub, CapturingSink) {
    let sink = CapturingSink::default();
    let hub = ToolHub::with_backoff(
        factory,
        Arc::new(sink.clone()),
        BackoffPolicy {
            base: Duration::from_millis(100),
            cap: Duration::from_secs(5),
        },
    );
    (hub, sink)
}

fn definition(id: &str) -> ServerDefinition {
    ServerDefinition::streaming(id, format!("Server {id}"), "http://localhost:3001/rpc")
        .with_enabled(false)
        .with_max_retries(3)
}

/// Let spawned connect tasks and armed timers run under the paused clock.
async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_secs(60)).await;
}

#[tokio::test]
async fn test_register_get_list_round_trip() {
    let (hub, _) = hub_with(MockFactory::new());

    assert_ok!(hub.register_server(definition("beta")).await);
    assert_ok!(hub.register_server(definition("alpha")).await);

    let fetched = hub.get_server("alpha").await.unwrap();
    assert_eq!(fetched.id, "alpha");
    assert_eq!(fetched.name, "Server alpha");
    assert!(hub.get_server("missing").await.is_none());

    let ids: Vec<String> = hub.list_servers().await.into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let (hub, _) = hub_with(MockFactory::new());
    assert_ok!(hub.register_server(definition("srv")).await);

    let result = hub.register_server(definition("srv")).await;
    assert!(matches!(result, Err(HubError::DuplicateServer(_))));
    assert_eq!(hub.list_servers().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_enabled_registration_connects_in_background() {
    let factory = MockFactory::new();
    factory.set_tools("srv", &["search"]);
    let (hub, _) = hub_with(Arc::clone(&factory));

    let def = definition("srv").with_enabled(true);
    assert_ok!(hub.register_server(def).await);
    settle().await;

    assert_eq!(factory.attempts(), 1);
    let snapshot = hub.connection_snapshot("srv").await.unwrap();
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert_eq!(hub.list_server_tools("srv").await.len(), 1);
}

#[tokio::test]
async fn test_identical_tool_names_coexist_across_servers() {
    let factory = MockFactory::new();
    factory.set_tools("files", &["search"]);
    factory.set_tools("web", &["search"]);
    let (hub, _) = hub_with(factory);

    for id in ["files", "web"] {
        assert_ok!(hub.register_server(definition(id)).await);
        assert_ok!(hub.connect(id).await);
    }

    let entries = hub.list_available().await;
    assert_eq!(entries.len(), 2);
    let keys: Vec<String> = entries.iter().map(|e| e.key().to_string()).collect();
    assert_eq!(keys, vec!["files/search", "web/search"]);

    // Each call routes to its own server
    let outcome = hub.execute("web", "search", HashMap::new()).await;
    assert!(outcome.success);
}

#[tokio::test]
async fn test_toggle_round_trip_survives_rediscovery() {
    let factory = MockFactory::new();
    factory.set_tools("srv", &["search", "fetch"]);
    let (hub, _) = hub_with(factory);
    assert_ok!(hub.register_server(definition("srv")).await);
    assert_ok!(hub.connect("srv").await);
    assert_eq!(hub.list_available().await.len(), 2);

    hub.set_enabled("srv", "search", false).await;
    let available = hub.list_available().await;
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].tool.name, "fetch");

    // The disabled flag persists across a fresh discovery pass
    assert_eq!(hub.discover("srv").await.unwrap(), 2);
    assert_eq!(hub.list_available().await.len(), 1);

    hub.set_enabled("srv", "search", true).await;
    assert_eq!(hub.list_available().await.len(), 2);
}

#[tokio::test]
async fn test_disconnect_clears_tools_everywhere() {
    let factory = MockFactory::new();
    factory.set_tools("srv", &["search"]);
    let (hub, _) = hub_with(factory);
    assert_ok!(hub.register_server(definition("srv")).await);
    assert_ok!(hub.connect("srv").await);
    assert_eq!(hub.list_available().await.len(), 1);

    hub.disconnect("srv").await;

    assert!(hub.list_server_tools("srv").await.is_empty());
    assert!(hub.list_available().await.is_empty());
    assert!(hub.connection_snapshot("srv").await.is_none());
    // The definition itself survives disconnection
    assert!(hub.get_server("srv").await.is_some());
}

#[tokio::test]
async fn test_deregister_disconnects_and_removes_definition() {
    let factory = MockFactory::new();
    factory.set_tools("srv", &["search"]);
    let (hub, _) = hub_with(factory);
    assert_ok!(hub.register_server(definition("srv")).await);
    assert_ok!(hub.connect("srv").await);

    assert_ok!(hub.deregister_server("srv").await);
    assert!(hub.get_server("srv").await.is_none());
    assert!(hub.list_available().await.is_empty());

    let result = hub.deregister_server("srv").await;
    assert!(matches!(result, Err(HubError::UnknownServer(_))));
}

#[tokio::test]
async fn test_execute_unconnected_is_structured_failure() {
    let (hub, sink) = hub_with(MockFactory::new());

    let outcome = hub.execute("ghost", "search", HashMap::new()).await;
    assert!(!outcome.success);
    assert!(outcome.data.is_none());
    assert!(outcome.error.unwrap().contains("not connected"));
    assert_eq!(sink.categories(), vec![ErrorCategory::Agent]);
}

#[tokio::test(start_paused = true)]
async fn test_health_counts_add_up() {
    let factory = MockFactory::new();
    factory.set_tools("up-1", &["a"]);
    factory.set_tools("up-2", &["b"]);
    factory.refuse("down");
    let (hub, _) = hub_with(factory);

    for id in ["up-1", "up-2", "down"] {
        assert_ok!(hub.register_server(definition(id)).await);
        let _ = hub.connect(id).await;
    }
    settle().await;

    let health = hub.health_check().await;
    assert_eq!(health.healthy, 2);
    assert_eq!(health.unhealthy, 1);
    assert_eq!(health.healthy + health.unhealthy, health.total);
    assert_eq!(
        hub.connection_snapshot("down").await.unwrap().state,
        ConnectionState::Exhausted
    );
}

#[tokio::test(start_paused = true)]
async fn test_lost_connection_keeps_registry_entries() {
    let factory = MockFactory::new();
    factory.set_tools("srv", &["search"]);
    let (hub, _) = hub_with(Arc::clone(&factory));
    assert_ok!(hub.register_server(definition("srv")).await);
    assert_ok!(hub.connect("srv").await);

    // The server starts refusing; the reconnect cycle runs to exhaustion
    factory.refuse("srv");
    let _ = hub.connect("srv").await;
    settle().await;

    assert_eq!(
        hub.connection_snapshot("srv").await.unwrap().state,
        ConnectionState::Exhausted
    );
    // Live view empties, the registry keeps the last-known tool set
    assert!(hub.list_server_tools("srv").await.is_empty());
    assert_eq!(hub.list_available().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_disconnects_everything() {
    let factory = MockFactory::new();
    factory.set_tools("a", &["x"]);
    factory.set_tools("b", &["y"]);
    let (hub, _) = hub_with(Arc::clone(&factory));
    for id in ["a", "b"] {
        assert_ok!(hub.register_server(definition(id)).await);
        assert_ok!(hub.connect(id).await);
    }
    assert_eq!(hub.health_check().await.healthy, 2);

    let attempts_before = factory.attempts();
    hub.shutdown().await;

    assert_eq!(hub.health_check().await.total, 0);
    assert!(hub.list_available().await.is_empty());

    // No timers survive shutdown
    settle().await;
    assert_eq!(factory.attempts(), attempts_before);
}
