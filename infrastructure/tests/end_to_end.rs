//! End-to-end: real axum routes, in-process worker slots, reqwest client and
//! callback listener, all on ephemeral ports.

use async_trait::async_trait;
use relay_application::{
    CallbackIntake, CallbackSender, Dispatcher, ExecutionLedger, InvokeError, KeyValueStore,
    MultiBackendAggregator, NoCallbackSender, NotificationMediator, StoreError, ToolBackend,
    ToolRegistry, WaitParams, WorkerExecutor,
};
use relay_domain::{BackendEndpoint, ExecutionOutcome, ExecutionStatus};
use relay_infrastructure::{
    BackendState, HttpBackendClient, HttpCallbackSender, HttpServer, LocalTaskQueue,
    MemoryKeyValueStore, backend_router, builtin_catalog, callback_router,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Memory store whose first `failures` compare-and-swap calls error out
struct FlakyStore {
    inner: Arc<MemoryKeyValueStore>,
    failures: usize,
    swaps: AtomicUsize,
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: Vec<u8>,
    ) -> Result<bool, StoreError> {
        if self.swaps.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(StoreError::Storage("store offline".to_string()));
        }
        self.inner.compare_and_swap(key, expected, value).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.keys_with_prefix(prefix).await
    }
}

struct BackendNode {
    server: HttpServer,
    queue: Arc<LocalTaskQueue>,
    store: Arc<MemoryKeyValueStore>,
}

impl BackendNode {
    async fn start(callbacks: Arc<dyn CallbackSender>) -> Self {
        let store = Arc::new(MemoryKeyValueStore::new());
        Self::start_with(callbacks, store.clone(), store, 2).await
    }

    /// `slots == 0` leaves every queue unbound.
    async fn start_with(
        callbacks: Arc<dyn CallbackSender>,
        store: Arc<MemoryKeyValueStore>,
        kv: Arc<dyn KeyValueStore>,
        slots: usize,
    ) -> Self {
        let catalog = Arc::new(builtin_catalog());

        let registry = Arc::new(ToolRegistry::new(Arc::clone(&kv)));
        for descriptor in catalog.descriptors() {
            registry.register(descriptor).await.unwrap();
        }
        let ledger = Arc::new(ExecutionLedger::new(kv));

        let queue =
            Arc::new(LocalTaskQueue::new().with_redelivery(5, Duration::from_millis(20)));
        let worker = Arc::new(WorkerExecutor::new(
            Arc::clone(&catalog),
            Arc::clone(&ledger),
            callbacks,
        ));
        if slots > 0 {
            for name in catalog.queues() {
                queue.bind(&name, worker.clone(), slots);
            }
        }

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            ledger,
            queue.clone(),
        ));
        let router = backend_router(BackendState {
            dispatcher,
            registry,
        });
        let server = HttpServer::start("127.0.0.1:0".parse().unwrap(), router)
            .await
            .unwrap();

        Self {
            server,
            queue,
            store,
        }
    }

    fn endpoint(&self) -> BackendEndpoint {
        BackendEndpoint::parse(&self.server.base_url()).unwrap()
    }

    fn client(&self) -> Arc<HttpBackendClient> {
        Arc::new(HttpBackendClient::new(self.endpoint()).unwrap())
    }

    async fn stop(self) {
        self.queue.shutdown().await;
        self.server.stop().await;
    }
}

/// Caller side: mediator plus a callback listener checked against the backend.
struct Caller {
    server: HttpServer,
    mediator: Arc<NotificationMediator>,
}

impl Caller {
    async fn start(backend: &BackendNode) -> Self {
        let mediator = Arc::new(NotificationMediator::new());
        let intake =
            CallbackIntake::new(Arc::clone(&mediator)).with_lookup(backend.client());
        let server = HttpServer::start(
            "127.0.0.1:0".parse().unwrap(),
            callback_router(Arc::new(intake)),
        )
        .await
        .unwrap();
        Self { server, mediator }
    }

    fn callback_url(&self) -> String {
        format!("{}/callback", self.server.base_url())
    }
}

fn fast_wait() -> WaitParams {
    WaitParams::default()
        .with_callback_timeout(Duration::from_secs(5))
        .with_poll_interval(Duration::from_millis(50))
        .with_poll_attempts(40)
}

#[tokio::test]
async fn divide_completes_through_callback() {
    let backend = BackendNode::start(Arc::new(HttpCallbackSender::new().unwrap())).await;
    let caller = Caller::start(&backend).await;

    let backend_client: Arc<dyn ToolBackend> = backend.client();
    let aggregator = MultiBackendAggregator::new([backend_client], Arc::clone(&caller.mediator))
        .with_callback_url(caller.callback_url())
        .with_wait_params(fast_wait());

    let outcome = aggregator
        .invoke("divide", json!({"a": 10, "b": 2}))
        .await
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::Completed(json!(5.0)));
    assert_eq!(caller.mediator.pending_waits(), 0);
    assert_eq!(caller.mediator.stored_results(), 0);

    caller.server.stop().await;
    backend.stop().await;
}

#[tokio::test]
async fn divide_by_zero_is_a_structured_error() {
    let backend = BackendNode::start(Arc::new(HttpCallbackSender::new().unwrap())).await;
    let caller = Caller::start(&backend).await;

    let backend_client: Arc<dyn ToolBackend> = backend.client();
    let aggregator = MultiBackendAggregator::new([backend_client], Arc::clone(&caller.mediator))
        .with_callback_url(caller.callback_url())
        .with_wait_params(fast_wait());

    let outcome = aggregator
        .invoke("divide", json!({"a": 10, "b": 0}))
        .await
        .unwrap();
    match outcome {
        ExecutionOutcome::Failed(error) => {
            assert_eq!(error.code, "EXECUTION_FAILED");
            assert!(error.message.contains("division by zero"));
        }
        other => panic!("expected failure, got {:?}", other),
    }

    caller.server.stop().await;
    backend.stop().await;
}

#[tokio::test]
async fn unknown_tool_fails_without_creating_a_record() {
    let backend = BackendNode::start(Arc::new(NoCallbackSender)).await;
    let mediator = Arc::new(NotificationMediator::new());

    let backend_client: Arc<dyn ToolBackend> = backend.client();
    let aggregator = MultiBackendAggregator::new([backend_client], mediator);

    let err = aggregator
        .invoke("unknown_tool", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::ToolNotFound(name) if name == "unknown_tool"));
    assert!(
        backend
            .store
            .keys_with_prefix("execution:")
            .await
            .unwrap()
            .is_empty()
    );

    backend.stop().await;
}

#[tokio::test]
async fn missing_callback_falls_back_to_polling() {
    let backend = BackendNode::start(Arc::new(NoCallbackSender)).await;
    let mediator = Arc::new(NotificationMediator::new());

    let backend_client: Arc<dyn ToolBackend> = backend.client();
    let aggregator = MultiBackendAggregator::new([backend_client], mediator)
        .with_wait_params(fast_wait().with_callback_timeout(Duration::from_millis(100)));

    let outcome = aggregator
        .invoke("uppercase", json!({"text": "relay"}))
        .await
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::Completed(json!("RELAY")));

    backend.stop().await;
}

#[tokio::test]
async fn invalid_arguments_end_in_error_record() {
    let backend = BackendNode::start(Arc::new(NoCallbackSender)).await;
    let mediator = Arc::new(NotificationMediator::new());

    let backend_client: Arc<dyn ToolBackend> = backend.client();
    let aggregator = MultiBackendAggregator::new([backend_client], mediator)
        .with_wait_params(fast_wait().with_callback_timeout(Duration::from_millis(50)));

    let outcome = aggregator
        .invoke("add", json!({"a": 1, "b": "two"}))
        .await
        .unwrap();
    match outcome {
        ExecutionOutcome::Failed(error) => assert_eq!(error.code, "INVALID_ARGUMENT"),
        other => panic!("expected failure, got {:?}", other),
    }

    backend.stop().await;
}

#[tokio::test]
async fn discovery_merges_backends_and_reports_unreachable() {
    let first = BackendNode::start(Arc::new(NoCallbackSender)).await;
    let second = BackendNode::start(Arc::new(NoCallbackSender)).await;
    let dead: Arc<dyn ToolBackend> = Arc::new(
        HttpBackendClient::with_timeout(
            BackendEndpoint::parse("http://127.0.0.1:1").unwrap(),
            Duration::from_secs(2),
        )
        .unwrap(),
    );

    let first_client: Arc<dyn ToolBackend> = first.client();
    let second_client: Arc<dyn ToolBackend> = second.client();
    let aggregator = MultiBackendAggregator::new(
        [first_client, second_client, dead],
        Arc::new(NotificationMediator::new()),
    );

    let report = aggregator.discover().await;
    let names: Vec<&str> = report.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["add", "divide", "lowercase", "multiply", "subtract", "uppercase"]
    );
    assert_eq!(report.failed_backends.len(), 1);
    assert_eq!(report.failed_backends[0].0.as_str(), "http://127.0.0.1:1");

    first.stop().await;
    second.stop().await;
}

#[tokio::test]
async fn unqueued_execution_is_a_pollable_dispatch_failure() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let backend =
        BackendNode::start_with(Arc::new(NoCallbackSender), store.clone(), store, 0).await;
    let caller = Caller::start(&backend).await;

    let backend_client: Arc<dyn ToolBackend> = backend.client();
    let aggregator =
        MultiBackendAggregator::new([backend_client.clone()], Arc::clone(&caller.mediator))
            .with_callback_url(caller.callback_url())
            .with_wait_params(fast_wait());

    let outcome = aggregator
        .invoke("divide", json!({"a": 1, "b": 2}))
        .await
        .unwrap();
    match outcome {
        ExecutionOutcome::Failed(error) => {
            assert_eq!(error.code, "DISPATCH_FAILED");
            assert!(error.message.contains("math_queue"));
        }
        other => panic!("expected dispatch failure, got {:?}", other),
    }

    let keys = backend.store.keys_with_prefix("execution:").await.unwrap();
    assert_eq!(keys.len(), 1);
    let id = keys[0].trim_start_matches("execution:");
    let record = backend_client.status(id).await.unwrap().unwrap();
    assert_eq!(record.status, ExecutionStatus::Error);
    assert_eq!(record.result["code"], "DISPATCH_FAILED");

    caller.server.stop().await;
    backend.stop().await;
}

#[tokio::test]
async fn unstored_outcome_is_retried_before_any_callback() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let flaky = Arc::new(FlakyStore {
        inner: store.clone(),
        failures: 2,
        swaps: AtomicUsize::new(0),
    });
    let backend = BackendNode::start_with(
        Arc::new(HttpCallbackSender::new().unwrap()),
        store,
        flaky.clone(),
        1,
    )
    .await;
    let caller = Caller::start(&backend).await;

    let backend_client: Arc<dyn ToolBackend> = backend.client();
    let aggregator = MultiBackendAggregator::new([backend_client], Arc::clone(&caller.mediator))
        .with_callback_url(caller.callback_url())
        .with_wait_params(fast_wait());

    let outcome = aggregator
        .invoke("divide", json!({"a": 10, "b": 2}))
        .await
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::Completed(json!(5.0)));
    // Two failed terminal writes, then the one that landed.
    assert_eq!(flaky.swaps.load(Ordering::SeqCst), 3);

    caller.server.stop().await;
    backend.stop().await;
}
