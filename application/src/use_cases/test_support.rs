//! In-crate fakes for use case tests

use crate::ports::callback_sender::{CallbackSender, DeliveryError};
use crate::ports::execution_logger::{ExecutionEvent, ExecutionLogger};
use crate::ports::store::{KeyValueStore, StoreError};
use crate::ports::task_queue::{QueueError, TaskQueue, ToolTask};
use crate::ports::tool_backend::{BackendError, RunRequest, RunResponse, ToolBackend};
use async_trait::async_trait;
use relay_domain::{
    ArgType, BackendEndpoint, CallbackPayload, ExecutionRecord, ToolDescriptor, ToolError,
    ToolImplementation,
};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct FakeStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_writes: std::sync::atomic::AtomicBool,
}

impl FakeStore {
    pub fn raw(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .map(|bytes| serde_json::from_slice(bytes).unwrap())
    }

    pub fn put_raw(&self, key: &str, value: Value) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), serde_json::to_vec(&value).unwrap());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FakeStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.check_writable()?;
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: Vec<u8>,
    ) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(current) if current.as_slice() == expected => {
                entries.insert(key.to_string(), value);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Queue that records submissions, or refuses them when `offline`
#[derive(Default)]
pub struct RecordingQueue {
    pub submitted: Mutex<Vec<(String, ToolTask)>>,
    pub offline: bool,
}

impl RecordingQueue {
    pub fn offline() -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            offline: true,
        }
    }

    pub fn tasks(&self) -> Vec<(String, ToolTask)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn submit(&self, queue: &str, task: ToolTask) -> Result<String, QueueError> {
        if self.offline {
            return Err(QueueError::Unavailable("broker unreachable".to_string()));
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push((queue.to_string(), task));
        Ok(format!("task-{}", submitted.len()))
    }
}

/// Callback sender that records deliveries, optionally failing them
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, CallbackPayload)>>,
    pub fail: bool,
}

#[async_trait]
impl CallbackSender for RecordingSender {
    async fn send(&self, url: &str, payload: &CallbackPayload) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        if self.fail {
            return Err(DeliveryError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

/// Logger that keeps event types in order
#[derive(Default)]
pub struct RecordingLogger {
    pub events: Mutex<Vec<(&'static str, Value)>>,
}

impl RecordingLogger {
    pub fn types(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

impl ExecutionLogger for RecordingLogger {
    fn log(&self, event: ExecutionEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type, event.payload));
    }
}

pub fn divide_descriptor() -> ToolDescriptor {
    ToolDescriptor::new("divide", "Divide a by b")
        .with_queue("math_queue")
        .with_arg("a", ArgType::Number, true)
        .with_arg("b", ArgType::Number, true)
}

pub struct Divide;

impl ToolImplementation for Divide {
    fn descriptor(&self) -> ToolDescriptor {
        divide_descriptor()
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let a = args["a"].as_f64().unwrap_or_default();
        let b = args["b"].as_f64().unwrap_or_default();
        if b == 0.0 {
            return Err(ToolError::execution_failed("division by zero"));
        }
        Ok(json!(a / b))
    }
}

/// Tool that panics and counts its invocations
#[derive(Default)]
pub struct Explode {
    pub calls: AtomicUsize,
}

impl ToolImplementation for Explode {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("explode", "Always panics")
    }

    fn invoke(&self, _args: &Map<String, Value>) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("kaboom");
    }
}

/// Scripted backend: canned tool list, run responses and status answers
pub struct FakeBackend {
    endpoint: BackendEndpoint,
    pub tools: Result<Vec<ToolDescriptor>, String>,
    pub run_responses: Mutex<VecDeque<Result<RunResponse, BackendError>>>,
    pub statuses: Mutex<VecDeque<Option<ExecutionRecord>>>,
    pub runs: Mutex<Vec<RunRequest>>,
    pub status_calls: AtomicUsize,
    pub registered: Mutex<Vec<ToolDescriptor>>,
}

impl FakeBackend {
    pub fn new(url: &str) -> Self {
        Self {
            endpoint: BackendEndpoint::parse(url).unwrap(),
            tools: Ok(Vec::new()),
            run_responses: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            runs: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = Ok(tools);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.tools = Err("connection refused".to_string());
        self
    }

    pub fn with_run_response(self, response: Result<RunResponse, BackendError>) -> Self {
        self.run_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_status(self, record: Option<ExecutionRecord>) -> Self {
        self.statuses.lock().unwrap().push_back(record);
        self
    }
}

#[async_trait]
impl ToolBackend for FakeBackend {
    fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BackendError> {
        self.tools.clone().map_err(|message| BackendError::Unreachable {
            backend: self.endpoint.to_string(),
            message,
        })
    }

    async fn run(&self, request: &RunRequest) -> Result<RunResponse, BackendError> {
        self.runs.lock().unwrap().push(request.clone());
        self.run_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(BackendError::InvalidResponse {
                    backend: self.endpoint.to_string(),
                    message: "no scripted response".to_string(),
                })
            })
    }

    async fn status(&self, _execution_id: &str) -> Result<Option<ExecutionRecord>, BackendError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        // The last scripted answer repeats forever
        if statuses.len() > 1 {
            Ok(statuses.pop_front().flatten())
        } else {
            Ok(statuses.front().cloned().flatten())
        }
    }

    async fn register(&self, descriptor: &ToolDescriptor) -> Result<(), BackendError> {
        self.registered.lock().unwrap().push(descriptor.clone());
        Ok(())
    }
}
