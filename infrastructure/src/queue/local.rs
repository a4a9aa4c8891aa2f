//! In-process task queue.
//!
//! Each named queue is a bounded `mpsc` channel drained by a fixed number of
//! worker slots. Slots share the receiver, so a task is handed to whichever
//! slot is free first. A queue with no bound handler, or one whose buffer is
//! full, rejects submissions, which the dispatcher turns into a
//! `DISPATCH_FAILED` record.
//!
//! A task the handler reports as unstored is put back on its queue after a
//! growing delay, up to a fixed number of deliveries.

use async_trait::async_trait;
use relay_application::{QueueError, TaskHandler, TaskQueue, TaskReport, ToolTask};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default channel capacity per queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
/// Deliveries of one task before an unstored outcome is given up on
pub const DEFAULT_MAX_DELIVERIES: u32 = 5;
/// Delay before the first redelivery; doubles with each further attempt
pub const DEFAULT_REDELIVERY_DELAY: Duration = Duration::from_millis(200);

struct Delivery {
    task_id: String,
    task: ToolTask,
    attempt: u32,
}

#[derive(Clone, Copy)]
struct RedeliveryPolicy {
    max_deliveries: u32,
    delay: Duration,
}

impl RedeliveryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

struct QueueBinding {
    sender: mpsc::Sender<Delivery>,
    slots: Vec<JoinHandle<()>>,
}

/// Named queues served by in-process worker slots
pub struct LocalTaskQueue {
    queues: std::sync::Mutex<HashMap<String, QueueBinding>>,
    capacity: usize,
    redelivery: RedeliveryPolicy,
    cancellation: CancellationToken,
}

impl LocalTaskQueue {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queues: std::sync::Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            redelivery: RedeliveryPolicy {
                max_deliveries: DEFAULT_MAX_DELIVERIES,
                delay: DEFAULT_REDELIVERY_DELAY,
            },
            cancellation: CancellationToken::new(),
        }
    }

    /// Deliver a task at most `max_deliveries` times, waiting `delay`
    /// (doubling per attempt) before each redelivery.
    pub fn with_redelivery(mut self, max_deliveries: u32, delay: Duration) -> Self {
        self.redelivery = RedeliveryPolicy {
            max_deliveries: max_deliveries.max(1),
            delay,
        };
        self
    }

    /// Bind `handler` to `queue` with `concurrency` worker slots.
    ///
    /// Rebinding a queue replaces the previous channel; slots of the old
    /// binding finish the tasks already buffered and then exit.
    /// Must be called from within a tokio runtime.
    pub fn bind(&self, queue: &str, handler: Arc<dyn TaskHandler>, concurrency: usize) {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let concurrency = concurrency.max(1);

        let slots = (0..concurrency)
            .map(|slot| {
                tokio::spawn(slot_loop(
                    SlotContext {
                        queue: queue.to_string(),
                        slot,
                        redeliver: sender.downgrade(),
                        redelivery: self.redelivery,
                        cancellation: self.cancellation.child_token(),
                    },
                    Arc::clone(&receiver),
                    Arc::clone(&handler),
                ))
            })
            .collect();

        info!(queue, concurrency, "Worker slots started");
        self.queues()
            .insert(queue.to_string(), QueueBinding { sender, slots });
    }

    /// Names of the bound queues, sorted
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues().keys().cloned().collect();
        names.sort();
        names
    }

    /// Token that stops every worker slot when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Stop accepting tasks and wait for the slots to exit.
    ///
    /// A slot that is running a tool finishes it first; buffered tasks that
    /// were never picked up are dropped.
    pub async fn shutdown(&self) {
        self.cancellation.cancel();
        let bindings: Vec<QueueBinding> = self.queues().drain().map(|(_, b)| b).collect();
        for binding in bindings {
            drop(binding.sender);
            for slot in binding.slots {
                if let Err(e) = slot.await {
                    warn!("Worker slot ended abnormally: {}", e);
                }
            }
        }
        info!("Task queue shut down");
    }

    fn queues(&self) -> std::sync::MutexGuard<'_, HashMap<String, QueueBinding>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LocalTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

struct SlotContext {
    queue: String,
    slot: usize,
    /// Weak so that dropping the binding's sender still closes the channel
    redeliver: mpsc::WeakSender<Delivery>,
    redelivery: RedeliveryPolicy,
    cancellation: CancellationToken,
}

async fn slot_loop(
    ctx: SlotContext,
    receiver: Arc<Mutex<mpsc::Receiver<Delivery>>>,
    handler: Arc<dyn TaskHandler>,
) {
    let SlotContext { queue, slot, .. } = &ctx;
    loop {
        let next = tokio::select! {
            _ = ctx.cancellation.cancelled() => break,
            next = async { receiver.lock().await.recv().await } => next,
        };
        let Some(delivery) = next else {
            break;
        };

        let task_id = delivery.task_id.clone();
        let execution_id = delivery.task.execution_id.to_string();
        let report = handler.handle(delivery.task.clone()).await;
        match report {
            TaskReport::Duplicate => {
                debug!(%queue, slot, %task_id, %execution_id, "Duplicate delivery acknowledged")
            }
            report if report.wants_redelivery() => schedule_redelivery(&ctx, delivery),
            _ => debug!(%queue, slot, %task_id, %execution_id, ?report, "Task acknowledged"),
        }
    }
    debug!(%queue, slot, "Worker slot stopped");
}

fn schedule_redelivery(ctx: &SlotContext, delivery: Delivery) {
    let queue = ctx.queue.clone();
    let execution_id = delivery.task.execution_id.to_string();
    if delivery.attempt >= ctx.redelivery.max_deliveries {
        error!(
            %queue,
            task_id = %delivery.task_id,
            %execution_id,
            attempts = delivery.attempt,
            "Giving up on task; execution record stays pending"
        );
        return;
    }

    let delay = ctx.redelivery.delay_for(delivery.attempt);
    let redeliver = ctx.redeliver.clone();
    let cancellation = ctx.cancellation.clone();
    let next = Delivery {
        attempt: delivery.attempt + 1,
        ..delivery
    };
    warn!(%queue, %execution_id, attempt = next.attempt, ?delay, "Redelivering task");

    tokio::spawn(async move {
        tokio::select! {
            _ = cancellation.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        let Some(sender) = redeliver.upgrade() else {
            warn!(%queue, %execution_id, "Queue unbound before redelivery; task dropped");
            return;
        };
        if let Err(e) = sender.try_send(next) {
            warn!(%queue, %execution_id, error = %e, "Redelivery failed; task dropped");
        }
    });
}

#[async_trait]
impl TaskQueue for LocalTaskQueue {
    async fn submit(&self, queue: &str, task: ToolTask) -> Result<String, QueueError> {
        if self.cancellation.is_cancelled() {
            return Err(QueueError::Closed(queue.to_string()));
        }
        let sender = self
            .queues()
            .get(queue)
            .map(|binding| binding.sender.clone())
            .ok_or_else(|| QueueError::UnknownQueue(queue.to_string()))?;

        let task_id = uuid::Uuid::new_v4().to_string();
        let delivery = Delivery {
            task_id: task_id.clone(),
            task,
            attempt: 1,
        };
        sender.try_send(delivery).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full(queue.to_string()),
            TrySendError::Closed(_) => QueueError::Closed(queue.to_string()),
        })?;
        Ok(task_id)
    }
}
