//! SinkHandle - manages a sink with isolated queue and worker task

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, instrument, warn};

use contracts::{DeliveryOutcome, DeliverySink, Observation};

use crate::metrics::SinkMetrics;

/// One delivery attempt and how long it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcome: DeliveryOutcome,
    pub elapsed: Duration,
}

impl DeliveryReport {
    fn immediate(outcome: DeliveryOutcome) -> Self {
        Self {
            outcome,
            elapsed: Duration::ZERO,
        }
    }
}

/// Work item for a sink worker
struct DeliveryRequest {
    observation: Observation,
    reply: oneshot::Sender<DeliveryReport>,
}

/// A submitted delivery awaiting its outcome
pub enum PendingDelivery {
    /// Queued with the worker
    Queued {
        sink: String,
        reply: oneshot::Receiver<DeliveryReport>,
    },
    /// Resolved at submission (queue full or worker gone)
    Resolved(DeliveryReport),
}

impl PendingDelivery {
    /// Wait for the worker's report
    ///
    /// A worker that goes away without answering yields a failed outcome.
    pub async fn report(self) -> DeliveryReport {
        match self {
            Self::Resolved(report) => report,
            Self::Queued { sink, reply } => reply.await.unwrap_or_else(|_| {
                DeliveryReport::immediate(DeliveryOutcome::failed(sink, "sink worker stopped"))
            }),
        }
    }
}

/// Handle to a running sink worker
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Channel to send requests to worker
    tx: mpsc::Sender<DeliveryRequest>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    ///
    /// Every delivery is abandoned after `delivery_timeout`.
    pub fn spawn<S: DeliverySink + Send + 'static>(
        sink: S,
        queue_capacity: usize,
        delivery_timeout: Duration,
    ) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name, delivery_timeout).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue an observation for delivery (non-blocking)
    ///
    /// A full queue or a closed worker resolves immediately as a failure.
    pub fn submit(&self, observation: &Observation) -> PendingDelivery {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = DeliveryRequest {
            observation: *observation,
            reply: reply_tx,
        };

        match self.tx.try_send(request) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                PendingDelivery::Queued {
                    sink: self.name.clone(),
                    reply: reply_rx,
                }
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.inc_dropped_count();
                warn!(
                    sink = %self.name,
                    code = observation.code,
                    "Queue full, delivery dropped"
                );
                PendingDelivery::Resolved(DeliveryReport::immediate(DeliveryOutcome::failed(
                    &self.name,
                    "queue full",
                )))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                PendingDelivery::Resolved(DeliveryReport::immediate(DeliveryOutcome::failed(
                    &self.name,
                    "sink worker stopped",
                )))
            }
        }
    }

    /// Shutdown the sink worker gracefully
    ///
    /// Requests already queued are still delivered.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Worker task that consumes requests and delivers to the sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics, delivery_timeout),
    fields(sink = %name)
)]
async fn sink_worker<S: DeliverySink>(
    mut sink: S,
    mut rx: mpsc::Receiver<DeliveryRequest>,
    metrics: Arc<SinkMetrics>,
    name: String,
    delivery_timeout: Duration,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(request) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        let started = Instant::now();
        let outcome = match timeout(delivery_timeout, sink.deliver(&request.observation)).await {
            Ok(Ok(receipt)) => {
                metrics.inc_delivered_count();
                DeliveryOutcome::delivered(&name, receipt.status)
            }
            Ok(Err(e)) => {
                metrics.inc_failure_count();
                warn!(
                    sink = %name,
                    code = request.observation.code,
                    error = %e,
                    "Delivery failed"
                );
                match e.status() {
                    Some(status) => DeliveryOutcome::rejected(&name, status),
                    None => DeliveryOutcome::failed(&name, e.to_string()),
                }
            }
            Err(_) => {
                metrics.inc_timeout_count();
                warn!(
                    sink = %name,
                    code = request.observation.code,
                    timeout_ms = delivery_timeout.as_millis() as u64,
                    "Delivery timed out"
                );
                DeliveryOutcome::failed(
                    &name,
                    format!("timed out after {}ms", delivery_timeout.as_millis()),
                )
            }
        };

        let report = DeliveryReport {
            outcome,
            elapsed: started.elapsed(),
        };
        // The dispatcher may have stopped waiting; nothing to do then.
        let _ = request.reply.send(report);
    }

    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}
