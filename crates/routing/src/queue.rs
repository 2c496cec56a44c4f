use std::sync::Arc;

use {
    tokio::sync::{Mutex, mpsc},
    tracing::{error, info, warn},
};

use switchboard_channels::InboundMessage;

use crate::{
    error::{Error, Result},
    router::Router,
};

/// Default queue capacity before enqueue attempts are refused.
pub const DEFAULT_CAPACITY: usize = 256;

/// Default number of pipeline workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Bounded hand-off between webhook handlers and the router pipeline.
///
/// Webhook handlers enqueue and return immediately; a fixed worker pool
/// drains the queue and runs the pipeline. Saturation is an explicit
/// [`Error::QueueFull`] the caller can observe and log — events are never
/// silently dropped and no unbounded task spawning happens per request.
pub struct InboundQueue {
    tx: mpsc::Sender<InboundMessage>,
}

impl InboundQueue {
    /// Spawn `workers` pipeline workers draining a queue of `capacity`.
    /// Workers exit when the queue handle (and its clones) are dropped.
    #[must_use]
    pub fn start(router: Arc<Router>, capacity: usize, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<InboundMessage>(capacity);
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let router = Arc::clone(&router);
            tokio::spawn(async move {
                loop {
                    let event = { rx.lock().await.recv().await };
                    let Some(event) = event else {
                        info!(worker_id, "inbound queue closed, worker exiting");
                        break;
                    };
                    // Pipeline errors are already webhook-logged by the
                    // router; here they only surface to the log stream.
                    if let Err(e) = router.handle_inbound(event).await {
                        error!(worker_id, error = %e, "inbound event processing failed");
                    }
                }
            });
        }

        Self { tx }
    }

    /// Queue an event without waiting. Refuses when saturated.
    pub fn try_enqueue(&self, event: InboundMessage) -> Result<()> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    channel = %event.channel,
                    organization_id = %event.organization_id,
                    "inbound queue full, refusing event"
                );
                Err(Error::QueueFull)
            },
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::QueueFull),
        }
    }
}

impl Clone for InboundQueue {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}
