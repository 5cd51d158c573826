//! Report publisher scheduler.
//!
//! [`ReportPublisher`] runs as a background task and performs one
//! [`publish_cycle`] per tick. A running cycle is never interrupted; the
//! cancellation token only stops new cycles from starting.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::mailer::Mailer;
use crate::reports::{publish_cycle, ReportStore};

pub struct ReportPublisher {
    store: Arc<dyn ReportStore>,
    mailer: Arc<dyn Mailer>,
    interval: Duration,
}

impl ReportPublisher {
    pub fn new(store: Arc<dyn ReportStore>, mailer: Arc<dyn Mailer>, interval: Duration) -> Self {
        Self {
            store,
            mailer,
            interval,
        }
    }

    /// Run the publisher loop. The first cycle starts immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Report publisher started");
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Report publisher cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = publish_cycle(self.store.as_ref(), self.mailer.as_ref()).await {
                        tracing::error!(error = %e, "Error publishing reports");
                    }
                }
            }
        }
    }
}
